//! Syntax-tree definitions for Weft compilation units
//!
//! The trees are produced by an external parser and handed to the resolver
//! as data, so every node derives serde traits and carries no behavior
//! beyond a few small accessors. One `SourceFile` holds the top-level
//! declarations of one compilation unit.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crate::utils::Span;

/// One compilation unit: a source file's worth of top-level declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Import path other units use to refer to this unit
    pub path: String,
    pub decls: Vec<Decl>,
}

/// Identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::dummy(),
        }
    }
}

/// Top-level declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Func(FuncDecl),
    Group(DeclGroup),
}

/// Function declaration; a present receiver makes it a method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: Ident,
    pub receiver: Option<Receiver>,
    pub sig: FuncSig,
    #[serde(default)]
    pub span: Span,
}

/// Method receiver: `(r *T)` or `(r T)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    pub name: Option<Ident>,
    pub ty: TypeExpr,
}

/// A `const`/`var`/`type`/`import` block with one or more specs. The spec
/// variants themselves say what kind of declaration each line is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclGroup {
    pub specs: Vec<Spec>,
}

/// One line of a declaration group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Spec {
    Type(TypeSpec),
    Value(ValueSpec),
    Import(ImportSpec),
}

/// `type Name <expr>`: always a fresh named identity, never an alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: Ident,
    pub ty: TypeExpr,
}

/// `const a, b int = 1, 2` / `var x = f()` / a bare `c, d` continuing a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    #[serde(default)]
    pub values: Vec<Expr>,
}

/// `import alias "path"`; alias `.` embeds the unit, alias `_` discards it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSpec {
    pub alias: Option<Ident>,
    pub path: String,
}

impl ImportSpec {
    /// The name the import binds: the alias if given, else the trailing
    /// path segment.
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => &alias.name,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// Type expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeExpr {
    /// `T`
    Name(Ident),
    /// `pkg.T`
    Qualified { pkg: Ident, name: Ident },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[N]T` with a length, `[]T` without
    Array {
        len: Option<Box<Expr>>,
        elem: Box<TypeExpr>,
    },
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `chan T`, `<-chan T`, `chan<- T`
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    /// `func(...) (...)`
    Func(FuncSig),
    /// `struct { ... }`
    Struct { fields: Vec<FieldDecl> },
    /// `interface { ... }`
    Interface { methods: Vec<FieldDecl> },
}

impl TypeExpr {
    /// The trailing identifier of a type expression, used to derive the
    /// effective name of an embedded struct field: `Embedded`,
    /// `pkg.Embedded` and `*pkg.Embedded` all name a field `Embedded`.
    pub fn trailing_ident(&self) -> Option<&Ident> {
        match self {
            TypeExpr::Name(id) => Some(id),
            TypeExpr::Qualified { name, .. } => Some(name),
            TypeExpr::Pointer(inner) => inner.trailing_ident(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A field-list entry: struct field, interface method, or parameter group.
/// Empty `names` means an embedded field (or an unnamed parameter/result).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    #[serde(default)]
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
}

/// Function signature: parameter and result groups in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuncSig {
    #[serde(default)]
    pub params: Vec<FieldDecl>,
    #[serde(default)]
    pub results: Vec<FieldDecl>,
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Name(Ident),
    Literal(Literal),
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// `base.field`
    Selector { base: Box<Expr>, field: Ident },
    /// `T{...}`; element values are irrelevant to resolution
    Composite { ty: TypeExpr },
    /// `func(...) (...) { ... }`
    FuncLit { sig: FuncSig },
    /// A type expression in value position (`make` arguments, conversions)
    Type(Box<TypeExpr>),
}

/// Literal constant, kept as raw text the way the parser produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Literal {
    pub kind: LitKind,
    pub value: String,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LitKind {
    Int,
    Float,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `&x`
    Addr,
    /// `*x`
    Deref,
    /// `<-ch`
    Recv,
    /// `!x`
    Not,
    /// `-x`
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    Xor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Comparison and logical operators always produce a boolean, whatever
    /// the operand types.
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_ident_through_pointer() {
        let ty = TypeExpr::Pointer(Box::new(TypeExpr::Qualified {
            pkg: Ident::new("geo"),
            name: Ident::new("Point"),
        }));
        assert_eq!(ty.trailing_ident().unwrap().name, "Point");
    }

    #[test]
    fn import_local_name() {
        let spec = ImportSpec {
            alias: None,
            path: "lib/util".to_string(),
        };
        assert_eq!(spec.local_name(), "util");

        let aliased = ImportSpec {
            alias: Some(Ident::new("u")),
            path: "lib/util".to_string(),
        };
        assert_eq!(aliased.local_name(), "u");
    }

    #[test]
    fn unit_round_trips_through_json() {
        let unit = SourceFile {
            path: "demo".to_string(),
            decls: vec![Decl::Group(DeclGroup {
                specs: vec![Spec::Type(TypeSpec {
                    name: Ident::new("Pixel"),
                    ty: TypeExpr::Struct {
                        fields: vec![FieldDecl {
                            names: vec![Ident::new("r"), Ident::new("g")],
                            ty: TypeExpr::Name(Ident::new("uint8")),
                        }],
                    },
                })],
            })],
        };
        let text = serde_json::to_string(&unit).unwrap();
        let back: SourceFile = serde_json::from_str(&text).unwrap();
        assert_eq!(back.path, "demo");
        assert_eq!(back.decls.len(), 1);
    }
}
