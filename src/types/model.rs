//! Type model for resolved Weft declarations
//!
//! Supports operations on types, such as figuring out the type of a struct
//! field, an index access, a dereference, or the outcome of a binary
//! expression between two types.
//!
//! Every resolvable entity is one `TypeData` entry in a `TypeArena`,
//! referenced everywhere by its stable `TypeId` index; the arena is owned by
//! the compiler session, so cross-references between entries are plain
//! indices and never ownership cycles. A `Named` entry is a fresh identity
//! over its underlying structural type; all other kinds fully define their
//! own shape. An entry becomes visible in a unit's name table *before* it is
//! completed, which is what lets completion look the entry's own name up.
#![allow(dead_code)]

use indexmap::IndexMap;

use crate::frontend::ast::{BinaryOp, ChanDir, Expr, Literal, TypeExpr};
use crate::types::builtins::{BuiltinDef, BUILTINS};
use crate::utils::{Error, Result};

/// Stable index of a type in its session arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of type kinds.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Primitive, builtin, or otherwise unresolved leaf
    Base { name: String },
    /// Untyped literal constant; `resolved` holds its concrete type once
    /// completed
    Const {
        literal: Literal,
        resolved: Option<TypeId>,
    },
    /// Record or interface-like aggregate, fields in declaration order
    Struct { fields: IndexMap<String, TypeId> },
    /// Array, slice, map, or channel. No key for slices and channels.
    Indexed {
        flavor: IndexedFlavor,
        key: Option<TypeId>,
        value: Option<TypeId>,
    },
    /// Reference type
    Pointer { inner: Option<TypeId> },
    /// Callable signature
    Func {
        params: Vec<TypeId>,
        results: Vec<TypeId>,
    },
    /// A resolved external compilation unit
    Package {
        path: String,
        members: IndexMap<String, TypeId>,
    },
    /// Fresh named identity over a structural underlying type; methods are
    /// attached here after the rest of the unit resolves
    Named {
        name: String,
        underlying: TypeId,
        methods: IndexMap<String, TypeId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexedFlavor {
    Slice,
    /// Display text of the length expression
    Array { len: String },
    Map,
    Chan(ChanDir),
}

#[derive(Debug, Clone)]
struct TypeData {
    kind: TypeKind,
    /// The declaring type expression, kept for completion
    decl: Option<TypeExpr>,
    completed: bool,
}

/// Session-owned arena of every type created during a compiler invocation.
///
/// Builtin entries are seeded at construction, pre-completed, and shared by
/// all units of the session.
pub struct TypeArena {
    types: Vec<TypeData>,
    builtins: IndexMap<String, TypeId>,
    bool_id: TypeId,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = Self {
            types: Vec::new(),
            builtins: IndexMap::new(),
            bool_id: TypeId(0),
        };
        for def in BUILTINS.iter() {
            match *def {
                BuiltinDef::Leaf(name) => {
                    let id = arena.alloc_completed(TypeKind::Base {
                        name: name.to_string(),
                    });
                    arena.builtins.insert(name.to_string(), id);
                }
                BuiltinDef::Alias { name, target } => {
                    let id = arena.builtins[target];
                    arena.builtins.insert(name.to_string(), id);
                }
                BuiltinDef::Func { name, results } => {
                    let results = results.iter().map(|r| arena.builtins[*r]).collect();
                    let id = arena.alloc_completed(TypeKind::Func {
                        params: Vec::new(),
                        results,
                    });
                    arena.builtins.insert(name.to_string(), id);
                }
            }
        }
        arena.bool_id = arena.builtins["bool"];
        arena
    }

    /// Allocate a new, not yet completed entry.
    pub fn alloc(&mut self, kind: TypeKind, decl: Option<TypeExpr>) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeData {
            kind,
            decl,
            completed: false,
        });
        id
    }

    /// Allocate an entry that needs no completion step.
    pub fn alloc_completed(&mut self, kind: TypeKind) -> TypeId {
        let id = self.alloc(kind, None);
        self.types[id.index()].completed = true;
        id
    }

    /// Create a new entry from a declaring type expression. The entry still
    /// has to be completed, after its name is defined.
    pub fn type_decl(&mut self, expr: &TypeExpr) -> TypeId {
        match expr {
            TypeExpr::Name(id) => self.alloc(
                TypeKind::Base {
                    name: id.name.clone(),
                },
                None,
            ),
            TypeExpr::Qualified { pkg, name } => self.alloc(
                TypeKind::Base {
                    name: format!("{}.{}", pkg.name, name.name),
                },
                None,
            ),
            TypeExpr::Pointer(_) => {
                self.alloc(TypeKind::Pointer { inner: None }, Some(expr.clone()))
            }
            TypeExpr::Array { len, .. } => {
                let flavor = match len {
                    Some(expr) => IndexedFlavor::Array {
                        len: len_display(expr),
                    },
                    None => IndexedFlavor::Slice,
                };
                self.alloc(
                    TypeKind::Indexed {
                        flavor,
                        key: None,
                        value: None,
                    },
                    Some(expr.clone()),
                )
            }
            TypeExpr::Map { .. } => self.alloc(
                TypeKind::Indexed {
                    flavor: IndexedFlavor::Map,
                    key: None,
                    value: None,
                },
                Some(expr.clone()),
            ),
            TypeExpr::Chan { dir, .. } => self.alloc(
                TypeKind::Indexed {
                    flavor: IndexedFlavor::Chan(*dir),
                    key: None,
                    value: None,
                },
                Some(expr.clone()),
            ),
            TypeExpr::Func(_) => self.alloc(
                TypeKind::Func {
                    params: Vec::new(),
                    results: Vec::new(),
                },
                Some(expr.clone()),
            ),
            TypeExpr::Struct { .. } | TypeExpr::Interface { .. } => self.alloc(
                TypeKind::Struct {
                    fields: IndexMap::new(),
                },
                Some(expr.clone()),
            ),
        }
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: TypeId) -> &mut TypeKind {
        &mut self.types[id.index()].kind
    }

    /// The declaring type expression recorded at allocation, if any.
    pub fn decl_expr(&self, id: TypeId) -> Option<&TypeExpr> {
        self.types[id.index()].decl.as_ref()
    }

    pub fn is_completed(&self, id: TypeId) -> bool {
        self.types[id.index()].completed
    }

    /// Enter the completion phase for an entry. Completing a type twice is
    /// a bug in the resolution protocol, never a recoverable condition.
    pub fn begin_completion(&mut self, id: TypeId) -> Result<()> {
        if self.types[id.index()].completed {
            return Err(Error::internal(format!(
                "type `{}` completed twice",
                self.display(id)
            )));
        }
        self.types[id.index()].completed = true;
        Ok(())
    }

    pub fn builtin(&self, name: &str) -> Option<TypeId> {
        self.builtins.get(name).copied()
    }

    pub fn bool_type(&self) -> TypeId {
        self.bool_id
    }

    // ---- operations every kind answers (absent unless supported) ----

    /// Member lookup: struct/interface fields, package members, and, for
    /// named types, the underlying type's fields followed by attached
    /// methods.
    pub fn field(&self, id: TypeId, name: &str) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Struct { fields } => fields.get(name).copied(),
            TypeKind::Package { members, .. } => members.get(name).copied(),
            TypeKind::Named {
                underlying,
                methods,
                ..
            } => self
                .field(*underlying, name)
                .or_else(|| methods.get(name).copied()),
            _ => None,
        }
    }

    /// Field names in declaration order; stable across calls.
    pub fn fields(&self, id: TypeId) -> Vec<String> {
        match self.kind(id) {
            TypeKind::Struct { fields } => fields.keys().cloned().collect(),
            TypeKind::Named { underlying, .. } => self.fields(*underlying),
            _ => Vec::new(),
        }
    }

    /// The result type of a `*` dereference.
    pub fn dereference(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Pointer { inner } => *inner,
            TypeKind::Named { underlying, .. } => self.dereference(*underlying),
            _ => None,
        }
    }

    /// The key type of an index operation. Slices and channels have none.
    pub fn index_key(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Indexed { key, .. } => *key,
            TypeKind::Named { underlying, .. } => self.index_key(*underlying),
            _ => None,
        }
    }

    /// The element type of an index or channel-receive operation.
    pub fn index_value(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Indexed { value, .. } => *value,
            TypeKind::Named { underlying, .. } => self.index_value(*underlying),
            _ => None,
        }
    }

    /// The result types of calling this type, in declaration order. Empty
    /// for anything that is not callable.
    pub fn call(&self, id: TypeId) -> &[TypeId] {
        match self.kind(id) {
            TypeKind::Func { results, .. } => results,
            TypeKind::Named { underlying, .. } => self.call(*underlying),
            _ => &[],
        }
    }

    /// The outcome of a binary operation.
    ///
    /// Comparison and logical operators always yield bool. Otherwise an
    /// untyped constant takes the type of the other operand; two concrete
    /// operands keep the left type; two constants collapse to the left
    /// constant's resolved type. Exact constant-arithmetic promotion is
    /// intentionally not replicated.
    pub fn binary_result(&self, lhs: TypeId, op: BinaryOp, rhs: TypeId) -> TypeId {
        if op.yields_bool() {
            return self.bool_id;
        }
        match (self.is_const(lhs), self.is_const(rhs)) {
            (true, false) => rhs,
            (true, true) => self.concrete(lhs),
            _ => lhs,
        }
    }

    fn is_const(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Const { .. })
    }

    /// Unwrap a constant to its resolved concrete type.
    fn concrete(&self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Const {
                resolved: Some(ty), ..
            } => *ty,
            _ => id,
        }
    }

    /// Canonical textual form, for diagnostics and trace output. Not a
    /// basis for type equality.
    pub fn display(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Base { name } => name.clone(),
            TypeKind::Const { literal, resolved } => {
                let ty = match resolved {
                    Some(ty) => self.display(*ty),
                    None => "untyped".to_string(),
                };
                format!("{}={}", ty, literal.value)
            }
            TypeKind::Struct { fields } => {
                let body = fields
                    .iter()
                    .map(|(name, ty)| format!("{}={}", name, self.display(*ty)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("struct {{{}}}", body)
            }
            TypeKind::Indexed { flavor, key, value } => {
                let value = self.display_or_hole(*value);
                match flavor {
                    IndexedFlavor::Slice => format!("[]{}", value),
                    IndexedFlavor::Array { len } => format!("[{}]{}", len, value),
                    IndexedFlavor::Map => {
                        format!("map[{}]{}", self.display_or_hole(*key), value)
                    }
                    IndexedFlavor::Chan(ChanDir::Both) => format!("chan {}", value),
                    IndexedFlavor::Chan(ChanDir::Send) => format!("->chan {}", value),
                    IndexedFlavor::Chan(ChanDir::Recv) => format!("<-chan {}", value),
                }
            }
            TypeKind::Pointer { inner } => format!("*{}", self.display_or_hole(*inner)),
            TypeKind::Func { params, results } => {
                let params = params
                    .iter()
                    .map(|p| self.display(*p))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut text = format!("func ({})", params);
                if !results.is_empty() {
                    let results = results
                        .iter()
                        .map(|r| self.display(*r))
                        .collect::<Vec<_>>()
                        .join(", ");
                    text.push_str(&format!(" ({})", results));
                }
                text
            }
            TypeKind::Package { path, .. } => format!("package {}", path),
            TypeKind::Named { name, .. } => name.clone(),
        }
    }

    fn display_or_hole(&self, id: Option<TypeId>) -> String {
        match id {
            Some(id) => self.display(id),
            None => "?".to_string(),
        }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

fn len_display(expr: &Expr) -> String {
    match expr {
        Expr::Literal(lit) => lit.value.clone(),
        Expr::Name(id) => id.name.clone(),
        _ => "_".to_string(),
    }
}
