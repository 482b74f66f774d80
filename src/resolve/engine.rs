//! Forward-declaration resolution for one compilation unit
//!
//! Scans the unit's top-level declarations, defers everything whose type is
//! not yet computable, and resolves the deferred table on demand. There are
//! two recursive definition problem spots:
//!
//! ```text
//! type Node struct { next *Node }
//! type F func(F)
//! ```
//!
//! Both are handled by defining a name in the unit table *before* completing
//! the type behind it, so completion can look the name up and find the entry
//! that is being built.

use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::frontend::ast::{
    Decl, DeclGroup, Expr, FuncDecl, ImportSpec, LitKind, SourceFile, TypeExpr, UnaryOp,
};
use crate::passes::bridge;
use crate::passes::{Granularity, Pass, PassKind, PassOutput, PassResults};
use crate::types::{TypeArena, TypeId, TypeKind};
use crate::utils::{Error, Result};

/// Resolution result for one unit: its name table in definition order plus
/// the wildcard-embedded package references.
#[derive(Debug, Clone, Default)]
pub struct DefinedTypes {
    pub defined: IndexMap<String, TypeId>,
    pub embedded: Vec<TypeId>,
}

/// A declaration whose names have been discovered but whose types are not
/// computed yet. One entry can cover several names (`var a, b = ...`);
/// it is consumed as a whole the first time any of its names is needed.
#[derive(Debug, Clone)]
struct DeferredDecl {
    names: Vec<crate::frontend::ast::Ident>,
    exprs: Vec<DeclExpr>,
    /// Type declarations produce a fresh named identity over the computed
    /// type instead of the computed type itself
    fresh_identity: bool,
}

/// What defines a deferred name: a type expression (type-declaration
/// semantics, completed after the name is defined) or a value expression
/// (plain expression-type inference).
#[derive(Debug, Clone)]
enum DeclExpr {
    Type(TypeExpr),
    Value(Expr),
}

/// How to finish an entry once `begin_completion` has admitted it.
enum CompletionPlan {
    Nothing,
    Const(LitKind),
    Struct,
    Indexed,
    Pointer,
    Func,
}

/// Explicit resolution context for one unit: the name table, the deferred
/// table, the embedded scopes, and the session arena. Passed by reference
/// through every recursive resolution step.
pub struct UnitResolver<'a> {
    unit: &'a SourceFile,
    arena: &'a mut TypeArena,
    results: &'a PassResults,
    defined: IndexMap<String, TypeId>,
    embedded: Vec<TypeId>,
    deferred: IndexMap<String, Rc<DeferredDecl>>,
    pending_methods: Vec<&'a FuncDecl>,
}

impl<'a> UnitResolver<'a> {
    pub fn new(unit: &'a SourceFile, arena: &'a mut TypeArena, results: &'a PassResults) -> Self {
        Self {
            unit,
            arena,
            results,
            defined: IndexMap::new(),
            embedded: Vec::new(),
            deferred: IndexMap::new(),
            pending_methods: Vec::new(),
        }
    }

    /// Resolve the whole unit. On error the context keeps every name that
    /// was fully defined before the failure, for callers that want
    /// diagnostics; the pass publishes nothing in that case.
    pub fn run(&mut self) -> Result<()> {
        let unit = self.unit;
        for decl in &unit.decls {
            self.scan_decl(decl)?;
        }

        // resolve everything still outstanding, in declaration order
        while let Some(name) = self.deferred.keys().next().cloned() {
            let ty = self
                .resolve(&name)?
                .ok_or_else(|| Error::UnresolvedIdentifier { name: name.clone() })?;
            debug!("{} = {}", name, self.arena.display(ty));
        }

        // methods go last, so every receiver type already exists
        self.attach_methods()
    }

    /// The unit's table as resolved so far.
    pub fn into_types(self) -> DefinedTypes {
        DefinedTypes {
            defined: self.defined,
            embedded: self.embedded,
        }
    }

    // ---- declaration scan ----

    fn scan_decl(&mut self, decl: &'a Decl) -> Result<()> {
        match decl {
            Decl::Func(func) if func.receiver.is_some() => {
                self.pending_methods.push(func);
                Ok(())
            }
            Decl::Func(func) => self.defer_entry(DeferredDecl {
                names: vec![func.name.clone()],
                exprs: vec![DeclExpr::Type(TypeExpr::Func(func.sig.clone()))],
                fresh_identity: false,
            }),
            Decl::Group(group) => self.scan_group(group),
        }
    }

    fn scan_group(&mut self, group: &DeclGroup) -> Result<()> {
        // the most recent explicit type or value list carries forward to
        // subsequent entries that bring neither
        let mut carried_type: Option<TypeExpr> = None;
        let mut carried_values: Vec<Expr> = Vec::new();
        for spec in &group.specs {
            match spec {
                crate::frontend::ast::Spec::Type(spec) => self.defer_entry(DeferredDecl {
                    names: vec![spec.name.clone()],
                    exprs: vec![DeclExpr::Type(spec.ty.clone())],
                    fresh_identity: true,
                })?,
                crate::frontend::ast::Spec::Value(spec) => {
                    if spec.ty.is_some() || !spec.values.is_empty() {
                        carried_type = spec.ty.clone();
                        carried_values = spec.values.clone();
                    }
                    let exprs = match &carried_type {
                        // an explicit type is replicated across every name
                        Some(ty) => spec
                            .names
                            .iter()
                            .map(|_| DeclExpr::Type(ty.clone()))
                            .collect(),
                        None => carried_values
                            .iter()
                            .map(|e| DeclExpr::Value(e.clone()))
                            .collect(),
                    };
                    self.defer_entry(DeferredDecl {
                        names: spec.names.clone(),
                        exprs,
                        fresh_identity: false,
                    })?;
                }
                crate::frontend::ast::Spec::Import(spec) => self.import(spec)?,
            }
        }
        Ok(())
    }

    fn defer_entry(&mut self, entry: DeferredDecl) -> Result<()> {
        let entry = Rc::new(entry);
        for ident in &entry.names {
            if ident.name.is_empty() {
                return Err(Error::internal("empty name in a deferred declaration"));
            }
            self.deferred.insert(ident.name.clone(), Rc::clone(&entry));
        }
        Ok(())
    }

    /// Imports resolve immediately: later declarations may use the package
    /// name with no ordering guarantee.
    fn import(&mut self, spec: &ImportSpec) -> Result<()> {
        let name = spec.local_name().to_string();
        if name == "_" {
            return Ok(());
        }
        let exports = bridge::exports(self.results, &spec.path)?;
        let members = exports.members().clone();
        let pkg = self.arena.alloc_completed(TypeKind::Package {
            path: spec.path.clone(),
            members,
        });
        if name == "." {
            trace!("embedding unit {} into {}", spec.path, self.unit.path);
            self.embedded.push(pkg);
            Ok(())
        } else {
            self.define(&name, pkg)
        }
    }

    // ---- the name table ----

    fn define(&mut self, name: &str, ty: TypeId) -> Result<()> {
        if let Some(&existing) = self.defined.get(name) {
            // importing the same path twice under one name is harmless
            let tolerated = matches!(
                (self.arena.kind(existing), self.arena.kind(ty)),
                (
                    TypeKind::Package { path: a, .. },
                    TypeKind::Package { path: b, .. },
                ) if a == b
            );
            if !tolerated {
                return Err(Error::Redefinition {
                    name: name.to_string(),
                    existing: self.arena.display(existing),
                    incoming: self.arena.display(ty),
                });
            }
            return Ok(());
        }
        self.deferred.shift_remove(name);
        trace!("define {} = {}", name, self.arena.display(ty));
        self.defined.insert(name.to_string(), ty);
        Ok(())
    }

    /// The resolver function: deferred entries first, then the unit table,
    /// then embedded scopes (exported members, import order, first match
    /// wins), then builtins. Absent names yield `None`.
    fn resolve(&mut self, name: &str) -> Result<Option<TypeId>> {
        if name.is_empty() {
            return Err(Error::internal("resolver invoked with an empty name"));
        }
        if let Some(entry) = self.deferred.get(name).cloned() {
            // take the entry off every name it covers before touching it,
            // so a re-entrant lookup cannot process it twice
            for covered in &entry.names {
                self.deferred.shift_remove(&covered.name);
            }
            self.resolve_deferred(&entry)?;
        }
        if let Some(&ty) = self.defined.get(name) {
            return Ok(Some(ty));
        }
        if is_exported(name) {
            for &pkg in &self.embedded {
                if let Some(ty) = self.arena.field(pkg, name) {
                    return Ok(Some(ty));
                }
            }
        }
        Ok(self.arena.builtin(name))
    }

    fn lookup_required(&mut self, name: &str) -> Result<TypeId> {
        self.resolve(name)?.ok_or_else(|| Error::UnresolvedIdentifier {
            name: name.to_string(),
        })
    }

    fn resolve_deferred(&mut self, entry: &DeferredDecl) -> Result<()> {
        if entry.names.len() > entry.exprs.len() {
            // multi-result destructuring: one call supplies every name
            if entry.exprs.len() != 1 {
                return Err(Error::internal(format!(
                    "invalid multi-assign: {} expressions for {} names",
                    entry.exprs.len(),
                    entry.names.len()
                )));
            }
            let DeclExpr::Value(expr) = &entry.exprs[0] else {
                return Err(Error::internal("multi-assign from a type expression"));
            };
            let results = self.call_results(expr)?;
            if results.len() != entry.names.len() {
                return Err(Error::internal(format!(
                    "multi-assign arity mismatch: {} results for {} names",
                    results.len(),
                    entry.names.len()
                )));
            }
            for (ident, ty) in entry.names.iter().zip(results) {
                self.define(&ident.name, ty)?;
            }
            return Ok(());
        }

        if entry.names.len() != entry.exprs.len() {
            return Err(Error::internal(format!(
                "declaration entry with {} names but {} expressions",
                entry.names.len(),
                entry.exprs.len()
            )));
        }

        for (ident, dexpr) in entry.names.iter().zip(&entry.exprs) {
            match dexpr {
                DeclExpr::Value(expr) => {
                    let ty = self.type_of(expr)?;
                    self.define(&ident.name, ty)?;
                }
                DeclExpr::Type(texpr) => {
                    let underlying = self.arena.type_decl(texpr);
                    let visible = if entry.fresh_identity {
                        self.arena.alloc(
                            TypeKind::Named {
                                name: ident.name.clone(),
                                underlying,
                                methods: IndexMap::new(),
                            },
                            None,
                        )
                    } else {
                        underlying
                    };
                    self.define(&ident.name, visible)?;
                    // complete only after the name is defined, so the
                    // declaration can refer to itself
                    self.complete(underlying)?;
                    if entry.fresh_identity {
                        self.complete(visible)?;
                    }
                }
            }
        }
        Ok(())
    }

    // ---- completion ----

    /// Fill in an entry's internal references. Exactly once per entry;
    /// the arena rejects a second attempt.
    fn complete(&mut self, id: TypeId) -> Result<()> {
        self.arena.begin_completion(id)?;
        let plan = match self.arena.kind(id) {
            TypeKind::Base { .. } | TypeKind::Named { .. } | TypeKind::Package { .. } => {
                CompletionPlan::Nothing
            }
            TypeKind::Const { literal, .. } => CompletionPlan::Const(literal.kind),
            TypeKind::Struct { .. } => CompletionPlan::Struct,
            TypeKind::Indexed { .. } => CompletionPlan::Indexed,
            TypeKind::Pointer { .. } => CompletionPlan::Pointer,
            TypeKind::Func { .. } => CompletionPlan::Func,
        };
        let decl = self.arena.decl_expr(id).cloned();
        match plan {
            CompletionPlan::Nothing => Ok(()),
            CompletionPlan::Const(kind) => self.complete_const(id, kind),
            CompletionPlan::Struct => self.complete_struct(id, decl),
            CompletionPlan::Indexed => self.complete_indexed(id, decl),
            CompletionPlan::Pointer => self.complete_pointer(id, decl),
            CompletionPlan::Func => self.complete_func(id, decl),
        }
    }

    /// An untyped constant resolves to its concrete literal type.
    fn complete_const(&mut self, id: TypeId, kind: LitKind) -> Result<()> {
        let name = match kind {
            LitKind::Int => "int",
            LitKind::Float => "float64",
            LitKind::Str => "string",
        };
        let ty = self.lookup_required(name)?;
        if let TypeKind::Const { resolved, .. } = self.arena.kind_mut(id) {
            *resolved = Some(ty);
        }
        Ok(())
    }

    /// Fill in all struct or interface members. Embedded fields take the
    /// trailing identifier of their type expression as their name.
    fn complete_struct(&mut self, id: TypeId, decl: Option<TypeExpr>) -> Result<()> {
        let members = match decl {
            Some(TypeExpr::Struct { fields }) => fields,
            Some(TypeExpr::Interface { methods }) => methods,
            _ => return Err(Error::internal("aggregate entry without a field list")),
        };
        for member in &members {
            let ty = self.type_from(&member.ty)?;
            if member.names.is_empty() {
                let name = member
                    .ty
                    .trailing_ident()
                    .ok_or_else(|| Error::internal("embedded field without a trailing identifier"))?
                    .name
                    .clone();
                self.add_field(id, name, ty)?;
            } else {
                for ident in &member.names {
                    self.add_field(id, ident.name.clone(), ty)?;
                }
            }
        }
        Ok(())
    }

    fn add_field(&mut self, id: TypeId, name: String, ty: TypeId) -> Result<()> {
        if let TypeKind::Struct { fields } = self.arena.kind_mut(id) {
            fields.insert(name, ty);
            Ok(())
        } else {
            Err(Error::internal("field added to a non-aggregate type"))
        }
    }

    /// Fill in key and value sections. Slices and channels carry no key.
    fn complete_indexed(&mut self, id: TypeId, decl: Option<TypeExpr>) -> Result<()> {
        let (key, value) = match decl {
            Some(TypeExpr::Array { len, elem }) => {
                let key = match len {
                    Some(_) => Some(self.lookup_required("int")?),
                    None => None,
                };
                (key, self.type_from(&elem)?)
            }
            Some(TypeExpr::Map { key, value }) => {
                (Some(self.type_from(&key)?), self.type_from(&value)?)
            }
            Some(TypeExpr::Chan { elem, .. }) => (None, self.type_from(&elem)?),
            _ => return Err(Error::internal("indexed entry without an indexed declaration")),
        };
        if let TypeKind::Indexed {
            key: slot_key,
            value: slot_value,
            ..
        } = self.arena.kind_mut(id)
        {
            *slot_key = key;
            *slot_value = Some(value);
        }
        Ok(())
    }

    fn complete_pointer(&mut self, id: TypeId, decl: Option<TypeExpr>) -> Result<()> {
        let Some(TypeExpr::Pointer(target)) = decl else {
            return Err(Error::internal("pointer entry without a pointer declaration"));
        };
        let inner = self.type_from(&target)?;
        if let TypeKind::Pointer { inner: slot } = self.arena.kind_mut(id) {
            *slot = Some(inner);
        }
        Ok(())
    }

    /// Fill in params and results, replicated per declared name.
    fn complete_func(&mut self, id: TypeId, decl: Option<TypeExpr>) -> Result<()> {
        let Some(TypeExpr::Func(sig)) = decl else {
            return Err(Error::internal("func entry without a signature"));
        };
        let mut params = Vec::new();
        for group in &sig.params {
            let ty = self.type_from(&group.ty)?;
            for _ in 0..group.names.len().max(1) {
                params.push(ty);
            }
        }
        let mut results = Vec::new();
        for group in &sig.results {
            let ty = self.type_from(&group.ty)?;
            for _ in 0..group.names.len().max(1) {
                results.push(ty);
            }
        }
        if let TypeKind::Func {
            params: slot_params,
            results: slot_results,
        } = self.arena.kind_mut(id)
        {
            *slot_params = params;
            *slot_results = results;
        }
        Ok(())
    }

    // ---- expression and type-expression typing ----

    /// The type a type expression denotes in resolving position: names go
    /// through the resolver, everything structural becomes a fresh
    /// completed entry.
    fn type_from(&mut self, texpr: &TypeExpr) -> Result<TypeId> {
        match texpr {
            TypeExpr::Name(ident) => self.lookup_required(&ident.name),
            TypeExpr::Qualified { pkg, name } => {
                let pkg_ty = self.lookup_required(&pkg.name)?;
                self.member(pkg_ty, &name.name)
            }
            _ => {
                let id = self.arena.type_decl(texpr);
                self.complete(id)?;
                Ok(id)
            }
        }
    }

    /// The type of a value expression.
    fn type_of(&mut self, expr: &Expr) -> Result<TypeId> {
        match expr {
            Expr::Name(ident) => self.lookup_required(&ident.name),
            Expr::Literal(lit) => {
                let id = self.arena.alloc(
                    TypeKind::Const {
                        literal: lit.clone(),
                        resolved: None,
                    },
                    None,
                );
                self.complete(id)?;
                Ok(id)
            }
            Expr::Call { callee, args } => self.type_of_call(callee, args),
            Expr::Index { base, .. } => {
                let b = self.type_of(base)?;
                self.arena
                    .index_value(b)
                    .ok_or_else(|| self.unsupported(b, "indexing"))
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Addr => {
                    let inner = self.type_of(operand)?;
                    Ok(self
                        .arena
                        .alloc_completed(TypeKind::Pointer { inner: Some(inner) }))
                }
                UnaryOp::Deref => {
                    let b = self.type_of(operand)?;
                    self.arena
                        .dereference(b)
                        .ok_or_else(|| self.unsupported(b, "dereferencing"))
                }
                UnaryOp::Recv => {
                    let b = self.type_of(operand)?;
                    self.arena
                        .index_value(b)
                        .ok_or_else(|| self.unsupported(b, "a channel receive"))
                }
                UnaryOp::Not => Ok(self.arena.bool_type()),
                UnaryOp::Neg => self.type_of(operand),
            },
            Expr::Binary { left, op, right } => {
                let lhs = self.type_of(left)?;
                let rhs = self.type_of(right)?;
                let result = self.arena.binary_result(lhs, *op, rhs);
                trace!(
                    "{} = {} {:?} {}",
                    self.arena.display(result),
                    self.arena.display(lhs),
                    op,
                    self.arena.display(rhs)
                );
                Ok(result)
            }
            Expr::Selector { base, field } => {
                let b = self.type_of(base)?;
                self.member(b, &field.name)
            }
            Expr::Composite { ty } => self.type_from(ty),
            Expr::FuncLit { sig } => {
                let id = self.arena.type_decl(&TypeExpr::Func(sig.clone()));
                self.complete(id)?;
                Ok(id)
            }
            Expr::Type(texpr) => self.type_from(texpr),
        }
    }

    fn type_of_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<TypeId> {
        // the dynamic allocation builtin: its result type comes from the
        // argument expression, not from the builtin table
        if let Expr::Name(ident) = callee {
            if ident.name == "make" {
                let Some(Expr::Type(texpr)) = args.first() else {
                    return Err(Error::UnsupportedOperation {
                        ty: "make".to_string(),
                        operation: "allocation without a type argument",
                    });
                };
                return self.type_from(texpr);
            }
        }
        let callee_ty = self.type_of(callee)?;
        let results = self.arena.call(callee_ty);
        match results.len() {
            1 => Ok(results[0]),
            0 => match self.arena.kind(callee_ty) {
                TypeKind::Func { .. } => {
                    Err(self.unsupported(callee_ty, "calling for a value (no results)"))
                }
                // calling a type is a conversion: int32(x), Celsius(x)
                _ => Ok(callee_ty),
            },
            _ => Err(self.unsupported(callee_ty, "a multi-valued call in single-value context")),
        }
    }

    /// Member access: package members answer `CrossUnitLookup` on a miss,
    /// everything else goes through field lookup.
    fn member(&mut self, base: TypeId, name: &str) -> Result<TypeId> {
        if let TypeKind::Package { path, members } = self.arena.kind(base) {
            let path = path.clone();
            return match members.get(name).copied() {
                Some(ty) => {
                    trace!(
                        "cross-unit lookup: {}.{} = {}",
                        path,
                        name,
                        self.arena.display(ty)
                    );
                    Ok(ty)
                }
                None => Err(Error::CrossUnitLookup {
                    path,
                    name: name.to_string(),
                }),
            };
        }
        self.arena
            .field(base, name)
            .ok_or_else(|| Error::UnresolvedIdentifier {
                name: name.to_string(),
            })
    }

    /// The full result list of a call expression, for destructuring.
    fn call_results(&mut self, expr: &Expr) -> Result<Vec<TypeId>> {
        let Expr::Call { callee, .. } = expr else {
            let ty = self.type_of(expr)?;
            return Err(self.unsupported(ty, "multi-value destructuring"));
        };
        let callee_ty = self.type_of(callee)?;
        let results = self.arena.call(callee_ty).to_vec();
        if results.is_empty() {
            return Err(self.unsupported(callee_ty, "multi-value destructuring"));
        }
        Ok(results)
    }

    // ---- methods ----

    /// Receiver-bearing declarations resolve after everything else, so the
    /// receiver type is guaranteed to exist and accept members.
    fn attach_methods(&mut self) -> Result<()> {
        let methods = std::mem::take(&mut self.pending_methods);
        for method in methods {
            let Some(receiver) = &method.receiver else {
                continue;
            };
            let recv_ty = self.receiver_type(&receiver.ty)?;
            let func_id = self.arena.type_decl(&TypeExpr::Func(method.sig.clone()));
            self.complete(func_id)?;
            let method_name = method.name.name.clone();
            let previous = match self.arena.kind(recv_ty) {
                TypeKind::Named { methods, .. } => methods.get(&method_name).copied(),
                _ => return Err(self.unsupported(recv_ty, "method attachment")),
            };
            if let Some(previous) = previous {
                return Err(Error::Redefinition {
                    name: method_name,
                    existing: self.arena.display(previous),
                    incoming: self.arena.display(func_id),
                });
            }
            debug!(
                "attach {}.{} = {}",
                self.arena.display(recv_ty),
                method_name,
                self.arena.display(func_id)
            );
            if let TypeKind::Named { methods, .. } = self.arena.kind_mut(recv_ty) {
                methods.insert(method_name, func_id);
            }
        }
        Ok(())
    }

    /// The named type behind a receiver expression, through any pointer.
    fn receiver_type(&mut self, texpr: &TypeExpr) -> Result<TypeId> {
        match texpr {
            TypeExpr::Pointer(inner) => self.receiver_type(inner),
            TypeExpr::Name(ident) => self.lookup_required(&ident.name),
            _ => Err(Error::internal("method receiver must name a local type")),
        }
    }

    fn unsupported(&self, id: TypeId, operation: &'static str) -> Error {
        Error::UnsupportedOperation {
            ty: self.arena.display(id),
            operation,
        }
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Resolve one unit against the already-published results of its imports.
pub fn resolve_unit(
    unit: &SourceFile,
    arena: &mut TypeArena,
    results: &PassResults,
) -> Result<DefinedTypes> {
    let mut resolver = UnitResolver::new(unit, arena, results);
    resolver.run()?;
    Ok(resolver.into_types())
}

/// The resolution pass: one run per compilation unit, no dependencies,
/// publishes the unit's `DefinedTypes`.
pub struct TypeResolutionPass;

impl Pass for TypeResolutionPass {
    fn kind(&self) -> PassKind {
        PassKind::TypeResolution
    }

    fn granularity(&self) -> Granularity {
        Granularity::PerUnit
    }

    fn dependencies(&self) -> Vec<PassKind> {
        Vec::new()
    }

    fn run_unit(
        &self,
        unit: &SourceFile,
        arena: &mut TypeArena,
        results: &PassResults,
    ) -> Result<PassOutput> {
        resolve_unit(unit, arena, results).map(PassOutput::Types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{
        BinaryOp, ChanDir, FieldDecl, FuncSig, Ident, Literal, Spec, TypeSpec, ValueSpec,
    };
    use crate::utils::Span;
    use pretty_assertions::assert_eq;

    fn ty_name(name: &str) -> TypeExpr {
        TypeExpr::Name(Ident::new(name))
    }

    fn name_expr(name: &str) -> Expr {
        Expr::Name(Ident::new(name))
    }

    fn int_lit(value: &str) -> Expr {
        Expr::Literal(Literal {
            kind: LitKind::Int,
            value: value.to_string(),
            span: Span::dummy(),
        })
    }

    fn group(specs: Vec<Spec>) -> Decl {
        Decl::Group(DeclGroup { specs })
    }

    fn type_decl(name: &str, ty: TypeExpr) -> Decl {
        group(vec![Spec::Type(TypeSpec {
            name: Ident::new(name),
            ty,
        })])
    }

    fn value_spec(names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Spec {
        Spec::Value(ValueSpec {
            names: names.iter().map(|n| Ident::new(*n)).collect(),
            ty,
            values,
        })
    }

    fn func_decl(name: &str, sig: FuncSig) -> Decl {
        Decl::Func(FuncDecl {
            name: Ident::new(name),
            receiver: None,
            sig,
            span: Span::dummy(),
        })
    }

    fn results_sig(result_types: &[&str]) -> FuncSig {
        FuncSig {
            params: Vec::new(),
            results: result_types
                .iter()
                .map(|ty| FieldDecl {
                    names: Vec::new(),
                    ty: ty_name(ty),
                })
                .collect(),
        }
    }

    fn unit(path: &str, decls: Vec<Decl>) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            decls,
        }
    }

    fn call(callee: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: Box::new(name_expr(callee)),
            args,
        }
    }

    fn resolve_one(file: &SourceFile) -> (TypeArena, Result<DefinedTypes>) {
        let mut arena = TypeArena::new();
        let results = PassResults::new();
        let out = resolve_unit(file, &mut arena, &results);
        (arena, out)
    }

    #[test]
    fn self_referential_struct_terminates() {
        let file = unit(
            "list",
            vec![type_decl(
                "Node",
                TypeExpr::Struct {
                    fields: vec![
                        FieldDecl {
                            names: vec![Ident::new("next")],
                            ty: TypeExpr::Pointer(Box::new(ty_name("Node"))),
                        },
                        FieldDecl {
                            names: vec![Ident::new("value")],
                            ty: ty_name("int"),
                        },
                    ],
                },
            )],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        let node = types.defined["Node"];
        let next = arena.field(node, "next").unwrap();
        // the field's dereferenced type is the struct's own resolved type
        assert_eq!(arena.dereference(next), Some(node));
        assert_eq!(arena.fields(node), vec!["next", "value"]);
    }

    #[test]
    fn recursive_func_type_references_itself() {
        let file = unit(
            "rec",
            vec![type_decl(
                "F",
                TypeExpr::Func(FuncSig {
                    params: vec![FieldDecl {
                        names: Vec::new(),
                        ty: ty_name("F"),
                    }],
                    results: Vec::new(),
                }),
            )],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        let f = types.defined["F"];
        let TypeKind::Named { underlying, .. } = arena.kind(f) else {
            panic!("type declarations produce a fresh identity");
        };
        let TypeKind::Func { params, .. } = arena.kind(*underlying) else {
            panic!("underlying type is the signature");
        };
        assert_eq!(params, &vec![f]);
        // its parameter's call-result shape matches its own
        assert_eq!(arena.call(params[0]), arena.call(f));
    }

    #[test]
    fn multi_result_call_destructures_in_order() {
        let file = unit(
            "dest",
            vec![
                func_decl("two", results_sig(&["int", "string"])),
                group(vec![value_spec(&["a", "b"], None, vec![call("two", vec![])])]),
            ],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        assert_eq!(types.defined["a"], arena.builtin("int").unwrap());
        assert_eq!(types.defined["b"], arena.builtin("string").unwrap());
    }

    #[test]
    fn multi_assign_arity_mismatch_is_internal() {
        let file = unit(
            "dest",
            vec![
                func_decl("two", results_sig(&["int", "string"])),
                group(vec![value_spec(
                    &["a", "b", "c"],
                    None,
                    vec![call("two", vec![])],
                )]),
            ],
        );
        let (_, out) = resolve_one(&file);
        assert!(matches!(
            out.unwrap_err(),
            Error::InternalConsistency { .. }
        ));
    }

    #[test]
    fn single_result_call_types_its_value() {
        let file = unit(
            "one",
            vec![
                func_decl("answer", results_sig(&["int"])),
                group(vec![value_spec(&["x"], None, vec![call("answer", vec![])])]),
            ],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        assert_eq!(types.defined["x"], arena.builtin("int").unwrap());
    }

    #[test]
    fn unresolved_name_keeps_prior_definitions() {
        let file = unit(
            "bad",
            vec![
                type_decl("A", ty_name("int")),
                group(vec![value_spec(&["x"], None, vec![name_expr("missing")])]),
            ],
        );
        let mut arena = TypeArena::new();
        let results = PassResults::new();
        let mut resolver = UnitResolver::new(&file, &mut arena, &results);
        let err = resolver.run().unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedIdentifier {
                name: "missing".to_string()
            }
        );
        let types = resolver.into_types();
        assert!(types.defined.contains_key("A"));
        assert!(!types.defined.contains_key("x"));
    }

    #[test]
    fn embedded_fields_take_their_trailing_identifier() {
        let file = unit(
            "emb",
            vec![
                type_decl("Base", TypeExpr::Struct { fields: vec![] }),
                type_decl(
                    "Wrapper",
                    TypeExpr::Struct {
                        fields: vec![
                            FieldDecl {
                                names: vec![Ident::new("tag")],
                                ty: ty_name("string"),
                            },
                            FieldDecl {
                                names: Vec::new(),
                                ty: TypeExpr::Pointer(Box::new(ty_name("Base"))),
                            },
                        ],
                    },
                ),
            ],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        let wrapper = types.defined["Wrapper"];
        assert_eq!(arena.fields(wrapper), vec!["tag", "Base"]);
        let embedded = arena.field(wrapper, "Base").unwrap();
        assert_eq!(arena.dereference(embedded), Some(types.defined["Base"]));
    }

    #[test]
    fn methods_attach_after_the_pass_not_into_the_table() {
        let file = unit(
            "meth",
            vec![
                type_decl("Buffer", TypeExpr::Struct { fields: vec![] }),
                Decl::Func(FuncDecl {
                    name: Ident::new("Len"),
                    receiver: Some(crate::frontend::ast::Receiver {
                        name: Some(Ident::new("b")),
                        ty: TypeExpr::Pointer(Box::new(ty_name("Buffer"))),
                    }),
                    sig: results_sig(&["int"]),
                    span: Span::dummy(),
                }),
            ],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        assert!(!types.defined.contains_key("Len"));
        let buffer = types.defined["Buffer"];
        let method = arena.field(buffer, "Len").unwrap();
        assert_eq!(arena.call(method), &[arena.builtin("int").unwrap()]);
    }

    #[test]
    fn value_groups_carry_the_latest_type_or_values() {
        let file = unit(
            "grp",
            vec![group(vec![
                value_spec(&["a", "b"], Some(ty_name("int")), vec![int_lit("1"), int_lit("2")]),
                value_spec(&["c", "d"], None, vec![]),
                value_spec(&["e"], None, vec![name_expr("iota")]),
                value_spec(&["f"], None, vec![]),
            ])],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        // a..d all replicate the carried explicit type expression
        for name in ["a", "b", "c", "d"] {
            let ty = types.defined[name];
            assert!(
                matches!(arena.kind(ty), TypeKind::Base { name } if name == "int"),
                "{name} should carry the declared type"
            );
        }
        // e resets the carried state to a value list; f inherits it
        assert_eq!(types.defined["e"], arena.builtin("int").unwrap());
        assert_eq!(types.defined["f"], arena.builtin("int").unwrap());
    }

    #[test]
    fn make_takes_its_type_from_the_argument() {
        let file = unit(
            "mk",
            vec![group(vec![value_spec(
                &["ch"],
                None,
                vec![Expr::Call {
                    callee: Box::new(name_expr("make")),
                    args: vec![Expr::Type(Box::new(TypeExpr::Chan {
                        dir: ChanDir::Both,
                        elem: Box::new(ty_name("int")),
                    }))],
                }],
            )])],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        let ch = types.defined["ch"];
        assert_eq!(arena.index_value(ch), arena.builtin("int"));
        assert_eq!(arena.index_key(ch), None);
    }

    #[test]
    fn conversion_to_a_builtin_yields_the_builtin() {
        let file = unit(
            "conv",
            vec![group(vec![value_spec(
                &["x"],
                None,
                vec![call("int32", vec![int_lit("7")])],
            )])],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        assert_eq!(types.defined["x"], arena.builtin("int32").unwrap());
    }

    #[test]
    fn binary_expression_promotes_the_constant_operand() {
        let file = unit(
            "bin",
            vec![
                group(vec![value_spec(&["base"], Some(ty_name("float64")), vec![])]),
                group(vec![value_spec(
                    &["scaled"],
                    None,
                    vec![Expr::Binary {
                        left: Box::new(int_lit("2")),
                        op: BinaryOp::Mul,
                        right: Box::new(name_expr("base")),
                    }],
                )]),
                group(vec![value_spec(
                    &["cmp"],
                    None,
                    vec![Expr::Binary {
                        left: Box::new(name_expr("base")),
                        op: BinaryOp::Lt,
                        right: Box::new(int_lit("10")),
                    }],
                )]),
            ],
        );
        let (arena, out) = resolve_one(&file);
        let types = out.unwrap();
        assert_eq!(types.defined["scaled"], types.defined["base"]);
        assert_eq!(types.defined["cmp"], arena.bool_type());
    }

    #[test]
    fn empty_deferred_name_is_internal() {
        let file = unit(
            "empty",
            vec![group(vec![value_spec(&[""], None, vec![int_lit("1")])])],
        );
        let (_, out) = resolve_one(&file);
        assert!(matches!(
            out.unwrap_err(),
            Error::InternalConsistency { .. }
        ));
    }

    // ---- cross-unit cases ----

    fn published_library(arena: &mut TypeArena) -> PassResults {
        let lib = unit(
            "lib/geo",
            vec![
                type_decl(
                    "Point",
                    TypeExpr::Struct {
                        fields: vec![FieldDecl {
                            names: vec![Ident::new("X"), Ident::new("Y")],
                            ty: ty_name("float64"),
                        }],
                    },
                ),
                type_decl("hidden", TypeExpr::Struct { fields: vec![] }),
            ],
        );
        let mut results = PassResults::new();
        let types = resolve_unit(&lib, arena, &results).unwrap();
        results
            .publish(PassKind::TypeResolution, "lib/geo", PassOutput::Types(types))
            .unwrap();
        results
    }

    #[test]
    fn selector_into_an_imported_unit() {
        let mut arena = TypeArena::new();
        let results = published_library(&mut arena);
        let file = unit(
            "app",
            vec![
                group(vec![Spec::Import(ImportSpec {
                    alias: None,
                    path: "lib/geo".to_string(),
                })]),
                group(vec![value_spec(
                    &["p"],
                    None,
                    vec![Expr::Composite {
                        ty: TypeExpr::Qualified {
                            pkg: Ident::new("geo"),
                            name: Ident::new("Point"),
                        },
                    }],
                )]),
            ],
        );
        let types = resolve_unit(&file, &mut arena, &results).unwrap();
        let p = types.defined["p"];
        assert_eq!(arena.fields(p), vec!["X", "Y"]);
    }

    #[test]
    fn missing_member_is_a_cross_unit_error() {
        let mut arena = TypeArena::new();
        let results = published_library(&mut arena);
        let file = unit(
            "app",
            vec![
                group(vec![Spec::Import(ImportSpec {
                    alias: None,
                    path: "lib/geo".to_string(),
                })]),
                group(vec![value_spec(
                    &["p"],
                    None,
                    vec![Expr::Composite {
                        ty: TypeExpr::Qualified {
                            pkg: Ident::new("geo"),
                            name: Ident::new("Missing"),
                        },
                    }],
                )]),
            ],
        );
        let err = resolve_unit(&file, &mut arena, &results).unwrap_err();
        assert_eq!(
            err,
            Error::CrossUnitLookup {
                path: "lib/geo".to_string(),
                name: "Missing".to_string()
            }
        );
    }

    #[test]
    fn wildcard_import_embeds_exported_members_only() {
        let mut arena = TypeArena::new();
        let results = published_library(&mut arena);
        let import = group(vec![Spec::Import(ImportSpec {
            alias: Some(Ident::new(".")),
            path: "lib/geo".to_string(),
        })]);

        let ok = unit(
            "app",
            vec![
                import.clone(),
                group(vec![value_spec(
                    &["p"],
                    None,
                    vec![Expr::Composite {
                        ty: ty_name("Point"),
                    }],
                )]),
            ],
        );
        let types = resolve_unit(&ok, &mut arena, &results).unwrap();
        assert_eq!(types.embedded.len(), 1);
        assert_eq!(arena.fields(types.defined["p"]), vec!["X", "Y"]);

        let bad = unit(
            "app2",
            vec![
                import,
                group(vec![value_spec(
                    &["q"],
                    None,
                    vec![Expr::Composite {
                        ty: ty_name("hidden"),
                    }],
                )]),
            ],
        );
        let err = resolve_unit(&bad, &mut arena, &results).unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedIdentifier {
                name: "hidden".to_string()
            }
        );
    }

    #[test]
    fn repeated_import_of_one_path_is_tolerated() {
        let mut arena = TypeArena::new();
        let results = published_library(&mut arena);
        let file = unit(
            "app",
            vec![group(vec![
                Spec::Import(ImportSpec {
                    alias: None,
                    path: "lib/geo".to_string(),
                }),
                Spec::Import(ImportSpec {
                    alias: Some(Ident::new("geo")),
                    path: "lib/geo".to_string(),
                }),
            ])],
        );
        let types = resolve_unit(&file, &mut arena, &results).unwrap();
        assert!(types.defined.contains_key("geo"));
    }

    #[test]
    fn two_paths_under_one_name_is_a_redefinition() {
        let mut arena = TypeArena::new();
        let mut results = published_library(&mut arena);
        let other = resolve_unit(&unit("other/geo", vec![]), &mut arena, &results).unwrap();
        results
            .publish(
                PassKind::TypeResolution,
                "other/geo",
                PassOutput::Types(other),
            )
            .unwrap();

        let file = unit(
            "app",
            vec![group(vec![
                Spec::Import(ImportSpec {
                    alias: None,
                    path: "lib/geo".to_string(),
                }),
                Spec::Import(ImportSpec {
                    alias: Some(Ident::new("geo")),
                    path: "other/geo".to_string(),
                }),
            ])],
        );
        let err = resolve_unit(&file, &mut arena, &results).unwrap_err();
        assert!(matches!(err, Error::Redefinition { name, .. } if name == "geo"));
    }

    #[test]
    fn import_of_an_unpublished_path_fails() {
        let file = unit(
            "app",
            vec![group(vec![Spec::Import(ImportSpec {
                alias: None,
                path: "no/such/unit".to_string(),
            })])],
        );
        let (_, out) = resolve_one(&file);
        assert_eq!(
            out.unwrap_err(),
            Error::PackageNotFound {
                path: "no/such/unit".to_string()
            }
        );
    }
}
