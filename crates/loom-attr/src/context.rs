use std::collections::HashMap;

use loom_core::Diagnostic;

use crate::ast::{Body, ExprId, LocalId, MethodDecl};
use crate::types::{Type, TypeStore};

/// Mutable state of one method's attribution.
pub struct AttrContext<'a> {
    store: &'a TypeStore,
    method: &'a MethodDecl,
    expr_types: Vec<Option<Type>>,
    local_types: Vec<Option<Type>>,
    scope: Vec<(String, LocalId)>,
    qualifier_overrides: HashMap<ExprId, Type>,
    return_type: Type,
    expected_return: Option<Type>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> AttrContext<'a> {
    pub fn new(store: &'a TypeStore, method: &'a MethodDecl) -> Self {
        Self {
            store,
            method,
            expr_types: vec![None; method.body.expr_count()],
            local_types: vec![None; method.body.local_count()],
            scope: Vec::new(),
            qualifier_overrides: HashMap::new(),
            return_type: method.return_type.clone(),
            expected_return: Some(method.return_type.clone()),
            diagnostics: Vec::new(),
        }
    }

    pub fn store(&self) -> &'a TypeStore {
        self.store
    }

    pub fn method(&self) -> &'a MethodDecl {
        self.method
    }

    pub fn body(&self) -> &'a Body {
        &self.method.body
    }

    pub fn record_expr(&mut self, expr: ExprId, ty: Type) {
        self.expr_types[expr.idx()] = Some(ty);
    }

    pub fn expr_type(&self, expr: ExprId) -> Option<&Type> {
        self.expr_types[expr.idx()].as_ref()
    }

    pub fn set_local_type(&mut self, local: LocalId, ty: Type) {
        self.local_types[local.idx()] = Some(ty);
    }

    /// The attributed type of `local`, or its declared type before attribution reached it.
    pub fn local_type(&self, local: LocalId) -> Type {
        self.local_types[local.idx()]
            .clone()
            .unwrap_or_else(|| self.body().local(local).declared.clone())
    }

    /// Brings `local` into scope under its name.
    pub fn declare(&mut self, local: LocalId) {
        let name = self.body().local(local).name.clone();
        self.scope.push((name, local));
    }

    pub fn lookup_local(&self, name: &str) -> Option<LocalId> {
        self.scope
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, local)| *local)
    }

    pub fn scope_mark(&self) -> usize {
        self.scope.len()
    }

    pub fn restore_scope(&mut self, mark: usize) {
        self.scope.truncate(mark);
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostics_len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Drops diagnostics reported after `len`, e.g. those of an attempt about to be retried.
    pub fn truncate_diagnostics(&mut self, len: usize) {
        self.diagnostics.truncate(len);
    }

    /// Makes `expr` attribute as `ty` until cleared.
    pub fn override_qualifier(&mut self, expr: ExprId, ty: Type) {
        self.qualifier_overrides.insert(expr, ty);
    }

    pub fn clear_qualifier(&mut self, expr: ExprId) {
        self.qualifier_overrides.remove(&expr);
    }

    pub fn qualifier_override(&self, expr: ExprId) -> Option<&Type> {
        self.qualifier_overrides.get(&expr)
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn set_return_type(&mut self, ty: Type) {
        self.return_type = ty;
    }

    /// Type `return` expressions are checked against; `None` disables the check.
    pub fn expected_return(&self) -> Option<&Type> {
        self.expected_return.as_ref()
    }

    pub fn set_expected_return(&mut self, ty: Option<Type>) {
        self.expected_return = ty;
    }

    pub fn finish(self) -> Attribution {
        Attribution {
            return_type: self.return_type,
            expr_types: self.expr_types,
            local_types: self.local_types,
            diagnostics: self.diagnostics,
        }
    }
}

/// Result of attributing one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub return_type: Type,
    pub expr_types: Vec<Option<Type>>,
    pub local_types: Vec<Option<Type>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Attribution {
    pub fn expr_type(&self, expr: ExprId) -> Option<&Type> {
        self.expr_types.get(expr.idx()).and_then(Option::as_ref)
    }

    pub fn local_type(&self, local: LocalId) -> Option<&Type> {
        self.local_types.get(local.idx()).and_then(Option::as_ref)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }
}
