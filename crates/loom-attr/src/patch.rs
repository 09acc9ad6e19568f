use crate::ast::{BinaryOp, ExprId, LocalId, MethodDecl, StmtId, UnaryOp};
use crate::context::{AttrContext, Attribution};
use crate::host;
use crate::types::{ClassId, Member, Type, TypeStore};

/// One interception point per construct of the host's semantic analysis.
///
/// Every method defaults to the host behavior in [`host`], so an implementation overrides only
/// what it changes and calls back into `host::*` for the rest.
pub trait CompilerPatchPoint {
    fn visit_method(&mut self, cx: &mut AttrContext<'_>) {
        host::visit_method(self, cx)
    }

    fn visit_ident(&mut self, cx: &mut AttrContext<'_>, expr: ExprId, name: &str) -> Type {
        host::visit_ident(self, cx, expr, name)
    }

    fn visit_select(
        &mut self,
        cx: &mut AttrContext<'_>,
        expr: ExprId,
        receiver: ExprId,
        name: &str,
    ) -> Type {
        host::visit_select(self, cx, expr, receiver, name)
    }

    fn visit_apply(
        &mut self,
        cx: &mut AttrContext<'_>,
        expr: ExprId,
        receiver: Option<ExprId>,
        name: &str,
        args: &[ExprId],
    ) -> Type {
        host::visit_apply(self, cx, expr, receiver, name, args)
    }

    fn visit_binary(
        &mut self,
        cx: &mut AttrContext<'_>,
        expr: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Type {
        host::visit_binary(self, cx, expr, op, lhs, rhs)
    }

    fn visit_unary(&mut self, cx: &mut AttrContext<'_>, expr: ExprId, op: UnaryOp, operand: ExprId) -> Type {
        host::visit_unary(self, cx, expr, op, operand)
    }

    fn visit_var_def(
        &mut self,
        cx: &mut AttrContext<'_>,
        stmt: StmtId,
        local: LocalId,
        init: Option<ExprId>,
    ) {
        host::visit_var_def(self, cx, stmt, local, init)
    }

    fn visit_return(&mut self, cx: &mut AttrContext<'_>, stmt: StmtId, expr: Option<ExprId>) {
        host::visit_return(self, cx, stmt, expr)
    }

    fn visit_foreach(
        &mut self,
        cx: &mut AttrContext<'_>,
        stmt: StmtId,
        var: StmtId,
        iterable: ExprId,
        body: StmtId,
    ) {
        host::visit_foreach(self, cx, stmt, var, iterable, body)
    }

    fn is_accessible(&self, cx: &AttrContext<'_>, owner: ClassId, member: &Member) -> bool {
        host::is_accessible(cx, owner, member)
    }
}

/// The host compiler without any patch applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardAttr;

impl CompilerPatchPoint for StandardAttr {}

/// Attributes `method` through `patch`.
pub fn attribute<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    store: &TypeStore,
    method: &MethodDecl,
) -> Attribution {
    let mut cx = AttrContext::new(store, method);
    patch.visit_method(&mut cx);
    cx.finish()
}
