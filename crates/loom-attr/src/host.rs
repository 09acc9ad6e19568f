//! The host compiler's own attribution behavior.
//!
//! Each `visit_*` function is what the corresponding [`CompilerPatchPoint`] method does when it
//! is not overridden. Sub-expressions and statements are attributed through the patch passed in,
//! so overrides apply at every depth.

use loom_core::{Diagnostic, Span};

use crate::ast::{BinaryOp, Expr, ExprId, LiteralKind, LocalId, Stmt, StmtId, UnaryOp};
use crate::context::AttrContext;
use crate::patch::CompilerPatchPoint;
use crate::types::{Access, ClassId, Member, MemberKind, PrimitiveType, Type};

pub const CANT_RESOLVE: &str = "ATTR_CANT_RESOLVE";
pub const ACCESS: &str = "ATTR_ACCESS";
pub const INCOMPATIBLE: &str = "ATTR_INCOMPATIBLE";
pub const BAD_OPERANDS: &str = "ATTR_BAD_OPERANDS";
pub const FOREACH: &str = "ATTR_FOREACH";
pub const CANT_INFER: &str = "ATTR_CANT_INFER";
pub const TUPLE_ITEM: &str = "ATTR_TUPLE_ITEM";

pub fn visit_method<P: CompilerPatchPoint + ?Sized>(patch: &mut P, cx: &mut AttrContext<'_>) {
    let method = cx.method();
    tracing::trace!(target: "loom.attr", method = %method.name, "attributing method");
    if method.return_type.is_auto() {
        cx.report(Diagnostic::error(
            CANT_RESOLVE,
            "cannot find symbol: class auto",
            Some(method.span),
        ));
        cx.set_return_type(Type::Error);
        cx.set_expected_return(None);
    }
    attrib_body(patch, cx);
}

/// Declares the parameters and attributes the method body.
pub fn attrib_body<P: CompilerPatchPoint + ?Sized>(patch: &mut P, cx: &mut AttrContext<'_>) {
    let method = cx.method();
    let mark = cx.scope_mark();
    for param in &method.params {
        let declared = method.body.local(*param).declared.clone();
        cx.set_local_type(*param, declared);
        cx.declare(*param);
    }
    attrib_stmt(patch, cx, method.body.root());
    cx.restore_scope(mark);
}

pub fn attrib_stmt<P: CompilerPatchPoint + ?Sized>(patch: &mut P, cx: &mut AttrContext<'_>, stmt: StmtId) {
    let body = cx.body();
    match body.stmt(stmt) {
        Stmt::Block { statements, .. } => {
            let mark = cx.scope_mark();
            for statement in statements {
                attrib_stmt(patch, cx, *statement);
            }
            cx.restore_scope(mark);
        }
        Stmt::VarDef { local, init, .. } => patch.visit_var_def(cx, stmt, *local, *init),
        Stmt::Expr { expr, .. } => {
            attrib_expr(patch, cx, *expr);
        }
        Stmt::Return { expr, .. } => patch.visit_return(cx, stmt, *expr),
        Stmt::Foreach {
            var,
            iterable,
            body: loop_body,
            ..
        } => patch.visit_foreach(cx, stmt, *var, *iterable, *loop_body),
    }
}

/// Attributes `expr` and records its type. A qualifier override replaces attribution entirely.
pub fn attrib_expr<P: CompilerPatchPoint + ?Sized>(patch: &mut P, cx: &mut AttrContext<'_>, expr: ExprId) -> Type {
    if let Some(ty) = cx.qualifier_override(expr).cloned() {
        cx.record_expr(expr, ty.clone());
        return ty;
    }
    let body = cx.body();
    let ty = match body.expr(expr) {
        Expr::Literal { kind, value, .. } => literal_type(cx, *kind, value),
        Expr::Ident { name, .. } => patch.visit_ident(cx, expr, name),
        Expr::Select { receiver, name, .. } => patch.visit_select(cx, expr, *receiver, name),
        Expr::Apply {
            receiver,
            name,
            args,
            ..
        } => patch.visit_apply(cx, expr, *receiver, name, args),
        Expr::Binary { op, lhs, rhs, .. } => patch.visit_binary(cx, expr, *op, *lhs, *rhs),
        Expr::Unary { op, expr: operand, .. } => patch.visit_unary(cx, expr, *op, *operand),
        Expr::Label { name, span } => {
            cx.report(Diagnostic::error(
                CANT_RESOLVE,
                format!("cannot find symbol: {name}"),
                Some(*span),
            ));
            Type::Error
        }
        Expr::Jailbreak { expr: inner, .. } => attrib_expr(patch, cx, *inner),
    };
    cx.record_expr(expr, ty.clone());
    ty
}

pub fn literal_type(cx: &AttrContext<'_>, kind: LiteralKind, value: &str) -> Type {
    let primitive = |p| Type::constant(Type::Primitive(p), value);
    match kind {
        LiteralKind::Int => primitive(PrimitiveType::Int),
        LiteralKind::Long => Type::constant(
            Type::Primitive(PrimitiveType::Long),
            value.trim_end_matches(&['l', 'L'][..]),
        ),
        LiteralKind::Double => primitive(PrimitiveType::Double),
        LiteralKind::Boolean => primitive(PrimitiveType::Boolean),
        LiteralKind::Char => primitive(PrimitiveType::Char),
        LiteralKind::String => Type::constant(cx.store().string_type(), value),
        LiteralKind::Null => Type::Null,
    }
}

/// Locals, then fields of the enclosing class, then class names.
pub fn visit_ident<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    expr: ExprId,
    name: &str,
) -> Type {
    if let Some(local) = cx.lookup_local(name) {
        return cx.local_type(local);
    }
    let store = cx.store();
    let owner = cx.method().owner;
    let this = Type::class(owner, Vec::new());
    let fields = store.find_member(owner, name, MemberKind::Field);
    if let Some((declaring, field)) = fields.iter().find(|(c, m)| patch.is_accessible(cx, *c, m)) {
        return store.member_type(&this, *declaring, &field.ty);
    }
    if let Some(class) = store.lookup(name) {
        return Type::class(class, Vec::new());
    }
    let span = cx.body().expr(expr).span();
    cx.report(Diagnostic::error(
        CANT_RESOLVE,
        format!("cannot find symbol: {name}"),
        Some(span),
    ));
    Type::Error
}

pub fn visit_select<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    expr: ExprId,
    receiver: ExprId,
    name: &str,
) -> Type {
    let site = attrib_expr(patch, cx, receiver);
    if site.is_error() {
        return Type::Error;
    }
    let span = cx.body().expr(expr).span();
    select_member(patch, cx, &site, name, span)
}

/// Field `name` of `site`; arrays have `length`.
pub fn select_member<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    site: &Type,
    name: &str,
    span: Span,
) -> Type {
    let store = cx.store();
    if let Type::Array(_) = site.base_type() {
        if name == "length" {
            return Type::Primitive(PrimitiveType::Int);
        }
    }
    let candidates = class_parts(site)
        .into_iter()
        .flat_map(|id| store.find_member(id, name, MemberKind::Field))
        .collect::<Vec<_>>();
    if let Some((owner, field)) = candidates.iter().find(|(c, m)| patch.is_accessible(cx, *c, m)) {
        return store.member_type(site, *owner, &field.ty);
    }
    match candidates.first() {
        Some((owner, _)) => report_access(cx, name, *owner, span),
        None => cx.report(Diagnostic::error(
            CANT_RESOLVE,
            format!("cannot find symbol: {name} in {}", store.display(site)),
            Some(span),
        )),
    }
    Type::Error
}

pub fn visit_apply<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    expr: ExprId,
    receiver: Option<ExprId>,
    name: &str,
    args: &[ExprId],
) -> Type {
    let site = match receiver {
        Some(receiver) => attrib_expr(patch, cx, receiver),
        None => Type::class(cx.method().owner, Vec::new()),
    };
    let arg_types: Vec<Type> = args.iter().map(|arg| attrib_expr(patch, cx, *arg)).collect();
    if site.is_error() || arg_types.iter().any(Type::is_error) {
        return Type::Error;
    }
    let span = cx.body().expr(expr).span();
    resolve_method(patch, cx, &site, name, &arg_types, span)
}

/// Picks the first accessible method of `site` named `name` whose parameters accept `args`.
pub fn resolve_method<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    site: &Type,
    name: &str,
    args: &[Type],
    span: Span,
) -> Type {
    let store = cx.store();
    let applicable: Vec<(ClassId, &Member)> = class_parts(site)
        .into_iter()
        .flat_map(|id| store.find_member(id, name, MemberKind::Method))
        .filter(|(owner, method)| {
            method.params.len() == args.len()
                && method.params.iter().zip(args).all(|(param, arg)| {
                    let param = store.member_type(site, *owner, param);
                    store.is_assignable(arg, &param)
                })
        })
        .collect();
    if let Some((owner, method)) = applicable.iter().find(|(c, m)| patch.is_accessible(cx, *c, m)) {
        return store.member_type(site, *owner, &method.ty);
    }
    match applicable.first() {
        Some((owner, _)) => report_access(cx, &format!("{name}()"), *owner, span),
        None => {
            let args: Vec<String> = args.iter().map(|a| store.display(a)).collect();
            cx.report(Diagnostic::error(
                CANT_RESOLVE,
                format!("cannot find symbol: method {name}({}) in {}", args.join(","), store.display(site)),
                Some(span),
            ));
        }
    }
    Type::Error
}

fn report_access(cx: &mut AttrContext<'_>, name: &str, owner: ClassId, span: Span) {
    let owner = cx.store().class(owner).simple_name().to_string();
    cx.report(Diagnostic::error(
        ACCESS,
        format!("{name} has private access in {owner}"),
        Some(span),
    ));
}

fn class_parts(site: &Type) -> Vec<ClassId> {
    match site.base_type() {
        Type::Class { id, .. } => vec![id],
        Type::Intersection(parts) => parts.iter().filter_map(Type::class_id).collect(),
        _ => Vec::new(),
    }
}

pub fn visit_binary<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    expr: ExprId,
    op: BinaryOp,
    lhs: ExprId,
    rhs: ExprId,
) -> Type {
    let left = attrib_expr(patch, cx, lhs);
    let right = attrib_expr(patch, cx, rhs);
    let span = cx.body().expr(expr).span();
    binary_type(cx, op, &left, &right, span)
}

/// The built-in operator table, with constant folding.
pub fn binary_type(cx: &mut AttrContext<'_>, op: BinaryOp, left: &Type, right: &Type, span: Span) -> Type {
    if left.is_error() || right.is_error() {
        return Type::Error;
    }
    let store = cx.store();
    if op == BinaryOp::Add && (store.is_string(left) || store.is_string(right)) {
        return match (left.constant_value(), right.constant_value()) {
            (Some(a), Some(b)) => Type::constant(store.string_type(), format!("{a}{b}")),
            _ => store.string_type(),
        };
    }

    let operand = |ty: &Type| ty.as_primitive().or_else(|| store.unboxed(ty));
    let (l, r) = (operand(left), operand(right));
    let result = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            match (l, r) {
                (Some(l), Some(r)) => PrimitiveType::promote(l, r).map(|promoted| {
                    match fold_arithmetic(op, promoted, left, right) {
                        Some(value) => Type::constant(Type::Primitive(promoted), value),
                        None => Type::Primitive(promoted),
                    }
                }),
                _ => None,
            }
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => match (l, r) {
            (Some(l), Some(r)) if PrimitiveType::promote(l, r).is_some() => {
                Some(Type::Primitive(PrimitiveType::Boolean))
            }
            _ => None,
        },
        BinaryOp::Eq | BinaryOp::Ne => {
            let comparable = match (left.as_primitive(), right.as_primitive()) {
                (Some(_), _) | (_, Some(_)) => match (l, r) {
                    (Some(PrimitiveType::Boolean), Some(PrimitiveType::Boolean)) => true,
                    (Some(l), Some(r)) => PrimitiveType::promote(l, r).is_some(),
                    _ => false,
                },
                _ => store.is_subtype(left, right) || store.is_subtype(right, left),
            };
            comparable.then_some(Type::Primitive(PrimitiveType::Boolean))
        }
        BinaryOp::And | BinaryOp::Or => match (l, r) {
            (Some(PrimitiveType::Boolean), Some(PrimitiveType::Boolean)) => {
                Some(Type::Primitive(PrimitiveType::Boolean))
            }
            _ => None,
        },
    };
    match result {
        Some(ty) => ty,
        None => {
            cx.report(Diagnostic::error(
                BAD_OPERANDS,
                format!(
                    "bad operand types for binary operator '{}': {} and {}",
                    op.symbol(),
                    store.display(left),
                    store.display(right)
                ),
                Some(span),
            ));
            Type::Error
        }
    }
}

fn fold_arithmetic(op: BinaryOp, promoted: PrimitiveType, left: &Type, right: &Type) -> Option<String> {
    let a: i64 = left.constant_value()?.parse().ok()?;
    let b: i64 = right.constant_value()?.parse().ok()?;
    match promoted {
        PrimitiveType::Int => {
            let (a, b) = (i32::try_from(a).ok()?, i32::try_from(b).ok()?);
            let value = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.checked_div(b)?,
                BinaryOp::Rem => a.checked_rem(b)?,
                _ => return None,
            };
            Some(value.to_string())
        }
        PrimitiveType::Long => {
            let value = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.checked_div(b)?,
                BinaryOp::Rem => a.checked_rem(b)?,
                _ => return None,
            };
            Some(value.to_string())
        }
        _ => None,
    }
}

pub fn visit_unary<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    expr: ExprId,
    op: UnaryOp,
    operand: ExprId,
) -> Type {
    let ty = attrib_expr(patch, cx, operand);
    let span = cx.body().expr(expr).span();
    unary_type(cx, op, &ty, span)
}

pub fn unary_type(cx: &mut AttrContext<'_>, op: UnaryOp, ty: &Type, span: Span) -> Type {
    if ty.is_error() {
        return Type::Error;
    }
    let store = cx.store();
    let primitive = ty.as_primitive().or_else(|| store.unboxed(ty));
    let result = match (op, primitive) {
        (UnaryOp::Neg, Some(p)) if p.is_numeric() => {
            let promoted = PrimitiveType::promote(p, PrimitiveType::Int).unwrap_or(p);
            let folded = ty
                .constant_value()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|_| matches!(promoted, PrimitiveType::Int | PrimitiveType::Long))
                .map(|v| v.wrapping_neg().to_string());
            Some(match folded {
                Some(value) => Type::constant(Type::Primitive(promoted), value),
                None => Type::Primitive(promoted),
            })
        }
        (UnaryOp::Not, Some(PrimitiveType::Boolean)) => Some(match ty.constant_value() {
            Some("true") => Type::constant(Type::Primitive(PrimitiveType::Boolean), "false"),
            Some("false") => Type::constant(Type::Primitive(PrimitiveType::Boolean), "true"),
            _ => Type::Primitive(PrimitiveType::Boolean),
        }),
        _ => None,
    };
    match result {
        Some(ty) => ty,
        None => {
            cx.report(Diagnostic::error(
                BAD_OPERANDS,
                format!(
                    "bad operand type {} for unary operator '{}'",
                    store.display(ty),
                    op.symbol()
                ),
                Some(span),
            ));
            Type::Error
        }
    }
}

pub fn visit_var_def<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    stmt: StmtId,
    local: LocalId,
    init: Option<ExprId>,
) {
    let body = cx.body();
    let declared = body.local(local).declared.clone();
    let span = body.stmt(stmt).span();
    let ty = if declared.is_auto() {
        report_auto(cx, span);
        Type::Error
    } else {
        declared
    };
    if let Some(init) = init {
        let init_ty = attrib_expr(patch, cx, init);
        check_assignable(cx, &init_ty, &ty, span);
    }
    declare_local(cx, local, ty);
}

fn report_auto(cx: &mut AttrContext<'_>, span: Span) {
    cx.report(Diagnostic::error(
        CANT_RESOLVE,
        "cannot find symbol: class auto",
        Some(span),
    ));
}

/// Assigns `ty` to `local` and brings it into scope.
pub fn declare_local(cx: &mut AttrContext<'_>, local: LocalId, ty: Type) {
    cx.set_local_type(local, ty);
    cx.declare(local);
}

/// Reports an incompatible-types error unless `from` converts to `to` by assignment.
pub fn check_assignable(cx: &mut AttrContext<'_>, from: &Type, to: &Type, span: Span) -> bool {
    let store = cx.store();
    if store.is_assignable(from, to) || narrows_constant(from, to) {
        return true;
    }
    cx.report(Diagnostic::error(
        INCOMPATIBLE,
        format!(
            "incompatible types: {} cannot be converted to {}",
            store.display(from),
            store.display(to)
        ),
        Some(span),
    ));
    false
}

fn narrows_constant(from: &Type, to: &Type) -> bool {
    let Some(value) = from.constant_value().and_then(|v| v.parse::<i64>().ok()) else {
        return false;
    };
    if from.as_primitive() != Some(PrimitiveType::Int) {
        return false;
    }
    match to.as_primitive() {
        Some(PrimitiveType::Byte) => i8::try_from(value).is_ok(),
        Some(PrimitiveType::Short) => i16::try_from(value).is_ok(),
        Some(PrimitiveType::Char) => u16::try_from(value).is_ok(),
        _ => false,
    }
}

pub fn visit_return<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    stmt: StmtId,
    expr: Option<ExprId>,
) {
    let span = cx.body().stmt(stmt).span();
    let ty = expr.map(|expr| attrib_expr(patch, cx, expr));
    let Some(expected) = cx.expected_return().cloned() else {
        return;
    };
    match (ty, &expected) {
        (Some(_), Type::Void) => cx.report(Diagnostic::error(
            INCOMPATIBLE,
            "incompatible types: unexpected return value",
            Some(span),
        )),
        (Some(ty), _) => {
            check_assignable(cx, &ty, &expected, span);
        }
        (None, Type::Void) => {}
        (None, _) => cx.report(Diagnostic::error(INCOMPATIBLE, "missing return value", Some(span))),
    }
}

pub fn visit_foreach<P: CompilerPatchPoint + ?Sized>(
    patch: &mut P,
    cx: &mut AttrContext<'_>,
    stmt: StmtId,
    var: StmtId,
    iterable: ExprId,
    loop_body: StmtId,
) {
    let iterable_ty = attrib_expr(patch, cx, iterable);
    let span = cx.body().stmt(stmt).span();
    let element = element_type(cx, &iterable_ty, span);
    let mark = cx.scope_mark();
    if let Some(local) = cx.body().local_of(var) {
        let declared = cx.body().local(local).declared.clone();
        let ty = if declared.is_auto() {
            report_auto(cx, span);
            Type::Error
        } else {
            if let Some(element) = &element {
                check_assignable(cx, element, &declared, span);
            }
            declared
        };
        declare_local(cx, local, ty);
    }
    attrib_stmt(patch, cx, loop_body);
    cx.restore_scope(mark);
}

/// Element type of an array or `Iterable`; reports and returns `None` for anything else.
pub fn element_type(cx: &mut AttrContext<'_>, iterable: &Type, span: Span) -> Option<Type> {
    let store = cx.store();
    match iterable.base_type() {
        Type::Error => return None,
        Type::Array(element) => return Some(*element),
        _ => {}
    }
    match store.as_super(iterable, store.well_known().iterable) {
        Some(Type::Class { args, .. }) => Some(args.into_iter().next().unwrap_or_else(|| store.object_type())),
        _ => {
            cx.report(Diagnostic::error(
                FOREACH,
                format!(
                    "foreach not applicable to expression type: {}",
                    store.display(iterable)
                ),
                Some(span),
            ));
            None
        }
    }
}

/// Private members are accessible only from their declaring class.
pub fn is_accessible(cx: &AttrContext<'_>, owner: ClassId, member: &Member) -> bool {
    member.access != Access::Private || owner == cx.method().owner
}
