use std::collections::HashMap;

use loom_core::Diagnostic;

use crate::ast::{BinaryOp, Expr, ExprId, LocalId, StmtId, UnaryOp};
use crate::context::AttrContext;
use crate::host;
use crate::patch::CompilerPatchPoint;
use crate::types::{Access, ClassId, Member, MemberKind, PrimitiveType, TupleField, Type, TypeStore};

/// Name of the synthetic method a tuple literal `(a, name: b)` is parsed into.
pub const TUPLE_METHOD: &str = "$loom_tuple";

/// Decides whether an operator expression is an overloaded operator call.
pub trait OperatorPolicy {
    /// The result type when the policy claims `left op right`.
    fn binary(&self, store: &TypeStore, op: BinaryOp, left: &Type, right: &Type) -> Option<Type>;

    fn unary(&self, store: &TypeStore, op: UnaryOp, operand: &Type) -> Option<Type>;
}

/// Claims nothing; every operator goes to the built-in table.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOperatorOverloading;

impl OperatorPolicy for NoOperatorOverloading {
    fn binary(&self, _: &TypeStore, _: BinaryOp, _: &Type, _: &Type) -> Option<Type> {
        None
    }

    fn unary(&self, _: &TypeStore, _: UnaryOp, _: &Type) -> Option<Type> {
        None
    }
}

/// Operators implemented by conventionally named methods on the left operand's class:
/// `plus`, `minus`, `times`, `div`, `rem`, `compareTo` for relational operators, and
/// `unaryMinus` / `not`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodOperators;

impl MethodOperators {
    fn overloadable(store: &TypeStore, ty: &Type) -> Option<ClassId> {
        let id = ty.class_id()?;
        if store.is_string(ty) || store.unboxed(ty).is_some() {
            return None;
        }
        Some(id)
    }

    fn find(store: &TypeStore, site: &Type, name: &str, args: &[&Type]) -> Option<Type> {
        let id = Self::overloadable(store, site)?;
        store
            .find_member(id, name, MemberKind::Method)
            .into_iter()
            .find(|(owner, method)| {
                method.access == Access::Public
                    && method.params.len() == args.len()
                    && method.params.iter().zip(args).all(|(param, arg)| {
                        store.is_assignable(arg, &store.member_type(site, *owner, param))
                    })
            })
            .map(|(owner, method)| store.member_type(site, owner, &method.ty))
    }
}

impl OperatorPolicy for MethodOperators {
    fn binary(&self, store: &TypeStore, op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
        let name = match op {
            BinaryOp::Add => "plus",
            BinaryOp::Sub => "minus",
            BinaryOp::Mul => "times",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => "compareTo",
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::And | BinaryOp::Or => return None,
        };
        let ty = Self::find(store, left, name, &[right])?;
        if op.is_comparison() {
            return (ty.as_primitive() == Some(PrimitiveType::Int))
                .then_some(Type::Primitive(PrimitiveType::Boolean));
        }
        Some(ty)
    }

    fn unary(&self, store: &TypeStore, op: UnaryOp, operand: &Type) -> Option<Type> {
        let name = match op {
            UnaryOp::Neg => "unaryMinus",
            UnaryOp::Not => "not",
        };
        Self::find(store, operand, name, &[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    expr: ExprId,
    receiver: ExprId,
}

/// The patched attribution: `auto` inference, tuple literals, operator overloading and
/// `@Jailbreak` access to private members of supertypes.
///
/// One instance is meant to attribute every method of a compilation; return types inferred for
/// `auto` methods are remembered and substituted at later call sites.
pub struct ManAttr<P: OperatorPolicy = MethodOperators> {
    policy: P,
    selects: Vec<Selection>,
    methods: Vec<String>,
    inferred_returns: HashMap<(ClassId, String), Type>,
}

impl Default for ManAttr<MethodOperators> {
    fn default() -> Self {
        Self::new(MethodOperators)
    }
}

impl<P: OperatorPolicy> ManAttr<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            selects: Vec::new(),
            methods: Vec::new(),
            inferred_returns: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Return type inferred for the `auto` method `name` of `owner`.
    pub fn inferred_return(&self, owner: ClassId, name: &str) -> Option<&Type> {
        self.inferred_returns.get(&(owner, name.to_string()))
    }

    fn pop_select(&mut self, expr: ExprId) {
        match self.selects.pop() {
            Some(top) if top.expr == expr => {}
            other => {
                tracing::error!(target: "loom.attr", ?expr, ?other, "selection stack not balanced");
                panic!("selection stack not balanced: expected {expr:?}, found {other:?}");
            }
        }
    }

    /// Runs `attempt` inside a selection on `receiver`. When it fails on a `@Jailbreak` receiver,
    /// its diagnostics are dropped and it runs once more with the receiver typed as its
    /// superclass, so private members declared there resolve.
    fn select_with_retry<F>(
        &mut self,
        cx: &mut AttrContext<'_>,
        expr: ExprId,
        receiver: ExprId,
        attempt: F,
    ) -> Type
    where
        F: Fn(&mut Self, &mut AttrContext<'_>) -> Type,
    {
        self.selects.push(Selection { expr, receiver });
        let mark = cx.diagnostics_len();
        let mut ty = attempt(self, cx);
        if ty.is_error() && cx.body().is_jailbreak(receiver) {
            let original = cx.expr_type(receiver).cloned();
            let store = cx.store();
            let superclass = original
                .as_ref()
                .and_then(|t| store.superclass_of(t))
                .filter(|sup| sup.class_id() != Some(store.well_known().object));
            if let (Some(original), Some(superclass)) = (original, superclass) {
                tracing::debug!(
                    target: "loom.attr",
                    receiver = %store.display(&original),
                    superclass = %store.display(&superclass),
                    "retrying jailbreak selection against superclass"
                );
                cx.truncate_diagnostics(mark);
                cx.override_qualifier(receiver, superclass);
                ty = attempt(self, cx);
                cx.clear_qualifier(receiver);
                cx.record_expr(receiver, original);
            }
        }
        self.pop_select(expr);
        ty
    }

    /// Substitutes the inferred return type when the resolved method was declared `auto`.
    fn patch_method_type(&self, cx: &mut AttrContext<'_>, expr: ExprId, site: &Type, name: &str, ty: Type) -> Type {
        if !ty.is_auto() {
            return ty;
        }
        let store = cx.store();
        let owner = site.class_id().and_then(|id| {
            store
                .find_member(id, name, MemberKind::Method)
                .first()
                .map(|(owner, _)| *owner)
        });
        if let Some(inferred) = owner.and_then(|owner| self.inferred_return(owner, name)) {
            return inferred.clone();
        }
        let span = cx.body().expr(expr).span();
        cx.report(Diagnostic::error(
            host::CANT_INFER,
            format!("cannot infer return type of {name} before its body is attributed"),
            Some(span),
        ));
        Type::Error
    }

    fn tuple_type(&mut self, cx: &mut AttrContext<'_>, args: &[ExprId]) -> Type {
        let body = cx.body();
        let mut fields: Vec<TupleField> = Vec::new();
        let mut unnamed = 0;
        let mut i = 0;
        while i < args.len() {
            let mut arg = args[i];
            let mut name = None;
            if let Expr::Label { name: label, span } = body.expr(arg) {
                name = Some(label.clone());
                i += 1;
                match args.get(i) {
                    Some(next) => arg = *next,
                    None => {
                        cx.report(Diagnostic::error(
                            host::TUPLE_ITEM,
                            format!("missing value for tuple item {label}"),
                            Some(*span),
                        ));
                        break;
                    }
                }
            }
            let name = name.or_else(|| match body.expr(arg) {
                Expr::Ident { name, .. } | Expr::Select { name, .. } => Some(name.clone()),
                Expr::Apply { name, .. } => Some(field_name_from_method_name(name)),
                _ => None,
            });
            let base = match name {
                Some(name) => name,
                None => {
                    unnamed += 1;
                    format!("item{unnamed}")
                }
            };
            let mut item = base.clone();
            let mut suffix = 2;
            while fields.iter().any(|f| f.name == item) {
                item = format!("{base}_{suffix}");
                suffix += 1;
            }
            let ty = match host::attrib_expr(self, cx, arg).base_type() {
                Type::Null => cx.store().object_type(),
                ty => ty,
            };
            fields.push(TupleField { name: item, ty });
            i += 1;
        }
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        Type::Tuple(fields)
    }

    /// Picks one type for an inferred return type. Intersections become their class component,
    /// or, when that is `Object`, the interface with the most members.
    fn collapse(store: &TypeStore, ty: &Type) -> Type {
        match ty {
            Type::Auto => Type::Void,
            Type::Null => store.object_type(),
            Type::Intersection(parts) => {
                let superclass = parts
                    .iter()
                    .find(|p| !store.is_interface(p))
                    .cloned()
                    .unwrap_or_else(|| store.object_type());
                if superclass.class_id() != Some(store.well_known().object) {
                    return superclass;
                }
                let mut best: Option<(&Type, usize)> = None;
                for part in parts.iter().filter(|p| store.is_interface(p)) {
                    let count = part.class_id().map_or(0, |id| store.member_count(id));
                    if best.map_or(true, |(_, max)| count > max) {
                        best = Some((part, count));
                    }
                }
                best.map_or(superclass, |(ty, _)| ty.clone())
            }
            other => other.clone(),
        }
    }
}

impl<P: OperatorPolicy> CompilerPatchPoint for ManAttr<P> {
    fn visit_method(&mut self, cx: &mut AttrContext<'_>) {
        let method = cx.method();
        let infer = method.return_type.is_auto();
        self.methods.push(method.name.clone());
        let depth = self.methods.len();
        if infer {
            cx.set_expected_return(None);
        }
        host::attrib_body(self, cx);
        if self.methods.len() != depth {
            tracing::error!(target: "loom.attr", method = %method.name, "method stack not balanced");
            panic!("method stack not balanced while attributing {}", method.name);
        }
        self.methods.pop();
        if infer {
            let inferred = Self::collapse(cx.store(), cx.return_type());
            tracing::debug!(
                target: "loom.attr",
                method = %method.name,
                ty = %cx.store().display(&inferred),
                "inferred auto return type"
            );
            cx.set_return_type(inferred.clone());
            self.inferred_returns
                .insert((method.owner, method.name.clone()), inferred);
        }
    }

    fn visit_select(&mut self, cx: &mut AttrContext<'_>, expr: ExprId, receiver: ExprId, name: &str) -> Type {
        self.select_with_retry(cx, expr, receiver, |this, cx| {
            host::visit_select(this, cx, expr, receiver, name)
        })
    }

    fn visit_apply(
        &mut self,
        cx: &mut AttrContext<'_>,
        expr: ExprId,
        receiver: Option<ExprId>,
        name: &str,
        args: &[ExprId],
    ) -> Type {
        let Some(receiver) = receiver else {
            if name == TUPLE_METHOD {
                return self.tuple_type(cx, args);
            }
            let ty = host::visit_apply(self, cx, expr, None, name, args);
            let site = Type::class(cx.method().owner, Vec::new());
            return self.patch_method_type(cx, expr, &site, name, ty);
        };
        let ty = self.select_with_retry(cx, expr, receiver, |this, cx| {
            host::visit_apply(this, cx, expr, Some(receiver), name, args)
        });
        let site = cx.expr_type(receiver).cloned().unwrap_or(Type::Error);
        self.patch_method_type(cx, expr, &site, name, ty)
    }

    fn visit_binary(&mut self, cx: &mut AttrContext<'_>, expr: ExprId, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> Type {
        let left = host::attrib_expr(self, cx, lhs);
        let right = host::attrib_expr(self, cx, rhs);
        if let Some(ty) = self.policy.binary(cx.store(), op, &left, &right) {
            return ty;
        }
        let span = cx.body().expr(expr).span();
        host::binary_type(cx, op, &left, &right, span)
    }

    fn visit_unary(&mut self, cx: &mut AttrContext<'_>, expr: ExprId, op: UnaryOp, operand: ExprId) -> Type {
        let ty = host::attrib_expr(self, cx, operand);
        if let Some(result) = self.policy.unary(cx.store(), op, &ty) {
            return result;
        }
        let span = cx.body().expr(expr).span();
        host::unary_type(cx, op, &ty, span)
    }

    fn visit_var_def(&mut self, cx: &mut AttrContext<'_>, stmt: StmtId, local: LocalId, init: Option<ExprId>) {
        let body = cx.body();
        let declared = &body.local(local).declared;
        if !declared.is_auto() {
            return host::visit_var_def(self, cx, stmt, local, init);
        }
        let span = body.stmt(stmt).span();
        let ty = match init {
            None if body.is_foreach_variable(stmt) => Type::Auto,
            None => {
                cx.report(Diagnostic::error(
                    host::CANT_INFER,
                    "cannot infer type without initializer",
                    Some(span),
                ));
                Type::Error
            }
            Some(init) => match host::attrib_expr(self, cx, init) {
                Type::Null => {
                    cx.report(Diagnostic::error(
                        host::CANT_INFER,
                        "cannot infer type from null",
                        Some(span),
                    ));
                    Type::Error
                }
                Type::Void => {
                    cx.report(Diagnostic::error(
                        host::CANT_INFER,
                        "cannot infer type from void",
                        Some(span),
                    ));
                    Type::Error
                }
                ty => ty.base_type(),
            },
        };
        host::declare_local(cx, local, ty);
    }

    fn visit_return(&mut self, cx: &mut AttrContext<'_>, stmt: StmtId, expr: Option<ExprId>) {
        if !cx.method().return_type.is_auto() {
            return host::visit_return(self, cx, stmt, expr);
        }
        let Some(expr) = expr else {
            return;
        };
        let ty = host::attrib_expr(self, cx, expr).base_type();
        if ty.is_error() {
            return;
        }
        let next = match cx.return_type() {
            Type::Auto => ty,
            current => cx.store().lub(current, &ty),
        };
        cx.set_return_type(next);
    }

    fn visit_foreach(&mut self, cx: &mut AttrContext<'_>, stmt: StmtId, var: StmtId, iterable: ExprId, body: StmtId) {
        let Some(local) = cx.body().local_of(var) else {
            return host::visit_foreach(self, cx, stmt, var, iterable, body);
        };
        if !cx.body().local(local).declared.is_auto() {
            return host::visit_foreach(self, cx, stmt, var, iterable, body);
        }
        let iterable_ty = host::attrib_expr(self, cx, iterable);
        let span = cx.body().stmt(stmt).span();
        let element = host::element_type(cx, &iterable_ty, span).unwrap_or(Type::Error);
        let mark = cx.scope_mark();
        host::declare_local(cx, local, element.base_type());
        host::attrib_stmt(self, cx, body);
        cx.restore_scope(mark);
    }

    fn is_accessible(&self, cx: &AttrContext<'_>, owner: ClassId, member: &Member) -> bool {
        let jailbroken = self
            .selects
            .last()
            .is_some_and(|select| cx.body().is_jailbreak(select.receiver));
        jailbroken || host::is_accessible(cx, owner, member)
    }
}

/// Turns a getter-style method name into a field name: `getAddress` → `address`,
/// `isValid` → `valid`, `findJDKVersion` → `jdkVersion`, `id` → `id`.
pub fn field_name_from_method_name(method: &str) -> String {
    let chars: Vec<char> = method.chars().collect();
    let Some(start) = chars.iter().position(|c| c.is_uppercase()) else {
        return method.to_string();
    };
    let mut name: Vec<char> = chars[start..].to_vec();
    let len = name.len();
    for j in 0..len {
        let c = name[j];
        let lower_this = c.is_uppercase()
            && (j == 0 || j == len - 1 || name.get(j + 1).is_some_and(|next| next.is_uppercase()));
        if !lower_this {
            break;
        }
        name[j] = c.to_lowercase().next().unwrap_or(c);
    }
    name.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Body;

    #[test]
    fn getter_names_become_field_names() {
        assert_eq!(field_name_from_method_name("getAddress"), "address");
        assert_eq!(field_name_from_method_name("isValid"), "valid");
        assert_eq!(field_name_from_method_name("callHome"), "home");
        assert_eq!(field_name_from_method_name("findJDKVersion"), "jdkVersion");
        assert_eq!(field_name_from_method_name("id"), "id");
        assert_eq!(field_name_from_method_name("getURL"), "url");
    }

    #[test]
    #[should_panic(expected = "selection stack not balanced")]
    fn popping_a_foreign_selection_panics() {
        let mut body = Body::new();
        let a = body.ident("a");
        let b = body.ident("b");
        let mut attr = ManAttr::<MethodOperators>::default();
        attr.selects.push(Selection { expr: a, receiver: a });
        attr.pop_select(b);
    }

    #[test]
    #[should_panic(expected = "selection stack not balanced")]
    fn popping_an_empty_selection_stack_panics() {
        let mut body = Body::new();
        let a = body.ident("a");
        ManAttr::new(NoOperatorOverloading).pop_select(a);
    }

    #[test]
    fn collapse_prefers_a_real_superclass() {
        let mut store = TypeStore::new();
        let named = store.add_class(
            crate::types::ClassDef::interface("p.Named")
                .with_member(Member::method("name", Vec::new(), store.string_type())),
        );
        let number = store.lookup("java.lang.Number").unwrap();
        let both = Type::Intersection(vec![
            Type::class(number, Vec::new()),
            Type::class(named, Vec::new()),
        ]);
        assert_eq!(ManAttr::<MethodOperators>::collapse(&store, &both), Type::class(number, Vec::new()));
        let only_interfaces = Type::Intersection(vec![
            store.object_type(),
            Type::class(named, Vec::new()),
        ]);
        assert_eq!(
            ManAttr::<MethodOperators>::collapse(&store, &only_interfaces),
            Type::class(named, Vec::new())
        );
        assert_eq!(ManAttr::<MethodOperators>::collapse(&store, &Type::Auto), Type::Void);
    }
}
