//! Attribution patch: placeholder (`auto`) inference, tuple literals, operator overloading and
//! `@Jailbreak` access layered over a host compiler's semantic analysis.
//!
//! The host compiler is modelled by a [`TypeStore`] and an arena-allocated method [`Body`].
//! Every construct the patch intercepts is a method of [`CompilerPatchPoint`] whose default
//! delegates to the host's behavior in [`host`]; [`StandardAttr`] is the unpatched host and
//! [`ManAttr`] the patched one.

mod ast;
mod context;
pub mod host;
mod man_attr;
mod patch;
mod types;

pub use ast::{BinaryOp, Body, Expr, ExprId, LiteralKind, Local, LocalId, MethodDecl, Stmt, StmtId, UnaryOp};
pub use context::{AttrContext, Attribution};
pub use man_attr::{
    field_name_from_method_name, ManAttr, MethodOperators, NoOperatorOverloading, OperatorPolicy,
    TUPLE_METHOD,
};
pub use patch::{attribute, CompilerPatchPoint, StandardAttr};
pub use types::{
    Access, ClassDef, ClassId, ClassKind, Member, MemberKind, PrimitiveType, TupleField, Type,
    TypeStore, WellKnown,
};
