use loom_core::Span;
use std::fmt;

use crate::types::{ClassId, Type};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl StmtId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u32);

impl LocalId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Long,
    Double,
    Boolean,
    Char,
    String,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal {
        kind: LiteralKind,
        value: String,
        span: Span,
    },
    Ident {
        name: String,
        span: Span,
    },
    Select {
        receiver: ExprId,
        name: String,
        span: Span,
    },
    /// A method call; an unqualified call has no receiver.
    Apply {
        receiver: Option<ExprId>,
        name: String,
        args: Vec<ExprId>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
        span: Span,
    },
    /// `name:` in front of a tuple element; it names the argument that follows it.
    Label {
        name: String,
        span: Span,
    },
    /// An expression whose type was declared `@Jailbreak`.
    Jailbreak {
        expr: ExprId,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Select { span, .. }
            | Expr::Apply { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Label { span, .. }
            | Expr::Jailbreak { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Block {
        statements: Vec<StmtId>,
        span: Span,
    },
    VarDef {
        local: LocalId,
        init: Option<ExprId>,
        span: Span,
    },
    Expr {
        expr: ExprId,
        span: Span,
    },
    Return {
        expr: Option<ExprId>,
        span: Span,
    },
    /// `for (var : iterable) body`; `var` is a `VarDef` without initializer.
    Foreach {
        var: StmtId,
        iterable: ExprId,
        body: StmtId,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block { span, .. }
            | Stmt::VarDef { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Foreach { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    /// The written type; [`Type::Auto`] for `auto`/`var` declarations.
    pub declared: Type,
    pub span: Span,
}

/// A method body, arena-allocated. Spans are synthesized by the builders unless given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    root: StmtId,
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    locals: Vec<Local>,
    next_offset: usize,
}

impl Default for Body {
    fn default() -> Self {
        Self::new()
    }
}

impl Body {
    pub fn new() -> Self {
        let mut body = Body {
            root: StmtId(0),
            stmts: Vec::new(),
            exprs: Vec::new(),
            locals: Vec::new(),
            next_offset: 0,
        };
        body.root = body.alloc_stmt(Stmt::Block {
            statements: Vec::new(),
            span: Span::default(),
        });
        body
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_local(&mut self, local: Local) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(local);
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.idx()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.idx()]
    }

    pub fn local(&self, id: LocalId) -> &Local {
        &self.locals[id.idx()]
    }

    pub fn root(&self) -> StmtId {
        self.root
    }

    pub fn set_root(&mut self, root: StmtId) {
        self.root = root;
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Whether `stmt` declares the variable of an enhanced for loop.
    pub fn is_foreach_variable(&self, stmt: StmtId) -> bool {
        self.stmts
            .iter()
            .any(|s| matches!(s, Stmt::Foreach { var, .. } if *var == stmt))
    }

    pub fn is_jailbreak(&self, expr: ExprId) -> bool {
        matches!(self.expr(expr), Expr::Jailbreak { .. })
    }

    fn span(&mut self) -> Span {
        let start = self.next_offset;
        self.next_offset += 1;
        Span::new(start, start + 1)
    }

    // Builders.

    pub fn literal(&mut self, kind: LiteralKind, value: impl Into<String>) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Literal {
            kind,
            value: value.into(),
            span,
        })
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.literal(LiteralKind::Int, value.to_string())
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.literal(LiteralKind::String, value)
    }

    pub fn null(&mut self) -> ExprId {
        self.literal(LiteralKind::Null, "null")
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Ident {
            name: name.to_string(),
            span,
        })
    }

    pub fn select(&mut self, receiver: ExprId, name: &str) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Select {
            receiver,
            name: name.to_string(),
            span,
        })
    }

    pub fn call(&mut self, receiver: Option<ExprId>, name: &str, args: Vec<ExprId>) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Apply {
            receiver,
            name: name.to_string(),
            args,
            span,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Binary { op, lhs, rhs, span })
    }

    pub fn unary(&mut self, op: UnaryOp, expr: ExprId) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Unary { op, expr, span })
    }

    pub fn label(&mut self, name: &str) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Label {
            name: name.to_string(),
            span,
        })
    }

    pub fn jailbreak(&mut self, expr: ExprId) -> ExprId {
        let span = self.span();
        self.alloc_expr(Expr::Jailbreak { expr, span })
    }

    /// Declares a local, appends it to the root block and returns its statement.
    pub fn var(&mut self, name: &str, declared: Type, init: Option<ExprId>) -> StmtId {
        let stmt = self.var_def(name, declared, init);
        self.push(stmt);
        stmt
    }

    /// Declares a local without appending it anywhere.
    pub fn var_def(&mut self, name: &str, declared: Type, init: Option<ExprId>) -> StmtId {
        let span = self.span();
        let local = self.alloc_local(Local {
            name: name.to_string(),
            declared,
            span,
        });
        self.alloc_stmt(Stmt::VarDef { local, init, span })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        let span = self.span();
        self.alloc_stmt(Stmt::Expr { expr, span })
    }

    pub fn ret(&mut self, expr: Option<ExprId>) -> StmtId {
        let span = self.span();
        let stmt = self.alloc_stmt(Stmt::Return { expr, span });
        self.push(stmt);
        stmt
    }

    pub fn block(&mut self, statements: Vec<StmtId>) -> StmtId {
        let span = self.span();
        self.alloc_stmt(Stmt::Block { statements, span })
    }

    /// Appends `for (var : iterable) body` to the root block.
    pub fn foreach(&mut self, var: StmtId, iterable: ExprId, body: StmtId) -> StmtId {
        let span = self.span();
        let stmt = self.alloc_stmt(Stmt::Foreach {
            var,
            iterable,
            body,
            span,
        });
        self.push(stmt);
        stmt
    }

    /// Appends `stmt` to the root block.
    pub fn push(&mut self, stmt: StmtId) {
        if let Stmt::Block { statements, .. } = &mut self.stmts[self.root.idx()] {
            statements.push(stmt);
        }
    }

    /// Local declared by a `VarDef` statement.
    pub fn local_of(&self, stmt: StmtId) -> Option<LocalId> {
        match self.stmt(stmt) {
            Stmt::VarDef { local, .. } => Some(*local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub owner: ClassId,
    /// [`Type::Auto`] asks for the return type to be inferred.
    pub return_type: Type,
    pub params: Vec<LocalId>,
    pub body: Body,
    pub span: Span,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, owner: ClassId, return_type: Type, body: Body) -> Self {
        Self {
            name: name.into(),
            owner,
            return_type,
            params: Vec::new(),
            body,
            span: Span::default(),
        }
    }

    /// Declares a parameter in the body's local arena.
    pub fn with_param(mut self, name: &str, ty: Type) -> Self {
        let local = self.body.alloc_local(Local {
            name: name.to_string(),
            declared: ty,
            span: Span::default(),
        });
        self.params.push(local);
        self
    }
}
