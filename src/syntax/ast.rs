//! Syntax tree for Opal source files.
//!
//! Every node carries the byte span of the exact text it was parsed from,
//! including any parentheses around it. Spans are the contract between
//! detection and rewriting: replacement text is spliced over a node's span,
//! so trivia outside the span is preserved by construction.

use super::Span;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub uses: Vec<UseDecl>,
    pub functions: Vec<Function>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct UseDecl {
    pub module: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub ret: TypeRef,
    pub name: String,
    pub name_span: Span,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
    pub name_span: Span,
    pub span: Span,
}

/// A syntactic type reference such as `int` or `Dictionary<string, int>`.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Local(LocalStmt),
    Expr(ExprStmt),
    If(Box<IfStmt>),
    While(Box<WhileStmt>),
    Return(ReturnStmt),
    Block(Block),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Local(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Block(b) => b.span,
        }
    }
}

/// `var x = e;` or `Type x = e;` (initializer optional for the typed form).
#[derive(Debug, Clone)]
pub struct LocalStmt {
    /// `None` for `var`.
    pub ty: Option<TypeRef>,
    pub name: String,
    pub name_span: Span,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Stmt,
    pub else_branch: Option<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Stmt,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Lit(Lit),
    Ident(Ident),
    Member(Box<MemberExpr>),
    Call(Box<CallExpr>),
    Index(Box<IndexExpr>),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Assign(Box<AssignExpr>),
    Ternary(Box<TernaryExpr>),
    Lambda(Box<LambdaExpr>),
    Paren(Box<ParenExpr>),
    New(Box<NewExpr>),
    Default(DefaultExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Lit(e) => e.span,
            Expr::Ident(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Ternary(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::Paren(e) => e.span,
            Expr::New(e) => e.span,
            Expr::Default(e) => e.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lit {
    pub kind: LitKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum LitKind {
    Int(i64),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub recv: Expr,
    pub name: String,
    pub name_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Expr>,
    /// Interior of the argument list, between the parentheses. Lifting this
    /// text verbatim keeps comments and spacing inside the list intact.
    pub args_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub recv: Expr,
    pub index: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TernaryExpr {
    pub cond: Expr,
    pub when_true: Expr,
    pub when_false: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub param: String,
    pub param_span: Span,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParenExpr {
    pub inner: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NewExpr {
    pub ty: TypeRef,
    pub args: Vec<Expr>,
    pub args_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DefaultExpr {
    /// `None` for the bare `default` form.
    pub ty: Option<TypeRef>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}
