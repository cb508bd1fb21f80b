//! Syntax tree node shapes for the yal language.
//!
//! The lexer and parser live upstream; this crate defines the tree they
//! deliver to the annotator: one `SourceModule` per file with an ordered
//! statement list and any parse diagnostics. Every node carries a byte
//! `Span` into the module source.

pub mod build;

pub use build::TreeBuilder;

use yal_common::{Atom, Diagnostic, Span};

/// One parsed module, as delivered by the host environment.
#[derive(Debug, Clone)]
pub struct SourceModule {
    pub uri: String,
    /// Document version, used as the annotation cache key component.
    pub version: i32,
    pub statements: Vec<Stmt>,
    pub parse_diagnostics: Vec<Diagnostic>,
}

/// Identifier occurrence with its source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident {
    pub name: Atom,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Comment or bare doc string; skipped by the header scan, dropped from IR.
    Comment(String),
    Import(ImportDecl),
    FromImport(FromImportDecl),
    ExportAs(ExportAsDecl),
    VarDecl(VarDecl),
    Assign { target: Expr, value: Expr },
    Func(FuncDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    If(IfStmt),
    While { cond: Expr, body: Vec<Stmt> },
    Return(Option<Expr>),
    Expr(Expr),
}

/// `import "path" as name`
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: String,
    pub path_span: Span,
    pub alias: Ident,
}

/// `from "path" import a, b`
#[derive(Debug, Clone)]
pub struct FromImportDecl {
    pub path: String,
    pub path_span: Span,
    pub names: Vec<Ident>,
}

/// `export name as alias` — re-export of a local binding under another name.
#[derive(Debug, Clone)]
pub struct ExportAsDecl {
    pub name: Ident,
    pub alias: Ident,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub mutable: bool,
    pub name: Ident,
    pub declared_type: Option<TypeExpr>,
    pub init: Expr,
    pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub mutable: bool,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Ident,
    pub extends: Option<Ident>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FuncDecl>,
}

#[derive(Debug, Clone)]
pub struct InterfaceMethod {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: TypeExpr,
    /// Interface methods that merely re-expose another member redirect to it.
    pub alias_for: Option<Atom>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: Ident,
    pub extends: Vec<Ident>,
    pub methods: Vec<InterfaceMethod>,
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: Ident,
    /// Member value; must be a string or number literal.
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Ident,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    ListLit(Vec<Expr>),
    Ident(Atom),
    Member {
        owner: Box<Expr>,
        name: Ident,
    },
    Index {
        owner: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Operators are sugar for the user-overridable `__op_*__` methods.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Short-circuiting `and`/`or`; not a method call.
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    FunctionLit(Box<FuncLit>),
}

#[derive(Debug, Clone)]
pub struct FuncLit {
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// The `__op_*__` method the operator desugars to.
    pub const fn method_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "__op_add__",
            BinaryOp::Sub => "__op_sub__",
            BinaryOp::Mul => "__op_mul__",
            BinaryOp::Div => "__op_div__",
            BinaryOp::Mod => "__op_mod__",
            BinaryOp::Eq => "__op_eq__",
            BinaryOp::Ne => "__op_ne__",
            BinaryOp::Lt => "__op_lt__",
            BinaryOp::Le => "__op_le__",
            BinaryOp::Gt => "__op_gt__",
            BinaryOp::Ge => "__op_ge__",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub const fn method_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "__op_neg__",
            UnaryOp::Not => "__op_not__",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Name(Atom),
    List(Box<TypeExpr>),
    Nullable(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
}
