//! Lowered program representation handed to the emitter.
//!
//! The IR is the annotated module minus everything with no runtime
//! counterpart: comments are dropped, interface bodies and enum
//! declarations are erased (enum constants fold to their literal values at
//! use sites), alias-redirected method names are rewritten to their
//! targets, and constant-folded scalars are already literals. Method calls
//! carry a receiver-kind marker so the emitter can translate `__op_*__`
//! calls on primitives into native operators.

use yal_common::Atom;

/// Compile target, selected by the reserved `__target` binding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Target {
    #[default]
    Script,
    Html,
}

/// Per-module compile configuration gathered from reserved bindings.
#[derive(Clone, Debug, Default)]
pub struct CompileConfig {
    pub target: Target,
    /// Extra library roots requested by `__lib`.
    pub libs: Vec<String>,
}

/// Statically-resolved receiver classification for method calls. Primitive
/// kinds let the emitter use native operators and indexing; `General` keeps
/// the call a method call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecvKind {
    Number,
    String,
    Bool,
    Null,
    List,
    General,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrStmt {
    /// Wiring for one resolved import: the dependency's uri plus either a
    /// whole-module binding (`import "x" as m`) or picked names.
    Import {
        uri: String,
        binding: Option<Atom>,
        names: Vec<Atom>,
    },
    VarDecl {
        name: Atom,
        mutable: bool,
        init: IrExpr,
    },
    Assign {
        target: IrExpr,
        value: IrExpr,
    },
    Func(IrFunc),
    Class {
        name: Atom,
        extends: Option<Atom>,
        /// Constructor parameters, one per field, in declaration order.
        fields: Vec<Atom>,
        methods: Vec<IrFunc>,
    },
    If {
        cond: IrExpr,
        then_body: Vec<IrStmt>,
        else_body: Vec<IrStmt>,
    },
    While {
        cond: IrExpr,
        body: Vec<IrStmt>,
    },
    Return(Option<IrExpr>),
    Expr(IrExpr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrFunc {
    pub name: Atom,
    pub params: Vec<Atom>,
    pub body: Vec<IrStmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrExpr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<IrExpr>),
    Name(Atom),
    /// Field read or module export access.
    Member {
        owner: Box<IrExpr>,
        name: Atom,
    },
    /// Native list/string indexing.
    Index {
        owner: Box<IrExpr>,
        index: Box<IrExpr>,
    },
    MethodCall {
        owner: Box<IrExpr>,
        method: Atom,
        args: Vec<IrExpr>,
        recv: RecvKind,
    },
    Call {
        callee: Box<IrExpr>,
        args: Vec<IrExpr>,
    },
    /// Class instantiation, lowered from calling a class value (a bare name
    /// or a module member).
    Construct {
        callee: Box<IrExpr>,
        args: Vec<IrExpr>,
    },
    Logic {
        and: bool,
        lhs: Box<IrExpr>,
        rhs: Box<IrExpr>,
    },
    FunctionLit {
        params: Vec<Atom>,
        body: Vec<IrStmt>,
    },
    /// Built-in print.
    Print(Vec<IrExpr>),
}
