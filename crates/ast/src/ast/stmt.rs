use super::{Expr, Path, VariableDefinition};
use sable_interface::Span;

/// A braced block of statements.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

impl Block {
    /// Creates a new block.
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { span, stmts }
    }
}

/// A statement, usually ending in a semicolon.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

/// A kind of statement.
#[derive(Clone, Debug)]
pub enum StmtKind {
    /// A single-variable declaration statement: `uint256 foo = 42;`.
    DeclSingle(VariableDefinition, Option<Box<Expr>>),

    /// A multi-variable declaration statement: `(bool success, bytes memory value) = ...;`.
    DeclMulti(Vec<Option<VariableDefinition>>, Box<Expr>),

    /// A blocked scope: `{ ... }`.
    Block(Block),

    /// A break statement: `break;`.
    Break,

    /// A continue statement: `continue;`.
    Continue,

    /// A do-while statement: `do { ... } while (condition);`.
    DoWhile(Block, Box<Expr>),

    /// An emit statement: `emit Foo.bar(42);`.
    Emit(Path, Vec<Expr>),

    /// An expression with a trailing semicolon.
    Expr(Box<Expr>),

    /// A for statement: `for (uint256 i; i < 42; ++i) { ... }`.
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Box<Expr>>,
        next: Option<Box<Expr>>,
        body: Box<Stmt>,
    },

    /// An `if` statement with an optional `else` block: `if (expr) { ... } else { ... }`.
    If(Box<Expr>, Box<Stmt>, Option<Box<Stmt>>),

    /// A return statement: `return 42;`.
    Return(Option<Box<Expr>>),

    /// A while statement: `while (i < 42) { ... }`.
    While(Box<Expr>, Box<Stmt>),

    /// A modifier placeholder statement: `_;`.
    Placeholder,
}
