use super::{Ident, Lit, Type};
use sable_interface::Span;
use std::fmt;

/// An expression.
#[derive(Clone, Debug)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    /// Creates a new expression from an identifier.
    pub fn from_ident(ident: Ident) -> Self {
        Self { span: ident.span, kind: ExprKind::Ident(ident) }
    }

    /// Creates a new expression from a type.
    pub fn from_ty(ty: Type) -> Self {
        Self { span: ty.span, kind: ExprKind::Type(ty) }
    }

    /// Creates a new expression from a literal.
    pub fn from_lit(lit: Lit) -> Self {
        Self { span: lit.span, kind: ExprKind::Lit(lit) }
    }
}

/// A kind of expression.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// An array literal expression: `[a, b, c, d]`.
    Array(Vec<Expr>),

    /// An assignment: `a = b`, `a += b`.
    Assign(Box<Expr>, Option<BinOp>, Box<Expr>),

    /// A binary operation: `a + b`, `a >> b`.
    Binary(Box<Expr>, BinOp, Box<Expr>),

    /// A function call expression: `foo(42)`.
    Call(Box<Expr>, Vec<Expr>),

    /// A unary `delete` expression: `delete vector`.
    Delete(Box<Expr>),

    /// An identifier: `foo`.
    Ident(Ident),

    /// A square bracketed indexing expression: `vector[index]`.
    Index(Box<Expr>, Option<Box<Expr>>),

    /// A literal: `hex"1234"`, `5.6 ether`.
    Lit(Lit),

    /// Access of a named member: `obj.k`.
    Member(Box<Expr>, Ident),

    /// A `new` expression: `new Contract`.
    New(Type),

    /// A ternary (AKA conditional) expression: `foo ? bar : baz`.
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),

    /// A tuple expression: `(a,,, b, c, d)`.
    Tuple(Vec<Option<Expr>>),

    /// An elementary type name: `uint256`.
    Type(Type),

    /// A unary operation: `!x`, `-x`, `x++`.
    Unary(UnOp, Box<Expr>),
}

/// A binary operation: `a + b`, `a += b`.
#[derive(Clone, Copy, Debug)]
pub struct BinOp {
    pub span: Span,
    pub kind: BinOpKind,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.to_str())
    }
}

/// A kind of binary operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `||`
    Or,
    /// `&&`
    And,

    /// `>>`
    Shr,
    /// `<<`
    Shl,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,

    /// `+`
    Add,
    /// `-`
    Sub,
    /// `**`
    Pow,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinOpKind {
    /// Returns the string representation of the operator.
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Or => "||",
            Self::And => "&&",
            Self::Shr => ">>",
            Self::Shl => "<<",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Pow => "**",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }

    /// Returns `true` if the operator yields a `bool`.
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne)
    }
}

/// A unary operation: `!x`, `-x`, `x++`.
#[derive(Clone, Copy, Debug)]
pub struct UnOp {
    pub span: Span,
    pub kind: UnOpKind,
}

/// A kind of unary operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOpKind {
    /// `++x`
    PreInc,
    /// `--x`
    PreDec,
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `~`
    BitNot,

    /// `x++`
    PostInc,
    /// `x--`
    PostDec,
}

impl UnOpKind {
    /// Returns the string representation of the operator.
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::PreInc | Self::PostInc => "++",
            Self::PreDec | Self::PostDec => "--",
            Self::Not => "!",
            Self::Neg => "-",
            Self::BitNot => "~",
        }
    }
}
