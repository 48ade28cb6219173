use alloy_primitives::Address;
use sable_interface::Span;
use std::fmt;

/// A literal: `hex"1234"`, `5.6 ether`.
#[derive(Clone, Debug)]
pub struct Lit {
    /// The span of the literal.
    pub span: Span,
    /// The "semantic" representation of the literal lowered from the original tokens.
    /// Strings are unescaped, hexadecimal forms are eliminated, etc.
    pub kind: LitKind,
}

/// A kind of literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LitKind {
    /// A string, unicode string, or hex string literal. Contains the kind and the unescaped
    /// contents of the string.
    ///
    /// Invalid UTF-8 sequences are allowed, and as such this cannot be a `str`.
    Str(StrKind, Vec<u8>),
    /// A decimal or hexadecimal number literal.
    Number(num_bigint::BigInt),
    /// A rational number literal.
    ///
    /// Rational literals that evaluate to integers are represented as
    /// [`Number`](Self::Number) (e.g. `1.2e3` is represented as `Number(1200)`).
    Rational(num_rational::BigRational),
    /// An address literal.
    Address(Address),
    /// A boolean literal.
    Bool(bool),
}

impl fmt::Display for LitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(kind, value) => {
                f.write_str(kind.prefix())?;
                write!(f, "\"{}\"", value.escape_ascii())
            }
            Self::Number(n) => n.fmt(f),
            Self::Rational(r) => r.fmt(f),
            Self::Address(address) => address.fmt(f),
            Self::Bool(b) => b.fmt(f),
        }
    }
}

/// A single UTF-8 string literal. Only used in import paths and pragmas, not expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrLit {
    /// The span of the literal.
    pub span: Span,
    /// The contents of the string.
    pub value: String,
}

impl StrLit {
    /// Creates a new string literal.
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Self { span, value: value.into() }
    }
}

/// A string literal kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrKind {
    /// A regular string literal.
    Str,
    /// A unicode string literal.
    Unicode,
    /// A hex string literal.
    Hex,
}

impl StrKind {
    /// Returns the literal prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Str => "",
            Self::Unicode => "unicode",
            Self::Hex => "hex",
        }
    }
}
