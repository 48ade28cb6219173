//! Diagnostics implementation.
//!
//! Recoverable errors are accumulated in a [`DiagCtxt`] shared by every stage of a compilation, so
//! that the caller sees all of them at once. Internal compiler errors are not diagnostics: they are
//! returned as typed errors by the crates that detect them.

use crate::Span;
use std::fmt;

mod builder;
pub use builder::{DiagBuilder, EmissionGuarantee};

mod context;
pub use context::DiagCtxt;

/// Useful type to use with [`Result`] indicate that an error has already been reported to the user,
/// so no need to continue checking.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    /// Creates a new `ErrorGuaranteed`.
    ///
    /// Only the diagnostic context may create one, after having recorded an error.
    pub(crate) fn new_unchecked() -> Self {
        Self(())
    }
}

/// The category of a diagnostic, as presented to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ErrorKind {
    /// Lexical or grammar failure, or an import that could not be loaded.
    #[display("ParserError")]
    ParseError,
    /// Duplicate or clashing declarations, inconsistent inheritance, unresolved names.
    #[display("DeclarationError")]
    DeclarationError,
    /// Type checking failure.
    #[display("TypeError")]
    TypeError,
    /// Malformed or misplaced documentation comment.
    #[display("DocstringParsingError")]
    DocstringParsingError,
    /// Structural rule violation beyond the grammar.
    #[display("SyntaxError")]
    SyntaxError,
    /// Formal verification backend failure. Never produced by this compiler.
    #[display("Why3TranslatorError")]
    Why3TranslatorError,
    /// Non-fatal message.
    #[display("Warning")]
    Warning,
}

impl ErrorKind {
    /// Returns `true` if diagnostics of this kind make the compilation fail.
    #[inline]
    pub fn is_error(self) -> bool {
        self != Self::Warning
    }
}

/// Diagnostic level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// An error in the code being compiled, which prevents compilation from finishing.
    Error,

    /// A warning about the code being compiled. Does not prevent compilation from finishing.
    Warning,

    /// A message giving additional context, usually attached to an error with a secondary
    /// location.
    Note,
}

impl Level {
    /// Returns the string representation of the level.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        }
    }

    /// Returns whether this level is an error.
    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// A diagnostic: a categorized message with an optional primary location, and secondary
/// locations or notes attached as children.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub(crate) kind: ErrorKind,
    pub(crate) level: Level,
    pub message: String,
    pub span: Span,
    pub children: Vec<SubDiagnostic>,
}

/// A "sub"-diagnostic attached to a parent diagnostic.
/// For example, a note pointing at a previous declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubDiagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Diagnostic {
    /// Creates a new `Diagnostic` with a single message.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        let level = if kind.is_error() { Level::Error } else { Level::Warning };
        Self { kind, level, message: msg.into(), span: Span::DUMMY, children: Vec::new() }
    }

    /// Returns whether this diagnostic is an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.level.is_error()
    }

    /// Returns the kind of this diagnostic.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the level of this diagnostic.
    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the primary location, if any.
    pub fn primary_span(&self) -> Option<Span> {
        (!self.span.is_dummy()).then_some(self.span)
    }

    /// Returns the secondary locations with their messages.
    pub fn secondary_spans(&self) -> impl Iterator<Item = (Span, &str)> + '_ {
        self.children
            .iter()
            .filter(|sub| !sub.span.is_dummy())
            .map(|sub| (sub.span, sub.message.as_str()))
    }
}

impl Diagnostic {
    /// Sets the primary location of this diagnostic.
    pub fn span(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    /// Add a note to this diagnostic.
    pub fn note(&mut self, msg: impl Into<String>) -> &mut Self {
        self.sub(Level::Note, msg, Span::DUMMY)
    }

    /// Adds a secondary location with a note.
    /// This is like [`Diagnostic::note()`], but it gets its own span.
    pub fn span_note(&mut self, span: Span, msg: impl Into<String>) -> &mut Self {
        self.sub(Level::Note, msg, span)
    }

    fn sub(&mut self, level: Level, msg: impl Into<String>, span: Span) -> &mut Self {
        self.children.push(SubDiagnostic { level, message: msg.into(), span });
        self
    }
}
