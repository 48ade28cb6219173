//! Solidity AST.

use sable_data_structures::smallvec::SmallVec;
use sable_interface::Span;
use std::fmt;

mod expr;
pub use expr::*;

mod item;
pub use item::*;

mod lit;
pub use lit::*;

mod stmt;
pub use stmt::*;

mod ty;
pub use ty::*;

/// A parsed source file.
#[derive(Clone, Debug, Default)]
pub struct SourceUnit {
    pub items: Vec<Item>,
}

impl SourceUnit {
    /// Creates a new source unit from the given items.
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Returns an iterator over the import directives of the source.
    pub fn imports(&self) -> impl Iterator<Item = (Span, &ImportDirective)> + '_ {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Import(import) => Some((item.span, import)),
            _ => None,
        })
    }

    /// Returns an iterator over the contracts defined in the source.
    pub fn contracts(&self) -> impl Iterator<Item = &ItemContract> + '_ {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Contract(contract) => Some(contract),
            _ => None,
        })
    }
}

/// A documentation comment attached to an item: `/// foo`, `/** bar */`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocComment {
    pub span: Span,
    /// The comment's contents, excluding the comment markers.
    pub text: String,
}

/// An identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({:?}, {:?})", self.name, self.span)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Ident {
    /// Creates a new identifier.
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }

    /// Returns the identifier as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

/// A qualified identifier: `foo.bar.baz`.
///
/// This is a list of identifiers, and is never empty.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(SmallVec<[Ident; 1]>);

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ident) in self.segments().iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            write!(f, "{ident}")?;
        }
        Ok(())
    }
}

impl From<Ident> for Path {
    fn from(ident: Ident) -> Self {
        Self::new_single(ident)
    }
}

impl Path {
    /// Creates a new path from a list of segments.
    ///
    /// Returns `None` if `segments` is empty.
    pub fn new(segments: Vec<Ident>) -> Option<Self> {
        (!segments.is_empty()).then(|| Self(SmallVec::from_vec(segments)))
    }

    /// Creates a new path from a single ident.
    #[inline]
    pub fn new_single(ident: Ident) -> Self {
        let mut segments = SmallVec::new();
        segments.push(ident);
        Self(segments)
    }

    /// Returns the path's span.
    pub fn span(&self) -> Span {
        match self.segments() {
            [] => Span::DUMMY,
            [ident] => ident.span,
            [first, .., last] => first.span.to(last.span),
        }
    }

    /// Returns the path's segments.
    #[inline]
    pub fn segments(&self) -> &[Ident] {
        &self.0
    }

    /// If this path consists of a single ident, returns the ident.
    #[inline]
    pub fn get_ident(&self) -> Option<&Ident> {
        match self.segments() {
            [ident] => Some(ident),
            _ => None,
        }
    }

    /// Returns the first segment of the path.
    #[inline]
    pub fn first(&self) -> &Ident {
        &self.0[0]
    }

    /// Returns the last segment of the path.
    ///
    /// This is the variable, function, type name, etc.
    #[inline]
    pub fn last(&self) -> &Ident {
        &self.0[self.0.len() - 1]
    }
}
