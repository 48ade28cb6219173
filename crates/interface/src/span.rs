use std::fmt;

sable_data_structures::newtype_index! {
    /// A source unit ID.
    ///
    /// Assigned by the compilation driver in registration order.
    pub struct SourceId;
}

/// A source code location: a `lo..hi` byte range into the text of one source unit.
///
/// Spans produced without a source, like those of compiler-generated declarations, are
/// [dummies](Self::DUMMY).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    source: Option<SourceId>,
    lo: u32,
    hi: u32,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            Some(source) => write!(f, "Span({}, {}..{})", source.get(), self.lo, self.hi),
            None => f.write_str("Span(DUMMY)"),
        }
    }
}

impl Span {
    /// A dummy span.
    pub const DUMMY: Self = Self { source: None, lo: 0, hi: 0 };

    /// Creates a new span from the given source and byte range.
    #[inline]
    pub fn new(source: SourceId, lo: u32, hi: u32) -> Self {
        debug_assert!(lo <= hi, "invalid span: {lo} > {hi}");
        Self { source: Some(source), lo, hi }
    }

    /// Returns `true` if this is a dummy span.
    #[inline]
    pub fn is_dummy(self) -> bool {
        self.source.is_none()
    }

    /// Returns the source this span points into.
    #[inline]
    pub fn source(self) -> Option<SourceId> {
        self.source
    }

    /// Returns the start offset.
    #[inline]
    pub fn lo(self) -> u32 {
        self.lo
    }

    /// Returns the end offset, exclusive.
    #[inline]
    pub fn hi(self) -> u32 {
        self.hi
    }

    /// Returns the length of the span in bytes.
    #[inline]
    pub fn len(self) -> u32 {
        self.hi - self.lo
    }

    /// Returns `true` if the span is empty.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.lo == self.hi
    }

    /// Returns a span covering both `self` and `other`.
    ///
    /// Spans in different sources can't be joined; `self` is returned unchanged in that case.
    pub fn to(self, other: Self) -> Self {
        match (self.source, other.source) {
            (Some(a), Some(b)) if a == b => {
                Self { source: Some(a), lo: self.lo.min(other.lo), hi: self.hi.max(other.hi) }
            }
            (None, _) => other,
            _ => self,
        }
    }
}
