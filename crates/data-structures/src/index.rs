//! Index types.
//!
//! Compiler entities (sources, contracts, scopes, declarations, ...) live in [`IndexVec`]s and are
//! referred to by strongly typed indices declared with [`newtype_index!`](crate::newtype_index).

use std::{fmt, num::NonZeroU32};

pub use index_vec::{Idx, IndexSlice, IndexVec};

/// A 32-bit index with a niche, so that `Option<BaseIndex32>` is 4 bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct BaseIndex32 {
    value: NonZeroU32,
}

impl fmt::Display for BaseIndex32 {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt(f)
    }
}

impl fmt::Debug for BaseIndex32 {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt(f)
    }
}

impl Idx for BaseIndex32 {
    #[inline]
    fn from_usize(value: usize) -> Self {
        assert!(value <= Self::MAX_AS as usize);
        Self::new(value as u32)
    }

    #[inline]
    fn index(self) -> usize {
        self.get() as usize
    }
}

impl BaseIndex32 {
    /// The maximum index value, as a primitive.
    pub const MAX_AS: u32 = 0xFFFF_FF00;

    /// The maximum index value.
    pub const MAX: Self = Self::new(Self::MAX_AS);

    /// Creates a new index from the given `value`.
    ///
    /// # Panics
    ///
    /// Panics if `value` exceeds `MAX`.
    #[inline]
    pub const fn new(value: u32) -> Self {
        assert!(value <= Self::MAX_AS, "index overflowed");
        match NonZeroU32::new(value + 1) {
            Some(value) => Self { value },
            None => unreachable!(),
        }
    }

    /// Gets the underlying index value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.value.get() - 1
    }
}

/// Declares one or more index newtypes over [`BaseIndex32`].
///
/// ```
/// sable_data_structures::newtype_index! {
///     /// A widget ID.
///     pub struct WidgetId;
/// }
///
/// let id = WidgetId::new(3);
/// assert_eq!(id.index(), 3);
/// assert_eq!(format!("{id:?}"), "WidgetId(3)");
/// ```
#[macro_export]
macro_rules! newtype_index {
    ($($(#[$attr:meta])* $vis:vis struct $name:ident;)*) => {$(
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        $vis struct $name($crate::index::BaseIndex32);

        impl $name {
            /// The maximum index value.
            pub const MAX: Self = Self($crate::index::BaseIndex32::MAX);

            /// Creates a new index from the given `value`.
            #[inline]
            pub const fn new(value: u32) -> Self {
                Self($crate::index::BaseIndex32::new(value))
            }

            /// Gets the underlying index value.
            #[inline]
            pub const fn get(self) -> u32 {
                self.0.get()
            }

            /// Gets the underlying index value as a `usize`.
            #[inline]
            pub const fn index(self) -> usize {
                self.0.get() as usize
            }
        }

        impl $crate::index::Idx for $name {
            #[inline]
            fn from_usize(value: usize) -> Self {
                Self($crate::index::Idx::from_usize(value))
            }

            #[inline]
            fn index(self) -> usize {
                self.0.get() as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.get())
            }
        }
    )*};
}
