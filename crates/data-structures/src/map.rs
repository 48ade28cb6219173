//! Hash maps and sets keyed with [`FxHasher`].
//!
//! Compiler output must not depend on hash order: anything iterated to produce diagnostics,
//! generated code or artifacts uses the insertion-ordered `FxIndex*` types.

use indexmap::{IndexMap, IndexSet};
use std::{
    collections::{HashMap, HashSet},
    hash::BuildHasherDefault,
};

pub use rustc_hash::{FxBuildHasher, FxHasher};

type Fx = BuildHasherDefault<FxHasher>;

/// Entry of an [`FxIndexMap`].
pub type IndexEntry<'a, K, V> = indexmap::map::Entry<'a, K, V>;

/// Unordered map, for lookups only.
pub type FxHashMap<K, V> = HashMap<K, V, Fx>;
/// Unordered set, for lookups only.
pub type FxHashSet<V> = HashSet<V, Fx>;
/// Map iterated in insertion order.
pub type FxIndexMap<K, V> = IndexMap<K, V, Fx>;
/// Set iterated in insertion order.
pub type FxIndexSet<V> = IndexSet<V, Fx>;
