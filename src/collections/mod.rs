//! Collection type aliases used throughout the crate.
//!
//! A `HashMap` whose hasher is swappable via Cargo feature (defaulting to
//! `twox-hash`, a faster non-cryptographic hasher than the standard
//! library's DoS-resistant one — this library has no untrusted keys,
//! since every map here is keyed by sequence numbers or node/client
//! ids assigned by the protocol itself), plus an `OrderedMap` alias for
//! callers that need insertion-order iteration (this crate's own
//! insertion-ordered bookkeeping, e.g. `ClientWindows`, uses a plain
//! `Vec` of keys instead, since it also needs deterministic re-ordering
//! via an explicit cursor).
//!
//! Every *externally visible* byproduct of iterating one of these maps
//! (epoch-change evidence, action ordering) is required to sort on an
//! explicit key before being handed to the caller.

use std::collections::HashSet as StdHashSet;
use std::hash::Hash;

#[cfg(feature = "collections_randomstate_twox_hash")]
pub type RandomState = twox_hash::RandomXxHashBuilder64;

#[cfg(not(feature = "collections_randomstate_twox_hash"))]
pub type RandomState = std::collections::hash_map::RandomState;

/// A `HashMap` using this crate's configured hasher.
pub type HashMap<K, V> = std::collections::HashMap<K, V, RandomState>;

/// A `HashSet` using this crate's configured hasher.
pub type HashSet<K> = StdHashSet<K, RandomState>;

/// An insertion-ordered map, used where FIFO draining matters
/// (the log's pending-request queue).
pub type OrderedMap<K, V> = linked_hash_map::LinkedHashMap<K, V>;

/// Returns a new, empty `HashMap`.
pub fn hash_map<K: Eq + Hash, V>() -> HashMap<K, V> {
    HashMap::default()
}

/// Returns a new `HashMap` with at least the given capacity.
pub fn hash_map_capacity<K: Eq + Hash, V>(capacity: usize) -> HashMap<K, V> {
    HashMap::with_capacity_and_hasher(capacity, RandomState::default())
}

/// Returns a new, empty `HashSet`.
pub fn hash_set<K: Eq + Hash>() -> HashSet<K> {
    HashSet::default()
}

/// Returns a new, empty `OrderedMap`.
pub fn ordered_map<K: Eq + Hash, V>() -> OrderedMap<K, V> {
    OrderedMap::new()
}
