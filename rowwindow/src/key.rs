#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

/// Row index → padded height, for rows whose height differs from the default.
#[cfg(feature = "std")]
pub type HeightLookup = HashMap<usize, u32>;
#[cfg(not(feature = "std"))]
pub type HeightLookup = BTreeMap<usize, u32>;

/// Map keyed by [`KeyCacheKey`]: a `HashMap` with `std`, a `BTreeMap` without.
#[cfg(feature = "std")]
pub type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub type KeyMap<K, V> = BTreeMap<K, V>;

pub type KeyIndexMap<K> = KeyMap<K, usize>;

/// Bound for stable row keys.
///
/// With `std` this is `Hash + Eq`; without it, keys must be `Ord`.
#[cfg(feature = "std")]
pub trait KeyCacheKey: core::hash::Hash + Eq {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq> KeyCacheKey for K {}

#[cfg(not(feature = "std"))]
pub trait KeyCacheKey: Ord {}
#[cfg(not(feature = "std"))]
impl<K: Ord> KeyCacheKey for K {}
