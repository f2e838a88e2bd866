//! Storage for breakpoints: named sets and node-keyed bitmasks.

use crate::mask::NodeBreakpointMask;
use indexmap::{Equivalent, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::{collections::hash_map::Entry, hash::Hash};

/// An insertion-ordered set of breakpoint keys.
///
/// Adding a key twice keeps a single entry; one removal always clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSet<K: Hash + Eq> {
    entries: IndexSet<K, FxBuildHasher>,
}

impl<K: Hash + Eq> Default for BreakpointSet<K> {
    fn default() -> Self {
        Self {
            entries: IndexSet::default(),
        }
    }
}

impl<K: Hash + Eq> BreakpointSet<K> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key`, returning `false` if it was already present.
    pub fn add(&mut self, key: K) -> bool {
        self.entries.insert(key)
    }

    /// Removes `key`, returning `false` if it was absent.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.shift_remove(key)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.contains(key)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &K> {
        self.entries.iter()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Hash + Eq> FromIterator<K> for BreakpointSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Bitmasks keyed by node.
///
/// A zero mask is never stored: clearing the last bit of an entry deletes it,
/// so an absent key and a zero mask are indistinguishable to every reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskTable<K: Hash + Eq> {
    masks: FxHashMap<K, NodeBreakpointMask>,
}

impl<K: Hash + Eq> Default for MaskTable<K> {
    fn default() -> Self {
        Self {
            masks: FxHashMap::default(),
        }
    }
}

impl<K: Hash + Eq> MaskTable<K> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bits of `mask` on `key`.
    pub fn add(&mut self, key: K, mask: NodeBreakpointMask) {
        if mask.is_empty() {
            return;
        }
        *self.masks.entry(key).or_default() |= mask;
    }

    /// Clears the bits of `mask` on `key`, deleting the entry once it is empty.
    pub fn remove(&mut self, key: K, mask: NodeBreakpointMask) {
        if let Entry::Occupied(mut entry) = self.masks.entry(key) {
            let remaining = entry.get().difference(mask);
            if remaining.is_empty() {
                entry.remove();
            } else {
                entry.insert(remaining);
            }
        }
    }

    /// Stores `mask` for `key` as is, deleting the entry when it is empty.
    pub fn set_mask(&mut self, key: K, mask: NodeBreakpointMask) {
        if mask.is_empty() {
            self.masks.remove(&key);
        } else {
            self.masks.insert(key, mask);
        }
    }

    /// Drops the entry for `key`, returning whether there was one.
    pub fn forget(&mut self, key: &K) -> bool {
        self.masks.remove(key).is_some()
    }

    /// The raw stored mask, owned and inherited bits alike.
    #[must_use]
    pub fn mask(&self, key: &K) -> NodeBreakpointMask {
        self.masks.get(key).copied().unwrap_or_default()
    }

    /// The mask folded onto the owned bit positions, see
    /// [`NodeBreakpointMask::effective`].
    #[must_use]
    pub fn effective_mask(&self, key: &K) -> NodeBreakpointMask {
        self.mask(key).effective()
    }

    /// Whether `key` has any bit set.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.masks.contains_key(key)
    }

    /// Iterates over the stored entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, NodeBreakpointMask)> {
        self.masks.iter().map(|(key, mask)| (key, *mask))
    }

    /// Number of keys with a non-zero mask.
    #[must_use]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// Whether no key has a mask.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.masks.clear();
    }
}

/// URL substrings that pause outgoing requests, plus the match-any flag.
///
/// The set stores patterns literally. Routing the empty pattern to the
/// match-any flag is the registry's job, see
/// [`BreakpointRegistry::set_xhr_breakpoint`](crate::BreakpointRegistry::set_xhr_breakpoint).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XhrBreakpointSet {
    patterns: BreakpointSet<String>,
    match_any_url: bool,
}

impl XhrBreakpointSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pattern`, returning `false` if it was already present.
    pub fn add_pattern(&mut self, pattern: &str) -> bool {
        if self.patterns.contains(pattern) {
            return false;
        }
        self.patterns.add(pattern.to_owned())
    }

    /// Removes `pattern`, returning `false` if it was absent.
    pub fn remove_pattern(&mut self, pattern: &str) -> bool {
        self.patterns.remove(pattern)
    }

    /// Whether `pattern` is stored.
    #[must_use]
    pub fn contains_pattern(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }

    /// Whether every request matches.
    #[must_use]
    pub fn match_any_url(&self) -> bool {
        self.match_any_url
    }

    /// Sets the match-any flag, returning its previous value.
    pub fn set_match_any_url(&mut self, value: bool) -> bool {
        std::mem::replace(&mut self.match_any_url, value)
    }

    /// The pattern a request to `url` matches.
    ///
    /// Returns the empty string when the match-any flag is set, otherwise the
    /// first stored pattern, in insertion order, that `url` contains.
    #[must_use]
    pub fn matching_pattern(&self, url: &str) -> Option<&str> {
        if self.match_any_url {
            return Some("");
        }
        self.patterns
            .iter()
            .find(|pattern| url.contains(pattern.as_str()))
            .map(String::as_str)
    }

    /// Iterates over the stored patterns in insertion order.
    pub fn patterns(&self) -> impl ExactSizeIterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    /// Whether no pattern is stored and the match-any flag is clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && !self.match_any_url
    }

    /// Drops every pattern and clears the match-any flag.
    pub fn clear(&mut self) {
        self.patterns.clear();
        self.match_any_url = false;
    }
}
