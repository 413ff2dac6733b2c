// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-key map with ancestor fallback.

use core::fmt;
use core::hash::Hash;
use core::iter::FusedIterator;

use hashbrown::HashMap;

use crate::error::KeyNotFound;
use crate::frozen::{Frozen, Resolve};
use crate::macros::debug_event;
use crate::node::{Ancestors, KeyNode};
use crate::trace::ResolveTrace;

/// A map keyed by [`KeyNode`] whose lookups fall back to ancestors.
///
/// Entries are stored by exact identity. [`get`](Self::get) walks the key's
/// ancestors, most specific first, and answers with the first one that has an
/// entry. [`get_exact`](Self::get_exact) never falls back.
///
/// # Example
///
/// ```
/// use understory_dispatch::{DagMap, KeyNode};
///
/// let animal = KeyNode::root("animal");
/// let dog = KeyNode::new("dog", [animal.clone()]).unwrap();
/// let puppy = KeyNode::new("puppy", [dog.clone()]).unwrap();
///
/// let mut sound = DagMap::new();
/// sound.insert(&animal, "...");
/// sound.insert(&dog, "woof");
///
/// assert_eq!(sound.get(&puppy), Ok(&"woof"));
/// assert_eq!(sound.get(&animal), Ok(&"..."));
/// assert_eq!(sound.get_exact(&puppy), None);
///
/// // Every applicable value, most specific first.
/// let all: Vec<_> = sound.all(&puppy).copied().collect();
/// assert_eq!(all, ["woof", "..."]);
/// ```
#[derive(Clone)]
pub struct DagMap<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for DagMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for DagMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K, V> DagMap<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of exact entries.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `value` under exactly `key`, returning the previous value.
    pub fn insert(&mut self, key: &KeyNode<K>, value: V) -> Option<V> {
        let previous = self.entries.insert(key.identity().clone(), value);
        debug_event!(
            replaced = previous.is_some(),
            entries = self.entries.len(),
            "registered single-key entry"
        );
        previous
    }

    /// Returns the value stored under exactly `key`.
    #[must_use]
    pub fn get_exact(&self, key: &KeyNode<K>) -> Option<&V> {
        self.entries.get(key.identity())
    }

    /// Returns `true` if `key` itself has an entry.
    #[must_use]
    pub fn contains_exact(&self, key: &KeyNode<K>) -> bool {
        self.entries.contains_key(key.identity())
    }

    /// Returns the value of the most specific ancestor of `key` that has an
    /// entry, `key` itself included.
    ///
    /// # Errors
    ///
    /// Returns [`KeyNotFound`] if no ancestor has an entry.
    pub fn get(&self, key: &KeyNode<K>) -> Result<&V, KeyNotFound<KeyNode<K>>> {
        self.find(key)
            .map(|(_, value)| value)
            .ok_or_else(|| KeyNotFound { key: key.clone() })
    }

    /// Like [`get`](Self::get), but answers `default` when nothing matches.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &KeyNode<K>, default: &'a V) -> &'a V {
        self.find(key).map_or(default, |(_, value)| value)
    }

    /// Returns the ancestor of `key` whose entry [`get`](Self::get) answers with.
    #[must_use]
    pub fn matching_key<'k>(&self, key: &'k KeyNode<K>) -> Option<&'k KeyNode<K>> {
        self.find(key).map(|(node, _)| node)
    }

    /// Like [`get`](Self::get), reporting each probed ancestor to `trace`.
    pub fn get_with_trace<T>(&self, key: &KeyNode<K>, trace: &mut T) -> Option<&V>
    where
        T: ResolveTrace<KeyNode<K>> + ?Sized,
    {
        for ancestor in key.ancestors() {
            let found = self.entries.get(ancestor.identity());
            trace.probe(ancestor, found.is_some());
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Iterates every value stored along `key`'s ancestors, most specific
    /// first.
    ///
    /// The iterator is lazy and recomputed on every call.
    #[must_use]
    pub fn all<'m, 'k>(&'m self, key: &'k KeyNode<K>) -> All<'m, 'k, K, V> {
        All {
            entries: &self.entries,
            ancestors: key.ancestors(),
        }
    }

    /// Iterates the exact entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter()
    }

    /// Freezes the map into a shareable read-only snapshot.
    #[must_use]
    pub fn freeze(self) -> Frozen<Self> {
        Frozen::new(self)
    }

    fn find<'k>(&self, key: &'k KeyNode<K>) -> Option<(&'k KeyNode<K>, &V)> {
        key.ancestors()
            .find_map(|ancestor| self.entries.get(ancestor.identity()).map(|v| (ancestor, v)))
    }
}

impl<K, V> Resolve for DagMap<K, V>
where
    K: Clone + Eq + Hash,
{
    type Key = KeyNode<K>;
    type Value = V;

    fn exact(&self, key: &KeyNode<K>) -> Option<&V> {
        self.get_exact(key)
    }

    fn matching_key(&self, key: &KeyNode<K>) -> Option<KeyNode<K>> {
        Self::matching_key(self, key).cloned()
    }

    fn resolve(&self, key: &KeyNode<K>) -> Option<&V> {
        self.get(key).ok()
    }
}

/// Iterator over every value applicable to a key.
///
/// Returned by [`DagMap::all`].
pub struct All<'m, 'k, K, V> {
    entries: &'m HashMap<K, V>,
    ancestors: Ancestors<'k, K>,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for All<'_, '_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("All")
            .field("ancestors", &self.ancestors)
            .finish_non_exhaustive()
    }
}

impl<'m, K, V> Iterator for All<'m, '_, K, V>
where
    K: Eq + Hash,
{
    type Item = &'m V;

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries;
        self.ancestors
            .find_map(|ancestor| entries.get(ancestor.identity()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ancestors.len()))
    }
}

impl<K: Eq + Hash, V> FusedIterator for All<'_, '_, K, V> {}
