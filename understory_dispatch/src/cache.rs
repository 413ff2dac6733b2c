// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memoized fallback lookups over a frozen snapshot.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::frozen::{Frozen, Resolve};

/// A read-through cache of fallback lookups.
///
/// Remembers, per lookup key, which stored key answered it. Subsequent
/// lookups of the same key skip the ancestor walk and go straight to the
/// exact entry. Values are still borrowed from the snapshot, never copied.
///
/// A resolver can only be built from a [`Frozen`] snapshot, where no new
/// registration can invalidate a remembered answer. It is `Sync`: threads
/// can share one resolver and its memo.
///
/// # Example
///
/// ```
/// use understory_dispatch::{DagMap, KeyNode};
///
/// let base = KeyNode::root("base");
/// let leaf = KeyNode::new("leaf", [base.clone()]).unwrap();
///
/// let mut map = DagMap::new();
/// map.insert(&base, 1);
/// let cache = map.freeze().cached();
///
/// assert_eq!(cache.get(&leaf), Some(&1));
/// assert_eq!(cache.get(&leaf), Some(&1));
/// assert_eq!((cache.hits(), cache.misses()), (1, 1));
/// ```
pub struct CachedResolver<M: Resolve> {
    snapshot: Frozen<M>,
    memo: RwLock<HashMap<M::Key, Option<M::Key>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<M: Resolve> CachedResolver<M> {
    /// Creates an empty cache over `snapshot`.
    #[must_use]
    pub fn new(snapshot: Frozen<M>) -> Self {
        Self {
            snapshot,
            memo: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Returns the snapshot this cache reads from.
    #[must_use]
    pub fn snapshot(&self) -> &Frozen<M> {
        &self.snapshot
    }

    /// Returns the value a fallback lookup of `key` answers with.
    pub fn get(&self, key: &M::Key) -> Option<&M::Value> {
        let remembered = self.memo.read().get(key).cloned();
        let matched = match remembered {
            Some(matched) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                matched
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let matched = self.snapshot.matching_key(key);
                self.memo.write().insert(key.clone(), matched.clone());
                matched
            }
        };
        self.snapshot.exact(&matched?)
    }

    /// Returns the value stored under exactly `key`. Not memoized.
    pub fn get_exact(&self, key: &M::Key) -> Option<&M::Value> {
        self.snapshot.exact(key)
    }

    /// Returns the number of lookups answered from the memo.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of lookups that walked the ancestors.
    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the number of memoized keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.read().len()
    }

    /// Returns `true` if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memo.read().is_empty()
    }

    /// Forgets every memoized answer and resets the counters.
    pub fn clear(&self) {
        self.memo.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl<M: Resolve> fmt::Debug for CachedResolver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedResolver")
            .field("memoized", &self.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish_non_exhaustive()
    }
}

impl<M: Resolve> Frozen<M> {
    /// Creates a memoizing resolver over this snapshot.
    #[must_use]
    pub fn cached(&self) -> CachedResolver<M> {
        CachedResolver::new(self.clone())
    }
}
