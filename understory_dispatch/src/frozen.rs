// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frozen, shareable snapshots of registration-phase maps.
//!
//! Maps are built in two phases. During registration they are ordinary owned
//! values mutated through `&mut self`. Once registration is over, `freeze`
//! moves a map into a [`Frozen`] snapshot: an `Arc` that hands out shared
//! references only. Snapshots are `Send + Sync` whenever the map is, so any
//! number of threads may read from clones of the same snapshot.
//!
//! Memoizing lookups is only sound once nothing can register a more specific
//! entry, so the cache ([`CachedResolver`](crate::CachedResolver), `std`
//! feature) can only be built from a snapshot.

use alloc::sync::Arc;
use core::fmt;
use core::hash::Hash;
use core::ops::Deref;

/// Read access shared by every map in this crate.
///
/// Implemented by [`DagMap`](crate::DagMap), [`MultiKeyMap`](crate::MultiKeyMap),
/// [`ReverseIndex`](crate::ReverseIndex) and by [`Frozen`] snapshots of them.
pub trait Resolve {
    /// Key type accepted by lookups.
    type Key: Clone + Eq + Hash;
    /// Stored value type.
    type Value;

    /// Returns the value stored under exactly `key`.
    fn exact(&self, key: &Self::Key) -> Option<&Self::Value>;

    /// Returns the stored key that a fallback lookup of `key` answers with.
    fn matching_key(&self, key: &Self::Key) -> Option<Self::Key>;

    /// Returns the value a fallback lookup of `key` answers with.
    fn resolve(&self, key: &Self::Key) -> Option<&Self::Value> {
        let matched = self.matching_key(key)?;
        self.exact(&matched)
    }
}

/// An immutable snapshot of a map.
///
/// Created by the `freeze` method of each map. Dereferences to the map, but
/// only ever as a shared reference, so no registration can happen while the
/// snapshot is alive. Cloning is cheap.
///
/// # Example
///
/// ```
/// use understory_dispatch::{DagMap, KeyNode};
///
/// let base = KeyNode::root("base");
/// let derived = KeyNode::new("derived", [base.clone()]).unwrap();
///
/// let mut map = DagMap::new();
/// map.insert(&base, 7);
/// let frozen = map.freeze();
///
/// let reader = frozen.clone();
/// let handle = std::thread::spawn(move || *reader.get(&derived).unwrap());
/// assert_eq!(handle.join().unwrap(), 7);
///
/// // Reopen registration once every reader is gone.
/// let mut map = frozen.try_into_inner().unwrap();
/// map.insert(&base, 8);
/// ```
pub struct Frozen<M> {
    inner: Arc<M>,
}

impl<M> Frozen<M> {
    /// Freezes `map`.
    #[must_use]
    pub fn new(map: M) -> Self {
        Self {
            inner: Arc::new(map),
        }
    }

    /// Returns the map if this is the only handle to the snapshot.
    ///
    /// # Errors
    ///
    /// Returns the snapshot unchanged while other clones are alive.
    pub fn try_into_inner(self) -> Result<M, Self> {
        Arc::try_unwrap(self.inner).map_err(|inner| Self { inner })
    }

    /// Returns `true` if both handles refer to the same snapshot.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<M> Clone for Frozen<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> Deref for Frozen<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.inner
    }
}

impl<M: fmt::Debug> fmt::Debug for Frozen<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frozen").field(&*self.inner).finish()
    }
}

impl<M: Resolve> Resolve for Frozen<M> {
    type Key = M::Key;
    type Value = M::Value;

    fn exact(&self, key: &Self::Key) -> Option<&Self::Value> {
        self.inner.exact(key)
    }

    fn matching_key(&self, key: &Self::Key) -> Option<Self::Key> {
        self.inner.matching_key(key)
    }

    fn resolve(&self, key: &Self::Key) -> Option<&Self::Value> {
        self.inner.resolve(key)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{DagMap, KeyNode};

    #[test]
    fn frozen_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Frozen<DagMap<u32, u32>>>();
    }

    #[test]
    fn try_into_inner_requires_unique_handle() {
        let root = KeyNode::root(0_u32);
        let mut map = DagMap::new();
        map.insert(&root, 1_u32);

        let frozen = map.freeze();
        let other = frozen.clone();
        assert!(Frozen::ptr_eq(&frozen, &other));

        let frozen = frozen.try_into_inner().unwrap_err();
        drop(other);
        let map = frozen.try_into_inner().unwrap();
        assert_eq!(map.get(&root), Ok(&1));
    }

    #[test]
    fn resolve_goes_through_snapshot() {
        let root = KeyNode::root("root");
        let leaf = KeyNode::new("leaf", [root.clone()]).unwrap();
        let mut map = DagMap::new();
        map.insert(&root, 1);
        let frozen = map.freeze();

        assert_eq!(Resolve::resolve(&frozen, &leaf), Some(&1));
        assert_eq!(Resolve::exact(&frozen, &leaf), None);
        assert_eq!(Resolve::matching_key(&frozen, &leaf), Some(root));
    }
}
