// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reverse index: from any DAG node to the registered key that owns it.

use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::error::KeyNotFound;
use crate::frozen::{Frozen, Resolve};
use crate::macros::debug_event;
use crate::node::KeyNode;

/// Maps DAG nodes to the registered key that claims them.
///
/// Registering a key claims the key itself and every one of its ancestors.
/// A node that is already claimed keeps its owner when that owner is the new
/// key or one of the new key's ancestors; any other owner is replaced.
///
/// Along a chain of related keys the *first* registered key therefore keeps
/// the shared ancestors, while unrelated keys overwrite each other. This is
/// not "most specific wins": registering `general` and then `specific` leaves
/// `general` in charge of the nodes above it.
///
/// # Example
///
/// ```
/// use understory_dispatch::{KeyNode, ReverseIndex};
///
/// let widget = KeyNode::root("widget");
/// let button = KeyNode::new("button", [widget.clone()]).unwrap();
/// let toggle = KeyNode::new("toggle", [button.clone()]).unwrap();
///
/// let mut handlers = ReverseIndex::new();
/// handlers.insert(&button, "button handler");
/// handlers.insert(&toggle, "toggle handler");
///
/// // `widget` was claimed by `button` first and `toggle` descends from it.
/// assert_eq!(handlers.get(&widget), Ok(&"button handler"));
/// assert_eq!(handlers.get(&toggle), Ok(&"toggle handler"));
/// assert_eq!(handlers.owner(&widget), Some(&button));
/// ```
#[derive(Clone)]
pub struct ReverseIndex<K, V> {
    registered: HashMap<K, V>,
    owners: HashMap<K, KeyNode<K>>,
}

impl<K, V> Default for ReverseIndex<K, V> {
    fn default() -> Self {
        Self {
            registered: HashMap::new(),
            owners: HashMap::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ReverseIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseIndex")
            .field("registered", &self.registered)
            .field("owners", &self.owners)
            .finish()
    }
}

impl<K, V> ReverseIndex<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered keys.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Registers `value` under `key` and claims `key`'s ancestors.
    ///
    /// Returns the value previously registered under `key`.
    pub fn insert(&mut self, key: &KeyNode<K>, value: V) -> Option<V> {
        let previous = self.registered.insert(key.identity().clone(), value);
        for ancestor in key.ancestors() {
            let keep = self
                .owners
                .get(ancestor.identity())
                .is_some_and(|owner| key.descends_from(owner));
            if !keep {
                self.owners.insert(ancestor.identity().clone(), key.clone());
            }
        }
        debug_event!(
            replaced = previous.is_some(),
            ancestors = key.ancestor_count(),
            owned = self.owners.len(),
            "registered reverse-index key"
        );
        previous
    }

    /// Returns the value registered under exactly `key`.
    #[must_use]
    pub fn get_exact(&self, key: &KeyNode<K>) -> Option<&V> {
        self.registered.get(key.identity())
    }

    /// Returns the registered key that currently owns `node`.
    #[must_use]
    pub fn owner(&self, node: &KeyNode<K>) -> Option<&KeyNode<K>> {
        self.owners.get(node.identity())
    }

    /// Returns the value registered under the owner of `node`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyNotFound`] if no registered key has claimed `node`.
    pub fn get(&self, node: &KeyNode<K>) -> Result<&V, KeyNotFound<KeyNode<K>>> {
        self.owner(node)
            .and_then(|owner| self.registered.get(owner.identity()))
            .ok_or_else(|| KeyNotFound { key: node.clone() })
    }

    /// Like [`get`](Self::get), but answers `default` when `node` is unclaimed.
    #[must_use]
    pub fn get_or<'a>(&'a self, node: &KeyNode<K>, default: &'a V) -> &'a V {
        self.get(node).unwrap_or(default)
    }

    /// Freezes the index into a shareable read-only snapshot.
    #[must_use]
    pub fn freeze(self) -> Frozen<Self> {
        Frozen::new(self)
    }
}

impl<K, V> Resolve for ReverseIndex<K, V>
where
    K: Clone + Eq + Hash,
{
    type Key = KeyNode<K>;
    type Value = V;

    fn exact(&self, key: &KeyNode<K>) -> Option<&V> {
        self.get_exact(key)
    }

    fn matching_key(&self, key: &KeyNode<K>) -> Option<KeyNode<K>> {
        self.owner(key).cloned()
    }

    fn resolve(&self, key: &KeyNode<K>) -> Option<&V> {
        self.get(key).ok()
    }
}
