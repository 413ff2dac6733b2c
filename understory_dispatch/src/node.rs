// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key nodes: identities placed in a specialization DAG.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::slice;

use crate::linearize::{LinearizationError, linearize};

/// A node in the key DAG.
///
/// A `KeyNode` pairs a caller-supplied identity with its parent nodes and the
/// linearized list of everything it specializes. The ancestor order is
/// computed once, at construction, and never changes afterwards.
///
/// `KeyNode` is a cheap handle: cloning it clones an [`Arc`], so the same node
/// can be shared between maps, tuple keys and a [`Hierarchy`](crate::Hierarchy).
///
/// Equality and hashing look at the identity only. Two nodes built separately
/// from the same identity compare equal, even if their parents differ.
///
/// # Example
///
/// ```
/// use understory_dispatch::KeyNode;
///
/// let animal = KeyNode::root("animal");
/// let pet = KeyNode::root("pet");
/// let dog = KeyNode::new("dog", [animal.clone(), pet.clone()]).unwrap();
///
/// let order: Vec<_> = dog.ancestors().map(|n| *n.identity()).collect();
/// assert_eq!(order, ["dog", "animal", "pet"]);
/// assert!(dog.descends_from(&pet));
/// assert!(!pet.descends_from(&dog));
/// ```
pub struct KeyNode<K> {
    inner: Arc<NodeInner<K>>,
}

struct NodeInner<K> {
    identity: K,
    parents: Vec<KeyNode<K>>,
    /// Strict ancestors, most specific first. The node itself is not stored
    /// here so that no node holds a reference to itself.
    lineage: Vec<KeyNode<K>>,
}

impl<K> KeyNode<K>
where
    K: Clone + Eq + Hash,
{
    /// Creates a node with no parents.
    #[must_use]
    pub fn root(identity: K) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                identity,
                parents: Vec::new(),
                lineage: Vec::new(),
            }),
        }
    }

    /// Creates a node below `parents` and computes its ancestor order.
    ///
    /// Parents keep the order they are given in; earlier parents are more
    /// specific than later ones when the two are otherwise unordered.
    ///
    /// # Errors
    ///
    /// Returns [`LinearizationError`] if the parents impose contradictory
    /// orders on a shared ancestor, if a parent is listed twice, or if the new
    /// identity already occurs among the parents' ancestors.
    pub fn new<I>(identity: K, parents: I) -> Result<Self, LinearizationError<K>>
    where
        I: IntoIterator<Item = Self>,
    {
        let parents: Vec<Self> = parents.into_iter().collect();
        let lineage = match linearize(&identity, &parents) {
            Ok(lineage) => lineage,
            Err(err) => {
                crate::macros::warn_event!(
                    parents = parents.len(),
                    conflicts = err.conflicts.len(),
                    "key node has no consistent ancestor order"
                );
                return Err(err);
            }
        };
        Ok(Self {
            inner: Arc::new(NodeInner {
                identity,
                parents,
                lineage,
            }),
        })
    }

    /// Returns `true` if `other` is this node or one of its ancestors.
    #[must_use]
    pub fn descends_from(&self, other: &Self) -> bool {
        self.ancestors().any(|a| a == other)
    }
}

impl<K> KeyNode<K> {
    /// Returns the identity this node was created with.
    #[must_use]
    #[inline]
    pub fn identity(&self) -> &K {
        &self.inner.identity
    }

    /// Returns the declared parents, in declaration order.
    #[must_use]
    #[inline]
    pub fn parents(&self) -> &[Self] {
        &self.inner.parents
    }

    /// Returns `true` if this node has no parents.
    #[must_use]
    #[inline]
    pub fn is_root(&self) -> bool {
        self.inner.parents.is_empty()
    }

    /// Iterates the linearized ancestors, starting with this node and ending
    /// with the most general one.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors<'_, K> {
        Ancestors {
            head: Some(self),
            rest: self.inner.lineage.iter(),
        }
    }

    /// Returns the ancestor at position `index` of [`ancestors`](Self::ancestors).
    ///
    /// Index 0 is the node itself.
    #[must_use]
    pub fn ancestor(&self, index: usize) -> Option<&Self> {
        match index {
            0 => Some(self),
            _ => self.inner.lineage.get(index - 1),
        }
    }

    /// Returns the number of ancestors, counting this node.
    #[must_use]
    #[inline]
    pub fn ancestor_count(&self) -> usize {
        self.inner.lineage.len() + 1
    }
}

impl<K> Clone for KeyNode<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: PartialEq> PartialEq for KeyNode<K> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.identity == other.inner.identity
    }
}

impl<K: Eq> Eq for KeyNode<K> {}

impl<K: Hash> Hash for KeyNode<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.identity.hash(state);
    }
}

impl<K: fmt::Debug> fmt::Debug for KeyNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyNode").field(&self.inner.identity).finish()
    }
}

/// Iterator over a node's linearized ancestors.
///
/// Returned by [`KeyNode::ancestors`].
pub struct Ancestors<'a, K> {
    head: Option<&'a KeyNode<K>>,
    rest: slice::Iter<'a, KeyNode<K>>,
}

impl<K> Clone for Ancestors<'_, K> {
    fn clone(&self) -> Self {
        Self {
            head: self.head,
            rest: self.rest.clone(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Ancestors<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K> Iterator for Ancestors<'a, K> {
    type Item = &'a KeyNode<K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.head.take().or_else(|| self.rest.next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl<K> ExactSizeIterator for Ancestors<'_, K> {
    fn len(&self) -> usize {
        usize::from(self.head.is_some()) + self.rest.len()
    }
}

impl<K> FusedIterator for Ancestors<'_, K> {}
