// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building [`KeyNode`]s from an external classification.
//!
//! [`KeyNode::new`] needs the parent nodes themselves. Most embedders instead
//! have identities and "is a kind of" edges from some other system: a type
//! registry, a schema, a plugin manifest. [`Hierarchy`] interns nodes by
//! identity so that system's edges can be replayed one definition at a time,
//! parents first.
//!
//! ## Example
//!
//! ```rust
//! use understory_dispatch::{DagMap, DefineError, Hierarchy};
//!
//! let mut types = Hierarchy::new();
//! types.root("object").unwrap();
//! types.define("number", &["object"]).unwrap();
//! types.define("int", &["number"]).unwrap();
//!
//! assert!(matches!(
//!     types.define("float", &["real"]),
//!     Err(DefineError::UnknownParent { .. })
//! ));
//!
//! let mut format = DagMap::new();
//! format.insert(types.node(&"number").unwrap(), "{:.2}");
//! assert_eq!(format.get(types.node(&"int").unwrap()), Ok(&"{:.2}"));
//! ```

use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::error::DefineError;
use crate::macros::debug_event;
use crate::node::KeyNode;

/// A registry of [`KeyNode`]s addressed by identity.
#[derive(Clone)]
pub struct Hierarchy<K> {
    /// Nodes in definition order.
    nodes: Vec<KeyNode<K>>,
    by_identity: HashMap<K, usize>,
}

impl<K> Default for Hierarchy<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            by_identity: HashMap::new(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Hierarchy<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(KeyNode::identity))
            .finish()
    }
}

impl<K> Hierarchy<K>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of defined nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Defines a node with no parents.
    ///
    /// # Errors
    ///
    /// Returns [`DefineError::AlreadyDefined`] if `identity` is taken.
    pub fn root(&mut self, identity: K) -> Result<KeyNode<K>, DefineError<K>> {
        self.define(identity, &[])
    }

    /// Defines `identity` below the already defined `parents`.
    ///
    /// # Errors
    ///
    /// - [`DefineError::AlreadyDefined`] if `identity` is taken.
    /// - [`DefineError::UnknownParent`] if a parent has not been defined.
    /// - [`DefineError::Linearization`] if the parents admit no consistent
    ///   ancestor order.
    ///
    /// Nothing is defined when an error is returned.
    pub fn define(&mut self, identity: K, parents: &[K]) -> Result<KeyNode<K>, DefineError<K>> {
        if self.by_identity.contains_key(&identity) {
            return Err(DefineError::AlreadyDefined(identity));
        }
        let mut parent_nodes = Vec::with_capacity(parents.len());
        for parent in parents {
            match self.node(parent) {
                Some(node) => parent_nodes.push(node.clone()),
                None => {
                    return Err(DefineError::UnknownParent {
                        node: identity,
                        parent: parent.clone(),
                    });
                }
            }
        }
        let node = KeyNode::new(identity.clone(), parent_nodes)?;
        self.by_identity.insert(identity, self.nodes.len());
        self.nodes.push(node.clone());
        debug_event!(
            parents = parents.len(),
            ancestors = node.ancestor_count(),
            defined = self.nodes.len(),
            "defined key node"
        );
        Ok(node)
    }

    /// Returns the node defined for `identity`.
    #[must_use]
    pub fn node(&self, identity: &K) -> Option<&KeyNode<K>> {
        self.by_identity
            .get(identity)
            .and_then(|&index| self.nodes.get(index))
    }

    /// Returns `true` if `identity` is defined.
    #[must_use]
    pub fn contains(&self, identity: &K) -> bool {
        self.by_identity.contains_key(identity)
    }

    /// Iterates the defined nodes in definition order.
    pub fn iter(&self) -> core::slice::Iter<'_, KeyNode<K>> {
        self.nodes.iter()
    }
}

impl<'a, K> IntoIterator for &'a Hierarchy<K> {
    type Item = &'a KeyNode<K>;
    type IntoIter = core::slice::Iter<'a, KeyNode<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::LinearizationError;
    use alloc::vec;

    #[test]
    fn defines_in_order_and_shares_nodes() {
        let mut h = Hierarchy::new();
        let a = h.root("a").unwrap();
        let b = h.define("b", &["a"]).unwrap();
        let c = h.define("c", &["a"]).unwrap();
        let d = h.define("d", &["b", "c"]).unwrap();

        assert_eq!(h.len(), 4);
        assert_eq!(h.node(&"d"), Some(&d));
        assert_eq!(d.parents(), &[b, c]);
        assert!(d.descends_from(&a));

        let order: Vec<_> = h.iter().map(|n| *n.identity()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn rejects_redefinition() {
        let mut h = Hierarchy::new();
        h.root("a").unwrap();
        assert_eq!(h.root("a"), Err(DefineError::AlreadyDefined("a")));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn rejects_unknown_parent() {
        let mut h = Hierarchy::new();
        h.root("a").unwrap();
        assert_eq!(
            h.define("b", &["a", "missing"]),
            Err(DefineError::UnknownParent {
                node: "b",
                parent: "missing",
            })
        );
        assert!(!h.contains(&"b"));
    }

    #[test]
    fn linearization_failure_defines_nothing() {
        let mut h = Hierarchy::new();
        h.root("x").unwrap();
        h.root("y").unwrap();
        h.define("xy", &["x", "y"]).unwrap();
        h.define("yx", &["y", "x"]).unwrap();

        let err = h.define("bad", &["xy", "yx"]).unwrap_err();
        assert_eq!(
            err,
            DefineError::Linearization(LinearizationError {
                node: "bad",
                conflicts: vec!["x", "y"],
            })
        );
        assert!(!h.contains(&"bad"));
        assert_eq!(h.len(), 4);
    }
}
