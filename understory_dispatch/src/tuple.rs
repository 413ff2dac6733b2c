// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composite keys made of several [`KeyNode`]s.

use core::fmt;
use core::hash::Hash;
use core::iter::FusedIterator;

use smallvec::{SmallVec, smallvec};

use crate::node::KeyNode;

/// Inline capacity for tuple components; dispatch keys rarely exceed it.
const INLINE: usize = 4;

/// A fixed-arity sequence of [`KeyNode`]s used as a composite key.
///
/// The empty tuple is its own variant so callers match on arity once instead
/// of inspecting a length.
///
/// # Example
///
/// ```
/// use understory_dispatch::{KeyNode, TupleKey};
///
/// let shape = KeyNode::root("shape");
/// let circle = KeyNode::new("circle", [shape.clone()]).unwrap();
/// let key = TupleKey::new([circle, shape]);
///
/// assert_eq!(key.arity(), 2);
/// let order: Vec<_> = key
///     .ancestors()
///     .map(|t| t.components().iter().map(|n| *n.identity()).collect::<Vec<_>>())
///     .collect();
/// assert_eq!(order, [["circle", "shape"], ["shape", "shape"]]);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TupleKey<K> {
    /// The tuple with no components.
    Empty,
    /// A tuple with at least one component.
    NonEmpty(NonEmptyKey<K>),
}

/// The components of a [`TupleKey::NonEmpty`]; never empty.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyKey<K> {
    components: SmallVec<[KeyNode<K>; INLINE]>,
}

impl<K> NonEmptyKey<K> {
    /// Returns the components, in order.
    #[must_use]
    #[inline]
    pub fn components(&self) -> &[KeyNode<K>] {
        &self.components
    }

    /// Returns the number of components; at least 1.
    #[must_use]
    #[inline]
    pub fn arity(&self) -> usize {
        self.components.len()
    }
}

impl<K> TupleKey<K> {
    /// Creates a tuple key from its components.
    pub fn new<I>(components: I) -> Self
    where
        I: IntoIterator<Item = KeyNode<K>>,
    {
        let components: SmallVec<[KeyNode<K>; INLINE]> = components.into_iter().collect();
        if components.is_empty() {
            Self::Empty
        } else {
            Self::NonEmpty(NonEmptyKey { components })
        }
    }

    /// Returns the empty tuple key.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Returns the number of components.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::NonEmpty(key) => key.arity(),
        }
    }

    /// Returns the components, in order.
    #[must_use]
    pub fn components(&self) -> &[KeyNode<K>] {
        match self {
            Self::Empty => &[],
            Self::NonEmpty(key) => key.components(),
        }
    }

    /// Iterates the ancestor tuples of this key in priority order.
    ///
    /// See [`AncestorTuples`] for the order.
    #[must_use]
    pub fn ancestors(&self) -> AncestorTuples<'_, K> {
        AncestorTuples::new(self.components())
    }
}

impl<K> TupleKey<K>
where
    K: Clone + Eq + Hash,
{
    /// Returns `true` if both keys have the same arity and every component of
    /// this key descends from the matching component of `other`.
    #[must_use]
    pub fn descends_from(&self, other: &Self) -> bool {
        self.arity() == other.arity()
            && self
                .components()
                .iter()
                .zip(other.components())
                .all(|(k, a)| k.descends_from(a))
    }
}

impl<K> From<KeyNode<K>> for TupleKey<K> {
    fn from(node: KeyNode<K>) -> Self {
        Self::NonEmpty(NonEmptyKey {
            components: smallvec![node],
        })
    }
}

impl<K> FromIterator<KeyNode<K>> for TupleKey<K> {
    fn from_iter<I: IntoIterator<Item = KeyNode<K>>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<K: fmt::Debug> fmt::Debug for TupleKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut t = f.debug_tuple("TupleKey");
        for component in self.components() {
            t.field(component.identity());
        }
        t.finish()
    }
}

impl<K: fmt::Debug> fmt::Debug for NonEmptyKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.components.iter().map(KeyNode::identity))
            .finish()
    }
}

/// Iterator over the ancestor tuples of a [`TupleKey`].
///
/// Yields the full cross product of each component's ancestors. The first
/// component varies slowest: every tuple that keeps the most specific first
/// component comes before any tuple with a more general one, and the remaining
/// components break ties in the same way, in declaration order. The key itself
/// is always yielded first.
///
/// The number of tuples is the product of the components' ancestor counts.
/// The iterator walks them with an index odometer, so it needs no recursion
/// and allocates only for the tuples it returns.
pub struct AncestorTuples<'a, K> {
    components: &'a [KeyNode<K>],
    /// Ancestor index per component; `None` once exhausted.
    cursor: Option<SmallVec<[usize; INLINE]>>,
    /// Total tuple count, unless it overflows `usize`.
    total: Option<usize>,
    yielded: usize,
}

impl<'a, K> AncestorTuples<'a, K> {
    pub(crate) fn new(components: &'a [KeyNode<K>]) -> Self {
        let total = components
            .iter()
            .try_fold(1_usize, |acc, c| acc.checked_mul(c.ancestor_count()));
        Self {
            components,
            cursor: Some(smallvec![0; components.len()]),
            total,
            yielded: 0,
        }
    }

    fn advance(&mut self) {
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        for (position, index) in cursor.iter_mut().enumerate().rev() {
            *index += 1;
            if *index < self.components[position].ancestor_count() {
                return;
            }
            *index = 0;
        }
        self.cursor = None;
    }
}

impl<K> Clone for AncestorTuples<'_, K> {
    fn clone(&self) -> Self {
        Self {
            components: self.components,
            cursor: self.cursor.clone(),
            total: self.total,
            yielded: self.yielded,
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for AncestorTuples<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AncestorTuples")
            .field("key", &TupleKeyView(self.components))
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

struct TupleKeyView<'a, K>(&'a [KeyNode<K>]);

impl<K: fmt::Debug> fmt::Debug for TupleKeyView<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(KeyNode::identity))
            .finish()
    }
}

impl<K> Iterator for AncestorTuples<'_, K> {
    type Item = TupleKey<K>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_ref()?;
        let tuple = TupleKey::new(
            self.components
                .iter()
                .zip(cursor.iter())
                .filter_map(|(component, &index)| component.ancestor(index).cloned()),
        );
        self.yielded += 1;
        self.advance();
        Some(tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.total {
            Some(total) => {
                let remaining = total - self.yielded;
                (remaining, Some(remaining))
            }
            None => (0, None),
        }
    }
}

impl<K> FusedIterator for AncestorTuples<'_, K> {}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::format;
    use alloc::vec;
    use alloc::vec::Vec;

    type Node = KeyNode<&'static str>;

    fn names(key: &TupleKey<&'static str>) -> Vec<&'static str> {
        key.components().iter().map(|n| *n.identity()).collect()
    }

    fn chain(ids: &[&'static str]) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::new();
        for id in ids {
            let node = match out.last() {
                Some(parent) => KeyNode::new(*id, [parent.clone()]).unwrap(),
                None => KeyNode::root(*id),
            };
            out.push(node);
        }
        out
    }

    #[test]
    fn empty_key_yields_itself_once() {
        let key = TupleKey::<u32>::new([]);
        assert_eq!(key, TupleKey::Empty);
        assert_eq!(key.arity(), 0);
        let all: Vec<_> = key.ancestors().collect();
        assert_eq!(all, vec![TupleKey::Empty]);
    }

    #[test]
    fn single_component_follows_node_order() {
        let abc = chain(&["a", "b", "c"]);
        let key = TupleKey::from(abc[2].clone());
        let all: Vec<_> = key.ancestors().map(|t| names(&t)).collect();
        assert_eq!(all, vec![vec!["c"], vec!["b"], vec!["a"]]);
    }

    #[test]
    fn first_component_varies_slowest() {
        let a = chain(&["a1", "a2"]);
        let b = chain(&["b1", "b2", "b3"]);
        let key = TupleKey::new([a[1].clone(), b[2].clone()]);

        let all: Vec<_> = key.ancestors().map(|t| names(&t)).collect();
        assert_eq!(
            all,
            vec![
                vec!["a2", "b3"],
                vec!["a2", "b2"],
                vec!["a2", "b1"],
                vec!["a1", "b3"],
                vec!["a1", "b2"],
                vec!["a1", "b1"],
            ]
        );
    }

    #[test]
    fn size_hint_counts_down() {
        let a = chain(&["a1", "a2"]);
        let b = chain(&["b1", "b2"]);
        let key = TupleKey::new([a[1].clone(), b[1].clone(), a[0].clone()]);

        let mut iter = key.ancestors();
        assert_eq!(iter.size_hint(), (4, Some(4)));
        iter.next();
        assert_eq!(iter.size_hint(), (3, Some(3)));
        assert_eq!(iter.count(), 3);
    }

    #[test]
    fn high_arity_does_not_recurse() {
        let root = KeyNode::root("r");
        let leaf = KeyNode::new("l", [root]).unwrap();
        let key: TupleKey<_> = core::iter::repeat_n(leaf, 16).collect();
        assert_eq!(key.ancestors().count(), 1 << 16);
    }

    #[test]
    fn overflowing_count_has_no_lower_bound() {
        let root = KeyNode::root("r");
        let leaf = KeyNode::new("l", [root]).unwrap();
        // 2^64 tuples do not fit in a `usize`.
        let key: TupleKey<_> = core::iter::repeat_n(leaf, 64).collect();

        let mut iter = key.ancestors();
        assert_eq!(iter.size_hint(), (0, None));
        assert_eq!(iter.next(), Some(key.clone()));
        assert_eq!(iter.size_hint(), (0, None));
    }

    #[test]
    fn equality_is_component_wise() {
        let abc = chain(&["a", "b", "c"]);
        let k1 = TupleKey::new([abc[0].clone(), abc[1].clone()]);
        let k2 = TupleKey::new([KeyNode::root("a"), KeyNode::root("b")]);
        assert_eq!(k1, k2);
        assert_ne!(k1, TupleKey::new([abc[1].clone(), abc[0].clone()]));
        assert_eq!(format!("{k1:?}"), "TupleKey(\"a\", \"b\")");
    }

    #[test]
    fn descends_component_wise() {
        let abc = chain(&["a", "b", "c"]);
        let key = TupleKey::new([abc[2].clone(), abc[1].clone()]);
        assert!(key.descends_from(&TupleKey::new([abc[0].clone(), abc[1].clone()])));
        assert!(!key.descends_from(&TupleKey::new([abc[0].clone(), abc[2].clone()])));
        assert!(!key.descends_from(&TupleKey::from(abc[0].clone())));
    }
}
