// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-key map: composite keys with cross-product ancestor fallback.

use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;
use core::iter::FusedIterator;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::{ArityMismatch, KeyNotFound, MultiLookupError};
use crate::frozen::{Frozen, Resolve};
use crate::macros::debug_event;
use crate::node::KeyNode;
use crate::trace::ResolveTrace;
use crate::tuple::TupleKey;

/// One level of nested storage.
///
/// Level `d` of an arity-`n` bucket is keyed by component `d`. Levels before
/// the last only use `children`; the last level only uses `leaves`.
struct Level<K, V> {
    children: HashMap<K, Level<K, V>>,
    leaves: HashMap<K, V>,
}

impl<K, V> Level<K, V> {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            leaves: HashMap::new(),
        }
    }
}

impl<K: Clone, V: Clone> Clone for Level<K, V> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            leaves: self.leaves.clone(),
        }
    }
}

/// A map keyed by [`TupleKey`] whose lookups fall back to ancestor tuples.
///
/// A stored tuple matches a lookup key when it has the same arity and each
/// of its components is the matching lookup component or one of that
/// component's ancestors. When several stored tuples match, the one whose
/// first component is most specific wins; the remaining components break
/// ties in declaration order. This is exactly the order of
/// [`TupleKey::ancestors`].
///
/// Keys of different arity never collide. The empty tuple stores a single
/// value. A map created with [`with_arity`](Self::with_arity) rejects keys of
/// any other arity with [`ArityMismatch`] on every lookup, except
/// [`get_or`](Self::get_or).
///
/// # Example
///
/// ```
/// use understory_dispatch::{KeyNode, MultiKeyMap, TupleKey};
///
/// let shape = KeyNode::root("shape");
/// let circle = KeyNode::new("circle", [shape.clone()]).unwrap();
///
/// let mut intersect = MultiKeyMap::new();
/// intersect
///     .insert(&TupleKey::new([shape.clone(), shape.clone()]), "generic")
///     .unwrap();
/// intersect
///     .insert(&TupleKey::new([circle.clone(), shape.clone()]), "circle-first")
///     .unwrap();
///
/// let key = TupleKey::new([circle.clone(), circle.clone()]);
/// assert_eq!(intersect.get(&key), Ok(&"circle-first"));
/// assert_eq!(intersect.all(&key), Ok(vec![&"circle-first", &"generic"]));
///
/// let key = TupleKey::new([shape.clone(), circle.clone()]);
/// assert_eq!(intersect.get(&key), Ok(&"generic"));
/// ```
pub struct MultiKeyMap<K, V> {
    /// Value of the empty tuple.
    unit: Option<V>,
    /// Nested storage per arity (>= 1).
    by_arity: HashMap<usize, Level<K, V>>,
    /// Fixed arity, when created with [`with_arity`](Self::with_arity).
    arity: Option<usize>,
    len: usize,
}

impl<K, V> Default for MultiKeyMap<K, V> {
    fn default() -> Self {
        Self {
            unit: None,
            by_arity: HashMap::new(),
            arity: None,
            len: 0,
        }
    }
}

impl<K: Clone, V: Clone> Clone for MultiKeyMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            unit: self.unit.clone(),
            by_arity: self.by_arity.clone(),
            arity: self.arity,
            len: self.len,
        }
    }
}

impl<K, V> fmt::Debug for MultiKeyMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arities: Vec<usize> = self.by_arity.keys().copied().collect();
        if self.unit.is_some() {
            arities.push(0);
        }
        arities.sort_unstable();
        f.debug_struct("MultiKeyMap")
            .field("len", &self.len)
            .field("arities", &arities)
            .field("fixed_arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl<K, V> MultiKeyMap<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty map accepting keys of any arity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map that only accepts keys with `arity` components.
    ///
    /// Inserting or looking up a key of another arity fails with
    /// [`ArityMismatch`].
    #[must_use]
    pub fn with_arity(arity: usize) -> Self {
        Self {
            arity: Some(arity),
            ..Self::default()
        }
    }

    /// Returns the fixed arity, if any.
    #[must_use]
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Returns the number of stored tuples.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no tuple is stored.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` under exactly `key`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`ArityMismatch`] if the map has a fixed arity and `key` does
    /// not have it. The map is left unchanged.
    pub fn insert(&mut self, key: &TupleKey<K>, value: V) -> Result<Option<V>, ArityMismatch> {
        self.check_arity(key)?;
        let previous = match key.components().split_last() {
            None => self.unit.replace(value),
            Some((last, init)) => {
                let mut level = self.by_arity.entry(init.len() + 1).or_insert_with(Level::new);
                for component in init {
                    level = level
                        .children
                        .entry(component.identity().clone())
                        .or_insert_with(Level::new);
                }
                level.leaves.insert(last.identity().clone(), value)
            }
        };
        if previous.is_none() {
            self.len += 1;
        }
        debug_event!(
            arity = key.arity(),
            replaced = previous.is_some(),
            entries = self.len,
            "registered multi-key entry"
        );
        Ok(previous)
    }

    /// Returns the value stored under exactly `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ArityMismatch`] if the map has a fixed arity that `key` does
    /// not have.
    pub fn get_exact(&self, key: &TupleKey<K>) -> Result<Option<&V>, ArityMismatch> {
        self.check_arity(key)?;
        Ok(self.exact_unchecked(key))
    }

    /// Returns the value of the highest-priority stored tuple matching `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MultiLookupError::Arity`] if the map has a fixed arity that
    /// `key` does not have, and [`MultiLookupError::NotFound`] if no stored
    /// tuple matches.
    pub fn get(&self, key: &TupleKey<K>) -> Result<&V, MultiLookupError<K>> {
        self.matches(key)?.next().ok_or_else(|| {
            MultiLookupError::NotFound(KeyNotFound { key: key.clone() })
        })
    }

    /// Like [`get`](Self::get), but answers `default` when nothing matches or
    /// the arity is wrong.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &TupleKey<K>, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// Returns every stored value matching `key`, in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`ArityMismatch`] if the map has a fixed arity that `key` does
    /// not have.
    pub fn all(&self, key: &TupleKey<K>) -> Result<Vec<&V>, ArityMismatch> {
        Ok(self.matches(key)?.collect())
    }

    /// Iterates the stored values matching `key`, in priority order.
    ///
    /// This visits the same tuples as [`TupleKey::ancestors`], but skips every
    /// tuple whose leading components already have no stored entry.
    ///
    /// # Errors
    ///
    /// Returns [`ArityMismatch`] if the map has a fixed arity that `key` does
    /// not have.
    pub fn matches<'m, 'k>(
        &'m self,
        key: &'k TupleKey<K>,
    ) -> Result<Matches<'m, 'k, K, V>, ArityMismatch> {
        self.check_arity(key)?;
        let components = key.components();
        let mut matches = Matches {
            components,
            unit: None,
            stack: SmallVec::new(),
            pending: false,
        };
        if components.is_empty() {
            matches.unit = self.unit.as_ref();
        } else if let Some(level) = self.by_arity.get(&components.len()) {
            matches.stack.push(Frame { level, choice: 0 });
        }
        Ok(matches)
    }

    /// Returns the stored tuple that [`get`](Self::get) answers with.
    ///
    /// # Errors
    ///
    /// Returns [`ArityMismatch`] if the map has a fixed arity that `key` does
    /// not have.
    pub fn matching_key(&self, key: &TupleKey<K>) -> Result<Option<TupleKey<K>>, ArityMismatch> {
        let mut matches = self.matches(key)?;
        Ok(matches.next().map(|_| matches.current_key()))
    }

    /// Like [`get`](Self::get), reporting each probed ancestor tuple to
    /// `trace`.
    ///
    /// Unlike [`matches`](Self::matches) this probes every ancestor tuple in
    /// turn, so the trace shows the complete priority order up to the answer.
    ///
    /// # Errors
    ///
    /// Returns [`ArityMismatch`] if the map has a fixed arity that `key` does
    /// not have. Nothing is reported to `trace` in that case.
    pub fn get_with_trace<T>(
        &self,
        key: &TupleKey<K>,
        trace: &mut T,
    ) -> Result<Option<&V>, ArityMismatch>
    where
        T: ResolveTrace<TupleKey<K>> + ?Sized,
    {
        self.check_arity(key)?;
        for candidate in key.ancestors() {
            let found = self.exact_unchecked(&candidate);
            trace.probe(&candidate, found.is_some());
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Freezes the map into a shareable read-only snapshot.
    #[must_use]
    pub fn freeze(self) -> Frozen<Self> {
        Frozen::new(self)
    }

    /// Exact lookup by arity bucket; a key of an unstored arity finds nothing.
    fn exact_unchecked(&self, key: &TupleKey<K>) -> Option<&V> {
        match key.components().split_last() {
            None => self.unit.as_ref(),
            Some((last, init)) => {
                let mut level = self.by_arity.get(&(init.len() + 1))?;
                for component in init {
                    level = level.children.get(component.identity())?;
                }
                level.leaves.get(last.identity())
            }
        }
    }

    fn check_arity(&self, key: &TupleKey<K>) -> Result<(), ArityMismatch> {
        match self.arity {
            Some(expected) if expected != key.arity() => Err(ArityMismatch {
                expected,
                found: key.arity(),
            }),
            _ => Ok(()),
        }
    }
}

/// Keys of the wrong arity for a fixed-arity map resolve to `None` here; use
/// the inherent methods to tell them apart from a miss.
impl<K, V> Resolve for MultiKeyMap<K, V>
where
    K: Clone + Eq + Hash,
{
    type Key = TupleKey<K>;
    type Value = V;

    fn exact(&self, key: &TupleKey<K>) -> Option<&V> {
        self.get_exact(key).ok().flatten()
    }

    fn matching_key(&self, key: &TupleKey<K>) -> Option<TupleKey<K>> {
        Self::matching_key(self, key).ok().flatten()
    }

    fn resolve(&self, key: &TupleKey<K>) -> Option<&V> {
        self.get(key).ok()
    }
}

struct Frame<'m, K, V> {
    level: &'m Level<K, V>,
    /// Index into the ancestors of the component at this depth.
    choice: usize,
}

/// Iterator over the stored values matching a tuple key, in priority order.
///
/// Returned by [`MultiKeyMap::matches`]. The walk is a depth-first search over
/// the nested levels with an explicit stack, so high arities do not deepen the
/// call stack.
pub struct Matches<'m, 'k, K, V> {
    components: &'k [KeyNode<K>],
    unit: Option<&'m V>,
    stack: SmallVec<[Frame<'m, K, V>; 4]>,
    /// The last frame's choice produced the previous item and still has to be
    /// stepped past.
    pending: bool,
}

impl<K, V> Matches<'_, '_, K, V>
where
    K: Clone,
{
    /// Rebuilds the tuple of the most recent hit from the stack choices.
    fn current_key(&self) -> TupleKey<K> {
        TupleKey::new(
            self.components
                .iter()
                .zip(&self.stack)
                .filter_map(|(component, frame)| component.ancestor(frame.choice).cloned()),
        )
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Matches<'_, '_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let choices: SmallVec<[usize; 4]> = self.stack.iter().map(|frame| frame.choice).collect();
        f.debug_struct("Matches")
            .field("arity", &self.components.len())
            .field("choices", &choices)
            .finish_non_exhaustive()
    }
}

impl<'m, K, V> Iterator for Matches<'m, '_, K, V>
where
    K: Eq + Hash,
{
    type Item = &'m V;

    fn next(&mut self) -> Option<&'m V> {
        if let Some(value) = self.unit.take() {
            return Some(value);
        }
        let components = self.components;
        if self.pending {
            self.pending = false;
            if let Some(frame) = self.stack.last_mut() {
                frame.choice += 1;
            }
        }
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let frame = self.stack.last_mut()?;
            let level = frame.level;
            let Some(candidate) = components[depth].ancestor(frame.choice) else {
                // This level is exhausted: step the parent level past its choice.
                self.stack.pop();
                if let Some(parent) = self.stack.last_mut() {
                    parent.choice += 1;
                }
                continue;
            };
            if depth + 1 == components.len() {
                if let Some(value) = level.leaves.get(candidate.identity()) {
                    self.pending = true;
                    return Some(value);
                }
                frame.choice += 1;
            } else if let Some(child) = level.children.get(candidate.identity()) {
                self.stack.push(Frame {
                    level: child,
                    choice: 0,
                });
            } else {
                frame.choice += 1;
            }
        }
    }
}

impl<K: Eq + Hash, V> FusedIterator for Matches<'_, '_, K, V> {}
