// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consistent linearization of a node's ancestors (C3 merge).

use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::node::KeyNode;

/// Error returned when a node's parents admit no consistent ancestor order.
///
/// This happens when two parents disagree on the relative order of ancestors
/// they share, when a parent is listed twice, or when the node being built
/// already appears among its parents' ancestors.
#[derive(Clone, PartialEq, Eq)]
pub struct LinearizationError<K> {
    /// Identity of the node that could not be constructed.
    pub node: K,
    /// Identities at the head of every sequence still pending when the merge
    /// stalled. None of them could be placed next without contradicting
    /// another sequence.
    pub conflicts: Vec<K>,
}

impl<K: fmt::Debug> fmt::Debug for LinearizationError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LinearizationError {{ node: {:?}, conflicts: {:?} }}",
            self.node, self.conflicts
        )
    }
}

impl<K: fmt::Debug> fmt::Display for LinearizationError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot linearize ancestors of {:?}: inconsistent precedence among {:?}",
            self.node, self.conflicts
        )
    }
}

impl<K: fmt::Debug> core::error::Error for LinearizationError<K> {}

/// Computes the strict ancestors of a node with `identity` and `parents`.
///
/// The merge runs over each parent's own linearization followed by the parent
/// list itself. At every step the first pending head that does not occur in
/// the tail of any sequence is emitted and popped from every sequence it
/// heads. Tail membership is tracked with occurrence counts, so each step
/// costs one pass over the sequence heads.
///
/// The returned list excludes the node itself; callers prepend it.
pub(crate) fn linearize<K>(
    identity: &K,
    parents: &[KeyNode<K>],
) -> Result<Vec<KeyNode<K>>, LinearizationError<K>>
where
    K: Clone + Eq + Hash,
{
    match parents {
        [] => return Ok(Vec::new()),
        // A single parent's own order is already consistent.
        [only] if only.ancestors().all(|a| a.identity() != identity) => {
            return Ok(only.ancestors().cloned().collect());
        }
        _ => {}
    }

    let mut sequences: Vec<Vec<&KeyNode<K>>> = parents
        .iter()
        .map(|parent| parent.ancestors().collect())
        .collect();
    sequences.push(parents.iter().collect());

    // A node that is already its own ancestor would be a cycle.
    if sequences.iter().flatten().any(|n| n.identity() == identity) {
        return Err(LinearizationError {
            node: identity.clone(),
            conflicts: Vec::from([identity.clone()]),
        });
    }

    let mut in_tail: HashMap<&K, usize> = HashMap::new();
    for sequence in &sequences {
        for node in sequence.iter().skip(1) {
            *in_tail.entry(node.identity()).or_default() += 1;
        }
    }

    let mut heads = alloc::vec![0_usize; sequences.len()];
    let capacity = sequences.iter().map(Vec::len).max().unwrap_or(0);
    let mut out: Vec<KeyNode<K>> = Vec::with_capacity(capacity);

    loop {
        let mut pending = sequences
            .iter()
            .zip(&heads)
            .filter_map(|(sequence, &head)| sequence.get(head).copied())
            .peekable();
        if pending.peek().is_none() {
            return Ok(out);
        }
        let Some(next) = pending.find(|n| !in_tail.contains_key(n.identity())) else {
            return Err(stalled(identity, &sequences, &heads));
        };

        for (sequence, head) in sequences.iter().zip(heads.iter_mut()) {
            if sequence.get(*head).is_some_and(|n| *n == next) {
                *head += 1;
                if let Some(new_head) = sequence.get(*head) {
                    if let Entry::Occupied(mut e) = in_tail.entry(new_head.identity()) {
                        *e.get_mut() -= 1;
                        if *e.get() == 0 {
                            e.remove();
                        }
                    }
                }
            }
        }
        out.push(next.clone());
    }
}

fn stalled<K>(identity: &K, sequences: &[Vec<&KeyNode<K>>], heads: &[usize]) -> LinearizationError<K>
where
    K: Clone + Eq,
{
    let mut conflicts: Vec<K> = Vec::new();
    for (sequence, &head) in sequences.iter().zip(heads) {
        if let Some(node) = sequence.get(head) {
            if !conflicts.contains(node.identity()) {
                conflicts.push(node.identity().clone());
            }
        }
    }
    LinearizationError {
        node: identity.clone(),
        conflicts,
    }
}
