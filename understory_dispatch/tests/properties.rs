// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests over randomly generated DAGs.
//!
//! Each DAG is built bottom-up: node `i` picks its parents among nodes
//! `0..i`, so parent edges can never form a cycle. Parent lists that admit
//! no consistent order are rejected by `KeyNode::new`; those nodes are simply
//! left out of the DAG.

use std::collections::HashSet;

use proptest::prelude::*;
use proptest::sample::Index;
use understory_dispatch::{DagMap, KeyNode, MultiKeyMap, TupleKey};

type Node = KeyNode<u32>;

/// Parent picks per node; at most four parents each.
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<Index>>> {
    prop::collection::vec(prop::collection::vec(any::<Index>(), 0..4), 1..24)
}

fn build_dag(picks: &[Vec<Index>]) -> Vec<Option<Node>> {
    let mut nodes: Vec<Option<Node>> = Vec::with_capacity(picks.len());
    for (i, parent_picks) in picks.iter().enumerate() {
        let identity = u32::try_from(i).unwrap();
        let mut seen = HashSet::new();
        let parents: Vec<Node> = if i == 0 {
            Vec::new()
        } else {
            parent_picks
                .iter()
                .map(|pick| pick.index(i))
                .filter(|&p| seen.insert(p))
                .filter_map(|p| nodes[p].clone())
                .collect()
        };
        nodes.push(KeyNode::new(identity, parents).ok());
    }
    nodes
}

fn position(order: &[u32], id: u32) -> Option<usize> {
    order.iter().position(|&x| x == id)
}

fn identities(node: &Node) -> Vec<u32> {
    node.ancestors().map(|a| *a.identity()).collect()
}

proptest! {
    #[test]
    fn ancestors_are_a_linearization(picks in dag_strategy()) {
        let nodes = build_dag(&picks);
        for node in nodes.iter().flatten() {
            let order = identities(node);

            prop_assert_eq!(order[0], *node.identity());
            let unique: HashSet<u32> = order.iter().copied().collect();
            prop_assert_eq!(unique.len(), order.len());

            // Exactly the node plus everything its parents reach.
            let mut expected: HashSet<u32> = HashSet::new();
            expected.insert(*node.identity());
            for parent in node.parents() {
                expected.extend(identities(parent));
            }
            prop_assert_eq!(&unique, &expected);

            // Local precedence: parents in declaration order.
            let parent_positions: Vec<usize> = node
                .parents()
                .iter()
                .filter_map(|p| position(&order, *p.identity()))
                .collect();
            prop_assert_eq!(parent_positions.len(), node.parents().len());
            prop_assert!(parent_positions.windows(2).all(|w| w[0] < w[1]));

            // Monotonicity: each parent's order is kept.
            for parent in node.parents() {
                let kept: Vec<usize> = identities(parent)
                    .into_iter()
                    .filter_map(|id| position(&order, id))
                    .collect();
                prop_assert!(kept[0] > 0);
                prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
            }

            // Every ancestor comes before its own ancestors.
            for (i, ancestor) in node.ancestors().enumerate() {
                for above in ancestor.ancestors().skip(1) {
                    let j = position(&order, *above.identity());
                    prop_assert!(j.is_some_and(|j| j > i));
                }
                prop_assert!(node.descends_from(ancestor));
            }
        }
    }

    #[test]
    fn linearization_is_deterministic(picks in dag_strategy()) {
        let first = build_dag(&picks);
        let second = build_dag(&picks);
        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(a.as_ref().map(identities), b.as_ref().map(identities));
        }
    }

    #[test]
    fn single_key_lookup_takes_first_registered_ancestor(
        picks in dag_strategy(),
        registered in prop::collection::vec(any::<Index>(), 0..8),
    ) {
        let nodes: Vec<Node> = build_dag(&picks).into_iter().flatten().collect();
        let mut map = DagMap::new();
        for pick in &registered {
            let key = &nodes[pick.index(nodes.len())];
            map.insert(key, *key.identity());
        }
        for node in &nodes {
            let expected = node
                .ancestors()
                .find(|a| map.contains_exact(a))
                .map(|a| *a.identity());
            prop_assert_eq!(map.get(node).ok().copied(), expected);
            prop_assert_eq!(map.matching_key(node).map(|k| *k.identity()), expected);
        }
    }

    #[test]
    fn pruned_multi_key_walk_matches_enumeration(
        picks in dag_strategy(),
        registered in prop::collection::vec((any::<Index>(), any::<Index>()), 0..12),
        lookups in prop::collection::vec((any::<Index>(), any::<Index>()), 1..8),
    ) {
        let nodes: Vec<Node> = build_dag(&picks).into_iter().flatten().collect();
        let tuple = |(a, b): &(Index, Index)| {
            TupleKey::new([
                nodes[a.index(nodes.len())].clone(),
                nodes[b.index(nodes.len())].clone(),
            ])
        };

        let mut map = MultiKeyMap::with_arity(2);
        for (n, pick) in registered.iter().enumerate() {
            map.insert(&tuple(pick), n).unwrap();
        }
        for lookup in &lookups {
            let key = tuple(lookup);
            let ancestors: Vec<TupleKey<u32>> = key.ancestors().collect();
            prop_assert_eq!(
                ancestors.len(),
                key.components().iter().map(Node::ancestor_count).product::<usize>()
            );
            prop_assert_eq!(&ancestors[0], &key);

            let literal: Vec<&usize> = ancestors
                .iter()
                .filter_map(|candidate| map.get_exact(candidate).unwrap())
                .collect();
            prop_assert_eq!(map.all(&key), Ok(literal.clone()));
            prop_assert_eq!(map.get(&key).ok(), literal.first().copied());

            let matched = ancestors
                .iter()
                .find(|c| matches!(map.get_exact(c), Ok(Some(_))));
            let found = map.matching_key(&key).unwrap();
            prop_assert_eq!(found.as_ref(), matched);
        }
    }
}
