// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_dispatch::{DagMap, KeyNode, MultiKeyMap, ReverseIndex, TupleKey};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

/// Builds `n` nodes where node `i` has up to `parents_per_node` parents among
/// `0..i`. Parent lists that cannot be linearized fall back to their first
/// parent.
fn build_dag(n: u32, parents_per_node: u32, seed: u64) -> Vec<KeyNode<u32>> {
    let mut rng = Lcg::new(seed);
    let mut nodes: Vec<KeyNode<u32>> = Vec::with_capacity(n as usize);
    for id in 0..n {
        if id == 0 {
            nodes.push(KeyNode::root(0));
            continue;
        }
        let mut parents: Vec<KeyNode<u32>> = Vec::new();
        for _ in 0..parents_per_node.min(id) {
            // Bias towards recent nodes so chains get deep.
            let back = rng.gen_range_usize(id.min(16) as usize) + 1;
            let parent = &nodes[id as usize - back];
            if !parents.contains(parent) {
                parents.push(parent.clone());
            }
        }
        let node = match KeyNode::new(id, parents.iter().cloned()) {
            Ok(node) => node,
            Err(_) => KeyNode::new(id, parents.into_iter().take(1)).unwrap(),
        };
        nodes.push(node);
    }
    nodes
}

fn bench_linearize(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_dispatch/linearize");
    group.sample_size(50);

    for &(n, parents_per_node) in &[(256_u32, 1_u32), (256_u32, 3_u32), (2_048_u32, 3_u32)] {
        group.bench_function(format!("build_dag(n={n},p={parents_per_node})"), |b| {
            b.iter(|| black_box(build_dag(n, parents_per_node, 0xD15A_0000_0000_0001)));
        });
    }

    group.finish();
}

fn bench_single_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_dispatch/single_key");
    group.sample_size(50);

    for &(n, parents_per_node) in &[(256_u32, 1_u32), (2_048_u32, 3_u32)] {
        let nodes = build_dag(n, parents_per_node, 0xD15A_0000_0000_0002);
        let mut map = DagMap::new();
        // Register only the root and every 64th node so most lookups fall back.
        for node in nodes.iter().step_by(64) {
            map.insert(node, *node.identity());
        }

        group.bench_function(format!("get_fallback(n={n},p={parents_per_node})"), |b| {
            b.iter(|| {
                let sum: u64 = nodes
                    .iter()
                    .filter_map(|node| map.get(node).ok())
                    .fold(0_u64, |acc, &v| acc + u64::from(v));
                black_box(sum);
            });
        });

        let frozen = map.clone().freeze();
        group.bench_function(format!("cached_get(n={n},p={parents_per_node})"), |b| {
            b.iter_batched(
                || frozen.cached(),
                |cache| {
                    for _ in 0..4 {
                        for node in &nodes {
                            black_box(cache.get(node));
                        }
                    }
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(
            format!("reverse_index_insert(n={n},p={parents_per_node})"),
            |b| {
                b.iter(|| {
                    let mut index = ReverseIndex::new();
                    for node in nodes.iter().rev().step_by(16) {
                        index.insert(node, *node.identity());
                    }
                    black_box(index);
                });
            },
        );
    }

    group.finish();
}

fn bench_multi_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_dispatch/multi_key");
    group.sample_size(50);

    let nodes = build_dag(512, 2, 0xD15A_0000_0000_0003);
    let mut rng = Lcg::new(0xD15A_0000_0000_0004);

    for arity in [2_usize, 3] {
        let mut map = MultiKeyMap::with_arity(arity);
        for value in 0..256_u32 {
            // Registered tuples come from the oldest eighth of the DAG, where
            // nodes are general enough to be reached by many lookups.
            let key: TupleKey<u32> = (0..arity)
                .map(|_| nodes[rng.gen_range_usize(nodes.len() / 8)].clone())
                .collect();
            map.insert(&key, value).unwrap();
        }
        let lookups: Vec<TupleKey<u32>> = (0..64)
            .map(|_| {
                (0..arity)
                    .map(|_| nodes[rng.gen_range_usize(nodes.len())].clone())
                    .collect()
            })
            .collect();

        group.bench_function(format!("get_pruned(arity={arity})"), |b| {
            b.iter(|| {
                for key in &lookups {
                    black_box(map.get(key).ok());
                }
            });
        });

        group.bench_function(format!("get_enumerated(arity={arity})"), |b| {
            b.iter(|| {
                for key in &lookups {
                    black_box(key.ancestors().find_map(|candidate| {
                        map.get_exact(&candidate).ok().flatten().copied()
                    }));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_linearize, bench_single_key, bench_multi_key);
criterion_main!(benches);
