// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Dispatch: maps whose keys live in a specialization DAG.
//!
//! An ordinary map treats keys as unrelated atoms. The maps in this crate
//! know that keys specialize each other: a key may have any number of more
//! general parents, and a lookup that finds no entry for a key falls back to
//! the most specific ancestor that has one. This is the core of polymorphic
//! dispatch (generic functions, multi-methods, pluggable component
//! registries) without hand-written fallback chains.
//!
//! - **Key nodes** ([`KeyNode`]): an identity plus its parents. Each node
//!   computes a single, deterministic ancestor order (a C3 linearization)
//!   when it is created; construction fails with [`LinearizationError`] if
//!   the parents contradict each other.
//! - **Single-key maps** ([`DagMap`]): exact storage plus fallback lookup
//!   along a node's ancestors.
//! - **Tuple keys** ([`TupleKey`]): several nodes forming one composite key.
//!   Their ancestors are the cross product of each component's ancestors,
//!   first component most significant ([`AncestorTuples`]).
//! - **Multi-key maps** ([`MultiKeyMap`]): storage for tuple keys with the same
//!   fallback rules.
//! - **Reverse index** ([`ReverseIndex`]): from any node to the registered key
//!   that claimed it.
//! - **Hierarchies** ([`Hierarchy`]): defines nodes by identity, for embedders
//!   replaying another system's "is a kind of" edges.
//! - **Snapshots** ([`Frozen`]): read-only, shareable maps once registration
//!   is over, with an optional memoizing reader (`CachedResolver`, `std`
//!   feature).
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_dispatch::{DagMap, KeyNode, MultiKeyMap, TupleKey};
//!
//! let shape = KeyNode::root("shape");
//! let polygon = KeyNode::new("polygon", [shape.clone()]).unwrap();
//! let square = KeyNode::new("square", [polygon.clone()]).unwrap();
//! let circle = KeyNode::new("circle", [shape.clone()]).unwrap();
//!
//! // Single dispatch.
//! let mut name = DagMap::new();
//! name.insert(&shape, "some shape");
//! name.insert(&polygon, "a polygon");
//! assert_eq!(name.get(&square), Ok(&"a polygon"));
//! assert_eq!(name.get(&circle), Ok(&"some shape"));
//!
//! // Double dispatch.
//! let mut collide = MultiKeyMap::new();
//! collide
//!     .insert(&TupleKey::new([shape.clone(), shape.clone()]), "bounding boxes")
//!     .unwrap();
//! collide
//!     .insert(&TupleKey::new([polygon.clone(), circle.clone()]), "polygon vs circle")
//!     .unwrap();
//!
//! let key = TupleKey::new([square.clone(), circle.clone()]);
//! assert_eq!(collide.get(&key), Ok(&"polygon vs circle"));
//! let key = TupleKey::new([circle.clone(), square.clone()]);
//! assert_eq!(collide.get(&key), Ok(&"bounding boxes"));
//! ```
//!
//! ## Ancestor Order
//!
//! A node's ancestors start with the node itself and end with its most
//! general ancestor. Every ancestor appears once, after all of its
//! descendants, and the order agrees with each parent's own order and with the
//! order the parents were declared in. Building the same DAG twice, declaring
//! parents in the same order, always yields the same ancestors.
//!
//! The crate does not check that parent edges are acyclic; nodes are built
//! bottom-up from existing parents, which already rules out most cycles.
//!
//! ## Registration and Freezing
//!
//! Maps are meant to be filled during a registration phase, then frozen:
//!
//! ```rust
//! use understory_dispatch::{DagMap, KeyNode, Resolve};
//!
//! let base = KeyNode::root(0_u32);
//! let derived = KeyNode::new(1_u32, [base.clone()]).unwrap();
//!
//! let mut map = DagMap::new();
//! map.insert(&base, "base");
//! let frozen = map.freeze();
//!
//! // `Frozen` is `Send + Sync` and cheap to clone.
//! assert_eq!(frozen.resolve(&derived), Some(&"base"));
//! ```
//!
//! Memoizing lookups is only sound on a frozen snapshot, so the
//! `CachedResolver` is created from one (`Frozen::cached`).
//!
//! ## Explaining Lookups
//!
//! `get_with_trace` on [`DagMap`] and [`MultiKeyMap`] reports every probed
//! candidate to a [`ResolveTrace`](trace::ResolveTrace) sink; see [`trace`].
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. The default `std` feature only
//! adds `CachedResolver`.
//!
//! ## Features
//!
//! - `std` (default): enables `CachedResolver` (via `parking_lot`).
//! - `tracing`: emits `tracing` events when entries are registered, nodes
//!   are defined, or a node cannot be linearized.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
mod cache;
mod error;
mod frozen;
mod hierarchy;
mod linearize;
mod macros;
mod map;
mod multi;
mod node;
mod reverse;
pub mod trace;
mod tuple;

#[cfg(feature = "std")]
pub use cache::CachedResolver;
pub use error::{ArityMismatch, DefineError, KeyNotFound, MultiLookupError};
pub use frozen::{Frozen, Resolve};
pub use hierarchy::Hierarchy;
pub use linearize::LinearizationError;
pub use map::{All, DagMap};
pub use multi::{Matches, MultiKeyMap};
pub use node::{Ancestors, KeyNode};
pub use reverse::ReverseIndex;
pub use tuple::{AncestorTuples, NonEmptyKey, TupleKey};
