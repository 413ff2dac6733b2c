// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explainability helpers for fallback lookups.
//!
//! A fallback lookup answers with the value of the most specific registered
//! ancestor, which can be surprising when the DAG is wide. The maps do not
//! record how they got to an answer. Instead, the `get_with_trace` methods
//! report every candidate they probe to a [`ResolveTrace`] sink.
//!
//! [`ProbeRecorder`] is the small built-in sink: it keeps the probe sequence so
//! callers can ask which candidates were tried, in which order, and which one
//! answered.
//!
//! ## Example
//!
//! ```rust
//! use understory_dispatch::{DagMap, KeyNode, trace::ProbeRecorder};
//!
//! let shape = KeyNode::root("shape");
//! let polygon = KeyNode::new("polygon", [shape.clone()]).unwrap();
//! let square = KeyNode::new("square", [polygon.clone()]).unwrap();
//!
//! let mut area = DagMap::new();
//! area.insert(&shape, "unknown");
//!
//! let mut rec = ProbeRecorder::new();
//! assert_eq!(area.get_with_trace(&square, &mut rec), Some(&"unknown"));
//! assert_eq!(rec.misses(), 2);
//! assert_eq!(rec.resolved(), Some(&shape));
//! ```

use alloc::vec::Vec;

/// A callback sink for fallback lookup tracing.
///
/// See [`DagMap::get_with_trace`](crate::DagMap::get_with_trace) and
/// [`MultiKeyMap::get_with_trace`](crate::MultiKeyMap::get_with_trace).
pub trait ResolveTrace<Q> {
    /// Called for each candidate key, in probe order.
    ///
    /// `hit` is `true` when the candidate has an exact entry. The first hit
    /// ends the lookup.
    fn probe(&mut self, candidate: &Q, hit: bool);
}

/// Records every probe of a lookup.
#[derive(Clone, Debug)]
pub struct ProbeRecorder<Q> {
    probes: Vec<(Q, bool)>,
}

impl<Q> Default for ProbeRecorder<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q> ProbeRecorder<Q> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self { probes: Vec::new() }
    }

    /// Clears all recorded probes.
    pub fn clear(&mut self) {
        self.probes.clear();
    }

    /// Returns the recorded probes, in order, with their hit flag.
    #[must_use]
    pub fn probes(&self) -> &[(Q, bool)] {
        &self.probes
    }

    /// Returns the first candidate that had an entry.
    #[must_use]
    pub fn resolved(&self) -> Option<&Q> {
        self.probes.iter().find(|(_, hit)| *hit).map(|(q, _)| q)
    }

    /// Returns how many candidates were probed without an entry.
    #[must_use]
    pub fn misses(&self) -> usize {
        self.probes.iter().filter(|(_, hit)| !hit).count()
    }
}

impl<Q: Clone> ResolveTrace<Q> for ProbeRecorder<Q> {
    fn probe(&mut self, candidate: &Q, hit: bool) {
        self.probes.push((candidate.clone(), hit));
    }
}
