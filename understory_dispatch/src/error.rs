// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lookup and registration errors.

use core::fmt;

use crate::linearize::LinearizationError;
use crate::tuple::TupleKey;

/// Error returned when neither a key nor any of its ancestors has an entry.
///
/// `Q` is the key that was looked up: a [`KeyNode`](crate::KeyNode) for
/// single-key lookups or a [`TupleKey`] for multi-key lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyNotFound<Q> {
    /// The key that was looked up.
    pub key: Q,
}

impl<Q: fmt::Debug> fmt::Display for KeyNotFound<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no entry for {:?} or any of its ancestors", self.key)
    }
}

impl<Q: fmt::Debug> core::error::Error for KeyNotFound<Q> {}

/// Error returned when a tuple key does not have the arity a
/// [`MultiKeyMap`](crate::MultiKeyMap) was created for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArityMismatch {
    /// The arity the map accepts.
    pub expected: usize,
    /// The arity of the offending key.
    pub found: usize,
}

impl fmt::Display for ArityMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tuple key has {} components, map expects {}",
            self.found, self.expected
        )
    }
}

impl core::error::Error for ArityMismatch {}

/// Error returned by [`MultiKeyMap::get`](crate::MultiKeyMap::get).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultiLookupError<K> {
    /// No registered tuple matches the key or any of its ancestor tuples.
    NotFound(KeyNotFound<TupleKey<K>>),
    /// The key's arity is not the one the map was created for.
    Arity(ArityMismatch),
}

impl<K: fmt::Debug> fmt::Display for MultiLookupError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(err) => fmt::Display::fmt(err, f),
            Self::Arity(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<K: fmt::Debug> core::error::Error for MultiLookupError<K> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Arity(err) => Some(err),
        }
    }
}

impl<K> From<ArityMismatch> for MultiLookupError<K> {
    fn from(err: ArityMismatch) -> Self {
        Self::Arity(err)
    }
}

/// Error returned by [`Hierarchy::define`](crate::Hierarchy::define).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DefineError<K> {
    /// A parent identity has not been defined yet.
    UnknownParent {
        /// The node being defined.
        node: K,
        /// The parent identity that was not found.
        parent: K,
    },
    /// The identity is already defined.
    AlreadyDefined(K),
    /// The parents admit no consistent ancestor order.
    Linearization(LinearizationError<K>),
}

impl<K: fmt::Debug> fmt::Display for DefineError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParent { node, parent } => {
                write!(f, "parent {parent:?} of {node:?} is not defined")
            }
            Self::AlreadyDefined(node) => write!(f, "{node:?} is already defined"),
            Self::Linearization(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<K: fmt::Debug + 'static> core::error::Error for DefineError<K> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Linearization(err) => Some(err),
            _ => None,
        }
    }
}

impl<K> From<LinearizationError<K>> for DefineError<K> {
    fn from(err: LinearizationError<K>) -> Self {
        Self::Linearization(err)
    }
}
