// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registration events, forwarded to `tracing` when that feature is enabled.
//!
//! With the feature off the macros expand to nothing, so event arguments are
//! never evaluated.

macro_rules! debug_event {
    ($($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::debug!($($arg)+);
        }
    }};
}

macro_rules! warn_event {
    ($($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::warn!($($arg)+);
        }
    }};
}

pub(crate) use debug_event;
pub(crate) use warn_event;
