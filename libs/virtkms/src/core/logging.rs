// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events. Hosts that have no subscriber of
//! their own can call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "virtkms=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (default [`DEFAULT_FILTER`]).
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one is kept.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
