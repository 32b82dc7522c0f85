// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Clock trait - monotonic time source for vblank scheduling
//!
//! The vblank timer arms its deadlines and stamps its vblank events from a
//! clock injected at device construction, never from a global.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source used to schedule and re-arm the vblank timer.
///
/// ## Design
///
/// - **Monotonic**: `now()` never goes backwards
/// - **Thread-safe**: queried from the timer thread and from commit threads
/// - **Passive**: the clock never calls into the timer
pub trait MonotonicClock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Instant the clock considers its epoch (clock creation).
    fn epoch(&self) -> Instant;

    /// Time elapsed since the epoch in nanoseconds.
    ///
    /// Vblank timestamps are reported on this scale.
    fn now_ns(&self) -> u64 {
        self.ns_since_epoch(self.now())
    }

    /// Convert an instant taken from this clock into nanoseconds since its epoch.
    fn ns_since_epoch(&self, instant: Instant) -> u64 {
        instant
            .saturating_duration_since(self.epoch())
            .as_nanos()
            .min(u128::from(u64::MAX)) as u64
    }

    /// Time elapsed since the epoch (convenience).
    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.now_ns())
    }

    /// Human-readable clock description, used in logs.
    fn description(&self) -> &str;
}

/// Type alias for a shared clock reference.
pub type SharedClock = Arc<dyn MonotonicClock>;
