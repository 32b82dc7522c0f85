// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Vblank counting.
//!
//! [`VblankCounter`] is the boundary the timer reports to: "vsync occurred for
//! CRTC X". [`VblankTracker`] is the in-crate implementation keeping the
//! authoritative sequence number and a bounded timestamp history.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::core::clocks::SharedClock;
use crate::core::pipeline::ObjectId;

/// A vblank sequence number paired with its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VblankStamp {
    /// Number of vblanks since the tracker was created. Zero before the first.
    pub sequence: u64,
    /// Nanoseconds since the clock epoch.
    pub timestamp_ns: u64,
}

/// Vblank counting interface.
pub trait VblankCounter: Send + Sync {
    /// Record a vblank on `crtc` and return its stamp.
    ///
    /// Runs while the CRTC's event slot is locked; implementations must not
    /// submit commits from here.
    fn handle_vblank(&self, crtc: ObjectId, timestamp: Instant) -> VblankStamp;

    /// Most recent stamp for `crtc`, or the zero stamp stamped "now" if none.
    fn last_vblank(&self, crtc: ObjectId) -> VblankStamp;
}

struct TrackerState {
    crtc: Option<ObjectId>,
    last: VblankStamp,
    history: VecDeque<VblankStamp>,
}

/// Counter plus timestamp history for a single CRTC.
pub struct VblankTracker {
    clock: SharedClock,
    history_depth: usize,
    state: Mutex<TrackerState>,
    advanced: Condvar,
}

impl VblankTracker {
    pub fn new(clock: SharedClock, history_depth: usize) -> Self {
        Self {
            clock,
            history_depth: history_depth.max(1),
            state: Mutex::new(TrackerState {
                crtc: None,
                last: VblankStamp::default(),
                history: VecDeque::new(),
            }),
            advanced: Condvar::new(),
        }
    }

    /// Current sequence number.
    pub fn sequence(&self) -> u64 {
        self.state.lock().last.sequence
    }

    /// Recorded stamps, oldest first.
    pub fn history(&self) -> Vec<VblankStamp> {
        self.state.lock().history.iter().copied().collect()
    }

    /// Block until the sequence reaches `target` or `timeout` elapses.
    ///
    /// Returns the stamp that satisfied the wait.
    pub fn wait_for_sequence(&self, target: u64, timeout: Duration) -> Option<VblankStamp> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.last.sequence < target {
            if self.advanced.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        (state.last.sequence >= target).then_some(state.last)
    }
}

impl VblankCounter for VblankTracker {
    fn handle_vblank(&self, crtc: ObjectId, timestamp: Instant) -> VblankStamp {
        let stamp = {
            let mut state = self.state.lock();
            if let Some(previous) = state.crtc.replace(crtc) {
                debug_assert_eq!(previous, crtc, "VblankTracker serves a single CRTC");
            }
            let stamp = VblankStamp {
                sequence: state.last.sequence + 1,
                timestamp_ns: self.clock.ns_since_epoch(timestamp),
            };
            state.last = stamp;
            if state.history.len() == self.history_depth {
                state.history.pop_front();
            }
            state.history.push_back(stamp);
            stamp
        };
        self.advanced.notify_all();
        stamp
    }

    fn last_vblank(&self, _crtc: ObjectId) -> VblankStamp {
        let last = self.state.lock().last;
        if last.sequence == 0 {
            VblankStamp {
                sequence: 0,
                timestamp_ns: self.clock.now_ns(),
            }
        } else {
            last
        }
    }
}
