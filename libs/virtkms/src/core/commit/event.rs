// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Completion tokens and the completion-delivery boundary.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::pipeline::ObjectId;
use crate::core::vblank::VblankStamp;

/// A commit's request to be told when it reached the screen.
///
/// Tokens are move-only: once handed to a commit they live in exactly one
/// place (the request, the CRTC's event slot, or a delivered [`VblankEvent`]).
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CompletionToken {
    id: u64,
    user_data: u64,
}

impl CompletionToken {
    pub fn new(id: u64) -> Self {
        Self { id, user_data: 0 }
    }

    /// Attach opaque client data, echoed back on delivery.
    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user_data(&self) -> u64 {
        self.user_data
    }
}

/// A delivered completion: the token plus the vblank it completed on.
#[derive(Debug, PartialEq, Eq)]
pub struct VblankEvent {
    pub token: CompletionToken,
    pub crtc: ObjectId,
    pub sequence: u64,
    pub timestamp_ns: u64,
}

impl VblankEvent {
    pub fn new(token: CompletionToken, crtc: ObjectId, stamp: VblankStamp) -> Self {
        Self {
            token,
            crtc,
            sequence: stamp.sequence,
            timestamp_ns: stamp.timestamp_ns,
        }
    }
}

/// Commit-completion interface.
///
/// Called from the vblank timer thread (or from the commit path when the CRTC
/// is off). Implementations lock their event queue only inside `deliver`.
pub trait CompletionSink: Send + Sync {
    fn deliver(&self, event: VblankEvent);
}

/// In-process event queue clients read completions from.
pub struct EventQueue {
    event_lock: Mutex<VecDeque<VblankEvent>>,
    readable: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            event_lock: Mutex::new(VecDeque::new()),
            readable: Condvar::new(),
        }
    }

    /// Pop the oldest event, waiting up to `timeout` for one to arrive.
    pub fn read_event(&self, timeout: Duration) -> Option<VblankEvent> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.event_lock.lock();
        loop {
            if let Some(event) = queue.pop_front() {
                return Some(event);
            }
            if self.readable.wait_until(&mut queue, deadline).timed_out() {
                return queue.pop_front();
            }
        }
    }

    /// Pop the oldest event without waiting.
    pub fn try_read_event(&self) -> Option<VblankEvent> {
        self.event_lock.lock().pop_front()
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<VblankEvent> {
        self.event_lock.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.event_lock.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_lock.lock().is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSink for EventQueue {
    fn deliver(&self, event: VblankEvent) {
        tracing::debug!(
            token = event.token.id(),
            crtc = %event.crtc,
            sequence = event.sequence,
            "Delivering completion event"
        );
        self.event_lock.lock().push_back(event);
        self.readable.notify_one();
    }
}
