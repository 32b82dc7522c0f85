// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! CRTC: the pipeline's timing unit.
//!
//! The CRTC's enable state gates the vblank timer. Enabling arms it,
//! disabling cancels it and waits for any in-flight firing. Each firing bumps
//! the vblank counter and, if a commit left a completion token in the event
//! slot, delivers it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::ObjectId;
use super::Size;
use crate::core::clocks::SharedClock;
use crate::core::commit::{CommitEventChannel, CompletionSink, CompletionToken, VblankEvent};
use crate::core::error::Result;
use crate::core::vblank::{VblankCounter, VblankHandler, VblankTimer};

/// Enable state of a CRTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrtcState {
    Disabled,
    Enabled,
}

/// CRTC operations.
pub trait CrtcFuncs {
    /// Disabled -> Enabled, arming the vblank timer. No-op when enabled.
    fn atomic_enable(&self) -> Result<()>;

    /// Enabled -> Disabled, cancelling the vblank timer before returning.
    /// No-op when disabled.
    fn atomic_disable(&self);

    /// Finish a commit, arming `event` for the next vblank.
    ///
    /// An occupied slot fails with [`crate::core::VkmsError::AlreadyPending`] carrying
    /// `event` back.
    fn atomic_flush(&self, event: Option<CompletionToken>) -> Result<()>;

    fn state(&self) -> CrtcState;
}

/// Per-firing work, run on the vblank timer thread.
struct VblankDispatch {
    crtc: ObjectId,
    counter: Arc<dyn VblankCounter>,
    events: Arc<CommitEventChannel>,
    sink: Arc<dyn CompletionSink>,
}

impl VblankHandler for VblankDispatch {
    fn on_vblank(&self, fired_at: Instant) {
        let (stamp, pending) = self
            .events
            .fire_with(|| self.counter.handle_vblank(self.crtc, fired_at));
        if let Some(token) = pending {
            self.sink.deliver(VblankEvent::new(token, self.crtc, stamp));
        }
    }
}

pub struct Crtc {
    id: ObjectId,
    state: Mutex<CrtcState>,
    mode: Mutex<Option<Size>>,
    timer: VblankTimer,
    events: Arc<CommitEventChannel>,
    counter: Arc<dyn VblankCounter>,
    sink: Arc<dyn CompletionSink>,
}

impl Crtc {
    pub fn new(
        id: ObjectId,
        period: Duration,
        clock: SharedClock,
        counter: Arc<dyn VblankCounter>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        let events = Arc::new(CommitEventChannel::new());
        let dispatch = Arc::new(VblankDispatch {
            crtc: id,
            counter: Arc::clone(&counter),
            events: Arc::clone(&events),
            sink: Arc::clone(&sink),
        });
        Self {
            id,
            state: Mutex::new(CrtcState::Disabled),
            mode: Mutex::new(None),
            timer: VblankTimer::new(format!("crtc-{}", id), period, clock, dispatch),
            events,
            counter,
            sink,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == CrtcState::Enabled
    }

    pub fn mode(&self) -> Option<Size> {
        *self.mode.lock()
    }

    pub fn set_mode(&self, mode: Option<Size>) {
        *self.mode.lock() = mode;
    }

    pub fn vblank_period(&self) -> Duration {
        self.timer.period()
    }

    /// Whether a completion token is waiting for the next vblank.
    pub fn event_pending(&self) -> bool {
        self.events.is_pending()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Complete `token` now, stamped with the latest vblank.
    fn send_now(&self, token: CompletionToken) {
        let stamp = self.counter.last_vblank(self.id);
        self.sink.deliver(VblankEvent::new(token, self.id, stamp));
    }
}

impl CrtcFuncs for Crtc {
    fn atomic_enable(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state == CrtcState::Enabled {
            return Ok(());
        }
        self.timer.start()?;
        *state = CrtcState::Enabled;
        tracing::info!(crtc = %self.id, period = ?self.timer.period(), "CRTC enabled");
        Ok(())
    }

    fn atomic_disable(&self) {
        let mut state = self.state.lock();
        if *state == CrtcState::Disabled {
            return;
        }
        self.timer.stop();
        *state = CrtcState::Disabled;

        // The timer is gone; a token still waiting would never see another vblank.
        if let Some(token) = self.events.try_take() {
            tracing::debug!(
                crtc = %self.id,
                token = token.id(),
                "Completing pending event on disable"
            );
            self.send_now(token);
        }
        tracing::info!(crtc = %self.id, "CRTC disabled");
    }

    fn atomic_flush(&self, event: Option<CompletionToken>) -> Result<()> {
        let Some(token) = event else {
            return Ok(());
        };

        let state = self.state.lock();
        match *state {
            CrtcState::Enabled => self.events.deposit(token)?,
            CrtcState::Disabled => {
                tracing::debug!(
                    crtc = %self.id,
                    token = token.id(),
                    "CRTC off, completing event immediately"
                );
                self.send_now(token);
            }
        }
        Ok(())
    }

    fn state(&self) -> CrtcState {
        *self.state.lock()
    }
}

impl Drop for Crtc {
    fn drop(&mut self) {
        // Never release the event slot or the sink while the timer can still fire.
        self.atomic_disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clocks::SoftwareClock;
    use crate::core::commit::EventQueue;
    use crate::core::error::VkmsError;
    use crate::core::vblank::VblankTracker;

    struct Fixture {
        crtc: Crtc,
        vblanks: Arc<VblankTracker>,
        events: Arc<EventQueue>,
    }

    fn fixture(period: Duration) -> Fixture {
        let clock: SharedClock = Arc::new(SoftwareClock::new());
        let vblanks = Arc::new(VblankTracker::new(Arc::clone(&clock), 8));
        let events = Arc::new(EventQueue::new());
        let crtc = Crtc::new(ObjectId(2), period, clock, vblanks.clone(), events.clone());
        Fixture {
            crtc,
            vblanks,
            events,
        }
    }

    #[test]
    fn test_initially_disabled() {
        let f = fixture(Duration::from_millis(5));
        assert_eq!(f.crtc.state(), CrtcState::Disabled);
        assert!(!f.crtc.timer_running());
    }

    #[test]
    fn test_enable_is_idempotent() {
        let f = fixture(Duration::from_millis(5));
        f.crtc.atomic_enable().unwrap();
        f.crtc.atomic_enable().unwrap();
        assert!(f.crtc.is_enabled());
        assert!(f.crtc.timer_running());

        f.crtc.atomic_disable();
        f.crtc.atomic_disable();
        assert!(!f.crtc.is_enabled());
        assert!(!f.crtc.timer_running());
    }

    #[test]
    fn test_enabled_crtc_produces_vblanks() {
        let f = fixture(Duration::from_millis(5));
        f.crtc.atomic_enable().unwrap();
        assert!(f.vblanks.wait_for_sequence(3, Duration::from_secs(5)).is_some());
        f.crtc.atomic_disable();
    }

    #[test]
    fn test_flush_on_enabled_crtc_delivers_on_vblank() {
        let f = fixture(Duration::from_millis(20));
        f.crtc.atomic_enable().unwrap();
        f.crtc.atomic_flush(Some(CompletionToken::new(11))).unwrap();

        let event = f.events.read_event(Duration::from_secs(5)).unwrap();
        assert_eq!(event.token.id(), 11);
        assert_eq!(event.crtc, ObjectId(2));
        assert!(event.sequence >= 1);
        assert!(!f.crtc.event_pending());
        f.crtc.atomic_disable();
    }

    #[test]
    fn test_double_flush_before_vblank_is_rejected() {
        let f = fixture(Duration::from_secs(10));
        f.crtc.atomic_enable().unwrap();
        f.crtc.atomic_flush(Some(CompletionToken::new(1))).unwrap();
        let err = f.crtc.atomic_flush(Some(CompletionToken::new(2))).unwrap_err();
        match err {
            VkmsError::AlreadyPending(Some(rejected)) => assert_eq!(rejected.id(), 2),
            other => panic!("expected the rejected token back, got {other:?}"),
        }
        f.crtc.atomic_disable();

        // Disabling completes the pending token rather than dropping it.
        let ids: Vec<u64> = f.events.drain().iter().map(|e| e.token.id()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_flush_on_disabled_crtc_completes_immediately() {
        let f = fixture(Duration::from_millis(5));
        f.crtc.atomic_flush(Some(CompletionToken::new(5))).unwrap();

        let event = f.events.try_read_event().unwrap();
        assert_eq!(event.token.id(), 5);
        assert_eq!(event.sequence, 0);
        assert!(!f.crtc.event_pending());
    }

    #[test]
    fn test_flush_without_event_is_noop() {
        let f = fixture(Duration::from_millis(5));
        f.crtc.atomic_flush(None).unwrap();
        assert!(f.events.is_empty());
    }
}
