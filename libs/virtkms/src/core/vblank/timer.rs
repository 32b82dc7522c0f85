// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Periodic vblank timer.
//!
//! The timer is a dedicated thread parked on a cancellation channel with a
//! deadline. When the deadline passes without a cancellation the timer fires,
//! hands the firing instant to its [`VblankHandler`], and re-arms at
//! *firing instant + period*. Re-arming from the actual firing instant (rather
//! than from the previous deadline) means a late firing is never followed by a
//! burst of catch-up firings.
//!
//! [`VblankTimer::stop`] drops the cancellation sender and joins the thread, so
//! once it returns no firing is in flight and none will follow.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::core::clocks::SharedClock;
use crate::core::error::{Result, VkmsError};

/// Receives every timer firing, on the timer thread.
pub trait VblankHandler: Send + Sync {
    /// Called once per firing with the instant the timer woke up.
    fn on_vblank(&self, fired_at: Instant);
}

struct RunningTimer {
    /// Dropping the sender (or sending on it) cancels the armed deadline.
    cancel: Sender<()>,
    handle: JoinHandle<()>,
    thread_id: ThreadId,
}

enum TimerState {
    Stopped,
    Running(RunningTimer),
}

/// Software vblank generator with a fixed period.
pub struct VblankTimer {
    name: String,
    period: Duration,
    clock: SharedClock,
    handler: Arc<dyn VblankHandler>,
    state: Mutex<TimerState>,
    fire_count: Arc<AtomicU64>,
}

impl VblankTimer {
    pub fn new(
        name: impl Into<String>,
        period: Duration,
        clock: SharedClock,
        handler: Arc<dyn VblankHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            period,
            clock,
            handler,
            state: Mutex::new(TimerState::Stopped),
            fire_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), TimerState::Running(_))
    }

    /// Total firings since construction, across every start/stop cycle.
    pub fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::SeqCst)
    }

    /// Arm the first deadline at now + period and start firing.
    ///
    /// Starting a running timer is a caller error; the CRTC's enable state
    /// guards against it.
    pub fn start(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(VkmsError::Configuration(
                "vblank period must be non-zero".to_string(),
            ));
        }

        let mut state = self.state.lock();
        if matches!(*state, TimerState::Running(_)) {
            return Err(VkmsError::TimerAlreadyRunning);
        }

        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);
        let period = self.period;
        let clock = Arc::clone(&self.clock);
        let handler = Arc::clone(&self.handler);
        let fire_count = Arc::clone(&self.fire_count);
        let name = self.name.clone();
        let first_deadline = clock.now() + period;

        let handle = thread::Builder::new()
            .name(format!("vblank-{}", self.name))
            .spawn(move || {
                tracing::info!(
                    timer = %name,
                    ?period,
                    clock = clock.description(),
                    "Vblank timer started"
                );

                let mut deadline = first_deadline;
                loop {
                    match cancel_rx.recv_deadline(deadline) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let fired_at = clock.now();
                    let seq = fire_count.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::trace!(
                    timer = %name,
                    seq,
                    late_by = ?fired_at.saturating_duration_since(deadline),
                    "Vblank timer fired"
                );

                    handler.on_vblank(fired_at);

                    // Forward from the actual firing instant, not from the missed deadline.
                    deadline = fired_at + period;

                    // A stop requested during the firing must not be followed by a re-arm.
                    match cancel_rx.try_recv() {
                        Err(TryRecvError::Empty) => continue,
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                    }
                }

                tracing::info!(timer = %name, "Vblank timer stopped");
            })
            .map_err(VkmsError::TimerSpawn)?;

        let thread_id = handle.thread().id();
        *state = TimerState::Running(RunningTimer {
            cancel: cancel_tx,
            handle,
            thread_id,
        });
        Ok(())
    }

    /// Cancel the armed deadline and wait for an in-flight firing to finish.
    ///
    /// Valid in either state. When called from the timer's own handler the
    /// cancellation is recorded and the thread exits after the current firing.
    pub fn stop(&self) {
        let running = match std::mem::replace(&mut *self.state.lock(), TimerState::Stopped) {
            TimerState::Running(running) => running,
            TimerState::Stopped => return,
        };

        let RunningTimer {
            cancel,
            handle,
            thread_id,
        } = running;
        let _ = cancel.try_send(());
        drop(cancel);

        if thread::current().id() == thread_id {
            tracing::debug!(
                timer = %self.name,
                "Vblank timer stopped from its own firing, not joining"
            );
            return;
        }

        if handle.join().is_err() {
            tracing::error!(timer = %self.name, "Vblank timer thread panicked");
        }
    }
}

impl Drop for VblankTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
