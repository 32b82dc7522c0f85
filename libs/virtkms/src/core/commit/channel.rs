// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Single-slot mailbox between the commit path and the vblank timer.

use parking_lot::Mutex;
use thiserror::Error;

use super::CompletionToken;
use crate::core::error::VkmsError;

/// Deposit refused because a token is still waiting for its vblank.
///
/// Carries the rejected token back to the caller so it is never silently lost.
#[derive(Error, Debug)]
#[error("completion token {} rejected: another token is already pending", .0.id())]
pub struct AlreadyPending(pub CompletionToken);

impl From<AlreadyPending> for VkmsError {
    fn from(AlreadyPending(token): AlreadyPending) -> Self {
        VkmsError::AlreadyPending(Some(token))
    }
}

/// Holds at most one pending completion token.
///
/// `deposit` and `try_take` share one lock, so a take never observes a
/// half-stored token and a deposit never replaces one being taken.
#[derive(Default)]
pub struct CommitEventChannel {
    slot: Mutex<Option<CompletionToken>>,
}

impl CommitEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `token` for delivery on the next vblank.
    pub fn deposit(&self, token: CompletionToken) -> std::result::Result<(), AlreadyPending> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(AlreadyPending(token));
        }
        tracing::debug!(token = token.id(), "Completion token armed for next vblank");
        *slot = Some(token);
        Ok(())
    }

    /// Remove and return the pending token, if any.
    pub fn try_take(&self) -> Option<CompletionToken> {
        self.slot.lock().take()
    }

    /// Run `signal` and take the pending token as one step.
    ///
    /// The slot stays locked while `signal` runs, so a deposit made by anyone
    /// who observed the signal's effect lands after the take and waits for
    /// the next firing.
    pub fn fire_with<T>(&self, signal: impl FnOnce() -> T) -> (T, Option<CompletionToken>) {
        let mut slot = self.slot.lock();
        let signalled = signal();
        (signalled, slot.take())
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}
