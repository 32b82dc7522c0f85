// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

use crate::core::commit::CompletionToken;

#[derive(Error, Debug)]
pub enum VkmsError {
    /// Carries the rejected token back to the caller when one was handed over.
    #[error("A completion event is already pending on this CRTC")]
    AlreadyPending(Option<CompletionToken>),

    #[error("Vblank timer is already running")]
    TimerAlreadyRunning,

    #[error("Failed to spawn vblank timer thread: {0}")]
    TimerSpawn(std::io::Error),

    #[error("Invalid commit: {0}")]
    InvalidCommit(String),

    #[error("Invalid framebuffer: {0}")]
    InvalidFramebuffer(String),

    #[error("Object registration failed: {0}")]
    Registration(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VkmsError {
    /// Take back the completion token a rejected commit carried, if any.
    pub fn into_rejected_token(self) -> Option<CompletionToken> {
        match self {
            VkmsError::AlreadyPending(token) => token,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VkmsError>;
