// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::CompletionToken;
use crate::core::pipeline::{Framebuffer, ObjectId, Size};

/// A requested output configuration.
///
/// An active request needs a framebuffer for the primary plane; the mode
/// falls back to the CRTC's current mode when omitted.
#[derive(Debug)]
pub struct CommitRequest {
    pub crtc: ObjectId,
    pub active: bool,
    pub mode: Option<Size>,
    pub framebuffer: Option<Framebuffer>,
    pub event: Option<CompletionToken>,
}

impl CommitRequest {
    /// Turn the output on (or keep it on) scanning out `framebuffer`.
    pub fn enable(crtc: ObjectId, mode: Size, framebuffer: Framebuffer) -> Self {
        Self {
            crtc,
            active: true,
            mode: Some(mode),
            framebuffer: Some(framebuffer),
            event: None,
        }
    }

    /// Turn the output off.
    pub fn disable(crtc: ObjectId) -> Self {
        Self {
            crtc,
            active: false,
            mode: None,
            framebuffer: None,
            event: None,
        }
    }

    /// Swap the scanout buffer while keeping the current mode.
    pub fn flip(crtc: ObjectId, framebuffer: Framebuffer) -> Self {
        Self {
            crtc,
            active: true,
            mode: None,
            framebuffer: Some(framebuffer),
            event: None,
        }
    }

    /// Ask to be notified when this commit reaches the screen.
    pub fn with_event(mut self, token: CompletionToken) -> Self {
        self.event = Some(token);
        self
    }
}
