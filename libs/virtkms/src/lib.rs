// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Software display output with emulated vblank timing.
//!
//! A [`VirtualOutputDevice`] presents a single plane -> CRTC -> encoder ->
//! connector pipeline. Enabling the CRTC starts a vblank timer thread; commits
//! that ask for a completion event get it on the next vblank.

pub mod core;

pub use crate::core::{
    init_tracing, CommitRequest, CompletionSink, CompletionToken, DeviceCollaborators,
    DeviceSnapshot, EventQueue, Framebuffer, ModeObjectTable, MonotonicClock, ObjectId,
    ObjectRegistry, Result, SharedClock, Size, SoftwareClock, StandaloneOutput, VblankCounter,
    VblankEvent, VblankStamp, VblankTracker, VirtualOutputDevice, VkmsConfig, VkmsError,
};
