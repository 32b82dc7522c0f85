// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod clocks;
pub mod commit;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod vblank;

pub use clocks::{MonotonicClock, SharedClock, SoftwareClock};
pub use commit::{
    AlreadyPending, CommitEventChannel, CommitRequest, CompletionSink, CompletionToken,
    EventQueue, VblankEvent,
};
pub use config::VkmsConfig;
pub use device::{
    DeviceCollaborators, DeviceSnapshot, DriverInfo, ModeObjectTable, ObjectRegistry,
    StandaloneOutput, VirtualOutputDevice, DRIVER_INFO,
};
pub use error::{Result, VkmsError};
pub use logging::init_tracing;
pub use pipeline::{
    Connector, ConnectorFuncs, Crtc, CrtcFuncs, CrtcState, DisplayMode, Encoder, EncoderFuncs,
    Framebuffer, ModeConfig, ObjectId, ObjectKind, PixelFormat, PlaneFuncs, PrimaryPlane, Size,
};
pub use vblank::{VblankCounter, VblankHandler, VblankStamp, VblankTimer, VblankTracker};
