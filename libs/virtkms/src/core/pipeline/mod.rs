// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Output pipeline objects: plane -> CRTC -> encoder -> connector.

mod connector;
mod crtc;
mod encoder;
mod mode;
mod object;
mod plane;

pub use connector::{Connector, ConnectorFuncs, ConnectorStatus, ConnectorType};
pub use crtc::{Crtc, CrtcFuncs, CrtcState};
pub use encoder::{Encoder, EncoderFuncs, EncoderType};
pub use mode::{modes_without_edid, DisplayMode, ModeConfig, PixelFormat, Size, SUPPORTED_FORMATS};
pub use object::{ObjectId, ObjectKind};
pub use plane::{Framebuffer, PlaneFuncs, PrimaryPlane};
