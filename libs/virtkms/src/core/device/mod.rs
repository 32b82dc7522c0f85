// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod driver;
mod output;
mod registry;

pub use driver::{DriverFeatures, DriverInfo, DRIVER_INFO};
pub use output::{DeviceCollaborators, DeviceSnapshot, StandaloneOutput, VirtualOutputDevice};
pub use registry::{ModeObjectTable, ObjectEntry, ObjectRegistry};
