// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// Static driver identification, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    pub name: &'static str,
    pub desc: &'static str,
    pub date: &'static str,
    pub major: u32,
    pub minor: u32,
    pub features: DriverFeatures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverFeatures {
    pub modeset: bool,
    pub atomic: bool,
    pub gem: bool,
}

pub const DRIVER_INFO: DriverInfo = DriverInfo {
    name: "vkms",
    desc: "Virtual Kernel Mode Setting",
    date: "20180514",
    major: 1,
    minor: 0,
    features: DriverFeatures {
        modeset: true,
        atomic: true,
        gem: true,
    },
};

impl DriverInfo {
    pub fn version(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}
