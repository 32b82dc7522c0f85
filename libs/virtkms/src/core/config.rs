// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Device configuration
//!
//! Every field has a default matching the stock virtual output (60 Hz,
//! 1024x768 preferred, 32x32 to 8192x8192), so an empty TOML document is a
//! valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, VkmsError};
use crate::core::pipeline::{ModeConfig, Size};

/// Configuration for a [`VirtualOutputDevice`](crate::core::device::VirtualOutputDevice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VkmsConfig {
    /// Device name used in logs and snapshots.
    pub name: String,
    /// Nominal refresh rate in Hz.
    pub refresh_hz: u32,
    /// Explicit vblank period in nanoseconds. Overrides `refresh_hz` when set.
    pub vblank_period_ns: Option<u64>,
    /// Mode the connector marks as preferred.
    pub preferred_mode: Size,
    /// Smallest framebuffer/mode accepted.
    pub min_size: Size,
    /// Largest framebuffer/mode accepted.
    pub max_size: Size,
    /// Number of vblank timestamps kept by the vblank tracker.
    pub vblank_history: usize,
}

impl Default for VkmsConfig {
    fn default() -> Self {
        Self {
            name: "vkms".to_string(),
            refresh_hz: 60,
            vblank_period_ns: None,
            preferred_mode: Size::new(1024, 768),
            min_size: Size::new(32, 32),
            max_size: Size::new(8192, 8192),
            vblank_history: 16,
        }
    }
}

impl VkmsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| VkmsError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading device config");
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vblank_period_ns.is_none() && self.refresh_hz == 0 {
            return Err(VkmsError::Configuration(
                "refresh_hz must be non-zero".to_string(),
            ));
        }
        if self.vblank_period_ns == Some(0) {
            return Err(VkmsError::Configuration(
                "vblank_period_ns must be non-zero".to_string(),
            ));
        }
        if self.min_size.width == 0 || self.min_size.height == 0 {
            return Err(VkmsError::Configuration(format!(
                "min_size {} must be non-empty",
                self.min_size
            )));
        }
        if self.min_size.width > self.max_size.width || self.min_size.height > self.max_size.height
        {
            return Err(VkmsError::Configuration(format!(
                "min_size {} exceeds max_size {}",
                self.min_size, self.max_size
            )));
        }
        if !self.mode_config().contains(self.preferred_mode) {
            return Err(VkmsError::Configuration(format!(
                "preferred_mode {} is outside {}..={}",
                self.preferred_mode, self.min_size, self.max_size
            )));
        }
        Ok(())
    }

    /// Vblank period in nanoseconds.
    ///
    /// Uses ceil division so 60 Hz stays at 16_666_667 ns rather than truncating.
    pub fn vblank_period_ns(&self) -> u64 {
        match self.vblank_period_ns {
            Some(period) => period,
            None => 1_000_000_000u64.div_ceil(u64::from(self.refresh_hz.max(1))),
        }
    }

    pub fn vblank_period(&self) -> Duration {
        Duration::from_nanos(self.vblank_period_ns())
    }

    pub fn mode_config(&self) -> ModeConfig {
        ModeConfig {
            min: self.min_size,
            max: self.max_size,
        }
    }
}
