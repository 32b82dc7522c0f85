// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Mode and format data advertised by the virtual output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel formats accepted by the primary plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit xRGB, little-endian, alpha ignored.
    Xrgb8888,
    /// 32-bit ARGB. Never accepted by this output; present so callers can be rejected.
    Argb8888,
    /// 16-bit RGB 5:6:5. Never accepted by this output.
    Rgb565,
}

impl PixelFormat {
    /// Little-endian fourcc code.
    pub const fn fourcc(self) -> u32 {
        let code = match self {
            PixelFormat::Xrgb8888 => *b"XR24",
            PixelFormat::Argb8888 => *b"AR24",
            PixelFormat::Rgb565 => *b"RG16",
        };
        u32::from_le_bytes(code)
    }

    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => 4,
            PixelFormat::Rgb565 => 2,
        }
    }
}

/// The only format the primary plane scans out.
pub const SUPPORTED_FORMATS: &[PixelFormat] = &[PixelFormat::Xrgb8888];

/// A display mode offered by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMode {
    pub size: Size,
    pub refresh_hz: u32,
    pub preferred: bool,
}

impl DisplayMode {
    pub const fn new(width: u32, height: u32, refresh_hz: u32) -> Self {
        Self {
            size: Size::new(width, height),
            refresh_hz,
            preferred: false,
        }
    }

    pub fn name(&self) -> String {
        self.size.to_string()
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.size, self.refresh_hz)?;
        if self.preferred {
            write!(f, " (preferred)")?;
        }
        Ok(())
    }
}

/// Global size limits for framebuffers and modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub min: Size,
    pub max: Size,
}

impl ModeConfig {
    pub fn contains(&self, size: Size) -> bool {
        (self.min.width..=self.max.width).contains(&size.width)
            && (self.min.height..=self.max.height).contains(&size.height)
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            min: Size::new(32, 32),
            max: Size::new(8192, 8192),
        }
    }
}

/// Standard modes offered without EDID, smallest first.
const STANDARD_MODES: &[(u32, u32)] = &[
    (640, 480),
    (800, 600),
    (1024, 768),
    (1280, 720),
    (1280, 800),
    (1280, 1024),
    (1366, 768),
    (1440, 900),
    (1600, 900),
    (1600, 1200),
    (1680, 1050),
    (1920, 1080),
    (1920, 1200),
    (2560, 1440),
    (2560, 1600),
    (3840, 2160),
    (4096, 2160),
    (5120, 2880),
    (7680, 4320),
    (8192, 8192),
];

/// Build the connector's mode list: every standard mode that fits `limits`,
/// with `preferred` marked. A preferred size missing from the table is appended.
pub fn modes_without_edid(
    limits: ModeConfig,
    preferred: Size,
    refresh_hz: u32,
) -> Vec<DisplayMode> {
    let mut modes: Vec<DisplayMode> = STANDARD_MODES
        .iter()
        .map(|&(w, h)| DisplayMode::new(w, h, refresh_hz))
        .filter(|mode| limits.contains(mode.size))
        .collect();

    match modes.iter_mut().find(|mode| mode.size == preferred) {
        Some(mode) => mode.preferred = true,
        None if limits.contains(preferred) => modes.push(DisplayMode {
            size: preferred,
            refresh_hz,
            preferred: true,
        }),
        None => {}
    }
    modes
}
