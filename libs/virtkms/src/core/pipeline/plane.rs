// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Primary plane: the pipeline's source.
//!
//! The plane only remembers which framebuffer is attached. Nothing is read
//! from the buffer; pixel content is opaque here.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::mode::{ModeConfig, PixelFormat, Size, SUPPORTED_FORMATS};
use super::ObjectId;
use crate::core::error::{Result, VkmsError};

/// Reference to a client-allocated pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framebuffer {
    /// Client handle for the backing memory.
    pub handle: u64,
    pub size: Size,
    pub format: PixelFormat,
    /// Bytes per row.
    pub pitch: u32,
}

impl Framebuffer {
    /// Describe a tightly packed buffer, validated against the size limits and
    /// the supported format list.
    pub fn new(
        handle: u64,
        size: Size,
        format: PixelFormat,
        limits: &ModeConfig,
    ) -> Result<Self> {
        if !limits.contains(size) {
            return Err(VkmsError::InvalidFramebuffer(format!(
                "size {} outside {}..={}",
                size, limits.min, limits.max
            )));
        }
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(VkmsError::InvalidFramebuffer(format!(
                "unsupported format {:?}",
                format
            )));
        }
        let pitch = size
            .width
            .checked_mul(format.bytes_per_pixel())
            .ok_or_else(|| {
                VkmsError::InvalidFramebuffer(format!("row of {} bytes overflows the pitch", size))
            })?;
        Ok(Self {
            handle,
            size,
            format,
            pitch,
        })
    }
}

/// Plane operations.
pub trait PlaneFuncs {
    /// Formats the plane can scan out.
    fn formats(&self) -> &'static [PixelFormat];

    /// Apply the committed plane state. Scanout is not emulated.
    fn atomic_update(&self, framebuffer: Option<Framebuffer>);

    /// Framebuffer currently attached.
    fn framebuffer(&self) -> Option<Framebuffer>;
}

pub struct PrimaryPlane {
    id: ObjectId,
    framebuffer: Mutex<Option<Framebuffer>>,
}

impl PrimaryPlane {
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            framebuffer: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl PlaneFuncs for PrimaryPlane {
    fn formats(&self) -> &'static [PixelFormat] {
        SUPPORTED_FORMATS
    }

    fn atomic_update(&self, framebuffer: Option<Framebuffer>) {
        *self.framebuffer.lock() = framebuffer;
    }

    fn framebuffer(&self) -> Option<Framebuffer> {
        *self.framebuffer.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xrgb(handle: u64, size: Size) -> Result<Framebuffer> {
        Framebuffer::new(handle, size, PixelFormat::Xrgb8888, &ModeConfig::default())
    }

    #[test]
    fn test_framebuffer_pitch() {
        let fb = xrgb(1, Size::new(1024, 768)).unwrap();
        assert_eq!(fb.pitch, 4096);
    }

    #[test]
    fn test_framebuffer_rejects_unsupported_format() {
        let limits = ModeConfig::default();
        let err = Framebuffer::new(1, Size::new(64, 64), PixelFormat::Rgb565, &limits).unwrap_err();
        assert!(matches!(err, VkmsError::InvalidFramebuffer(_)));
    }

    #[test]
    fn test_framebuffer_rejects_pitch_overflow() {
        let limits = ModeConfig {
            min: Size::new(1, 1),
            max: Size::new(u32::MAX, 16),
        };
        let err = Framebuffer::new(1, Size::new(1 << 30, 1), PixelFormat::Xrgb8888, &limits)
            .unwrap_err();
        assert!(matches!(err, VkmsError::InvalidFramebuffer(_)));

        let fb = Framebuffer::new(1, Size::new((1 << 30) - 1, 1), PixelFormat::Xrgb8888, &limits)
            .unwrap();
        assert_eq!(fb.pitch, u32::MAX - 3);
    }

    #[test]
    fn test_framebuffer_rejects_out_of_range_size() {
        let limits = ModeConfig::default();
        assert!(Framebuffer::new(1, Size::new(16, 16), PixelFormat::Xrgb8888, &limits).is_err());
        assert!(Framebuffer::new(1, Size::new(9000, 16), PixelFormat::Xrgb8888, &limits).is_err());
    }

    #[test]
    fn test_plane_update_records_framebuffer() {
        let plane = PrimaryPlane::new(ObjectId(1));
        assert_eq!(plane.framebuffer(), None);
        assert_eq!(plane.formats(), &[PixelFormat::Xrgb8888]);

        let fb = xrgb(9, Size::new(640, 480)).unwrap();
        plane.atomic_update(Some(fb));
        assert_eq!(plane.framebuffer(), Some(fb));

        plane.atomic_update(None);
        assert_eq!(plane.framebuffer(), None);
    }
}
