// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderType {
    Virtual,
}

/// Encoder operations.
pub trait EncoderFuncs {
    fn encoder_type(&self) -> EncoderType;

    /// Bitmask of CRTC indices this encoder can be driven by.
    fn possible_crtcs(&self) -> u32;
}

/// Stateless pass-through between the CRTC and the connector.
pub struct Encoder {
    id: ObjectId,
}

impl Encoder {
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl EncoderFuncs for Encoder {
    fn encoder_type(&self) -> EncoderType {
        EncoderType::Virtual
    }

    fn possible_crtcs(&self) -> u32 {
        // Single-output pipeline: CRTC index 0 only.
        1
    }
}
