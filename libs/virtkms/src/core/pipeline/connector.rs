// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Connector: the pipeline's sink.
//!
//! There is no physical display behind it. It always reports connected and
//! advertises the standard modes that fit the configured size limits.

use serde::{Deserialize, Serialize};

use super::mode::{modes_without_edid, DisplayMode, ModeConfig, Size};
use super::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorType {
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
}

/// Connector operations.
pub trait ConnectorFuncs {
    fn connector_type(&self) -> ConnectorType;

    fn status(&self) -> ConnectorStatus;

    /// Modes offered to clients, one of them marked preferred.
    fn get_modes(&self) -> Vec<DisplayMode>;

    /// The encoder this connector is attached to.
    fn encoder(&self) -> ObjectId;
}

pub struct Connector {
    id: ObjectId,
    encoder: ObjectId,
    limits: ModeConfig,
    preferred: Size,
    refresh_hz: u32,
}

impl Connector {
    pub fn new(
        id: ObjectId,
        encoder: ObjectId,
        limits: ModeConfig,
        preferred: Size,
        refresh_hz: u32,
    ) -> Self {
        Self {
            id,
            encoder,
            limits,
            preferred,
            refresh_hz,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn preferred_mode(&self) -> Option<DisplayMode> {
        self.get_modes().into_iter().find(|mode| mode.preferred)
    }
}

impl ConnectorFuncs for Connector {
    fn connector_type(&self) -> ConnectorType {
        ConnectorType::Virtual
    }

    fn status(&self) -> ConnectorStatus {
        ConnectorStatus::Connected
    }

    fn get_modes(&self) -> Vec<DisplayMode> {
        modes_without_edid(self.limits, self.preferred, self.refresh_hz)
    }

    fn encoder(&self) -> ObjectId {
        self.encoder
    }
}
