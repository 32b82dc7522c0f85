// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The virtual output device.
//!
//! Owns the pipeline (primary plane, CRTC, encoder, connector), registers it
//! in that order, and tears it down in reverse. The CRTC is always disabled,
//! and with it the vblank timer joined, before any object is unregistered or
//! dropped.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::driver::{DriverInfo, DRIVER_INFO};
use super::registry::{ModeObjectTable, ObjectRegistry};
use crate::core::clocks::{SharedClock, SoftwareClock};
use crate::core::commit::{CommitRequest, CompletionSink, CompletionToken, EventQueue};
use crate::core::config::VkmsConfig;
use crate::core::error::{Result, VkmsError};
use crate::core::pipeline::{
    Connector, ConnectorFuncs, Crtc, CrtcFuncs, CrtcState, DisplayMode, Encoder, EncoderFuncs,
    Framebuffer, ModeConfig, ObjectId, ObjectKind, PixelFormat, PlaneFuncs, PrimaryPlane, Size,
};
use crate::core::vblank::{VblankCounter, VblankStamp, VblankTracker};

/// External collaborators injected at construction.
#[derive(Clone)]
pub struct DeviceCollaborators {
    pub clock: SharedClock,
    pub vblank_counter: Arc<dyn VblankCounter>,
    pub completion_sink: Arc<dyn CompletionSink>,
    pub registry: Arc<dyn ObjectRegistry>,
}

/// A device wired to the in-crate collaborators, with typed handles to them.
pub struct StandaloneOutput {
    pub device: VirtualOutputDevice,
    pub vblanks: Arc<VblankTracker>,
    pub events: Arc<EventQueue>,
    pub objects: Arc<ModeObjectTable>,
}

struct PipelineIds {
    plane: ObjectId,
    crtc: ObjectId,
    encoder: ObjectId,
    connector: ObjectId,
}

/// Point-in-time view of the device, for logs and inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub name: String,
    pub driver: DriverInfo,
    pub plane: ObjectId,
    pub crtc: ObjectId,
    pub encoder: ObjectId,
    pub connector: ObjectId,
    pub crtc_state: CrtcState,
    pub mode: Option<Size>,
    pub framebuffer: Option<Framebuffer>,
    pub vblank: VblankStamp,
    pub vblank_period_ns: u64,
    pub event_pending: bool,
}

impl DeviceSnapshot {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| VkmsError::Other(e.into()))
    }
}

pub struct VirtualOutputDevice {
    config: VkmsConfig,
    registry: Arc<dyn ObjectRegistry>,
    counter: Arc<dyn VblankCounter>,
    plane: PrimaryPlane,
    crtc: Crtc,
    encoder: Encoder,
    connector: Connector,
    /// Serializes commits: one in flight per output.
    commit_lock: Mutex<()>,
    torn_down: bool,
}

impl VirtualOutputDevice {
    pub fn new(config: VkmsConfig, collaborators: DeviceCollaborators) -> Result<Self> {
        config.validate()?;
        let DeviceCollaborators {
            clock,
            vblank_counter,
            completion_sink,
            registry,
        } = collaborators;

        let ids = register_pipeline(registry.as_ref(), &config.name)?;

        let plane = PrimaryPlane::new(ids.plane);
        let crtc = Crtc::new(
            ids.crtc,
            config.vblank_period(),
            clock,
            Arc::clone(&vblank_counter),
            completion_sink,
        );
        let encoder = Encoder::new(ids.encoder);
        let connector = Connector::new(
            ids.connector,
            ids.encoder,
            config.mode_config(),
            config.preferred_mode,
            config.refresh_hz,
        );

        tracing::info!(
            device = %config.name,
            driver = DRIVER_INFO.name,
            version = %DRIVER_INFO.version(),
            plane = %ids.plane,
            crtc = %ids.crtc,
            encoder = %ids.encoder,
            connector = %ids.connector,
            vblank_period_ns = config.vblank_period_ns(),
            "Virtual output registered"
        );

        Ok(Self {
            config,
            registry,
            counter: vblank_counter,
            plane,
            crtc,
            encoder,
            connector,
            commit_lock: Mutex::new(()),
            torn_down: false,
        })
    }

    /// Build a device backed by a software clock, a [`VblankTracker`], an
    /// [`EventQueue`] and a [`ModeObjectTable`].
    pub fn standalone(config: VkmsConfig) -> Result<StandaloneOutput> {
        let clock: SharedClock = Arc::new(SoftwareClock::new());
        let vblanks = Arc::new(VblankTracker::new(Arc::clone(&clock), config.vblank_history));
        let events = Arc::new(EventQueue::new());
        let objects = Arc::new(ModeObjectTable::new());

        let device = Self::new(
            config,
            DeviceCollaborators {
                clock,
                vblank_counter: vblanks.clone(),
                completion_sink: events.clone(),
                registry: objects.clone(),
            },
        )?;

        Ok(StandaloneOutput {
            device,
            vblanks,
            events,
            objects,
        })
    }

    pub fn config(&self) -> &VkmsConfig {
        &self.config
    }

    pub fn driver_info(&self) -> &'static DriverInfo {
        &DRIVER_INFO
    }

    pub fn mode_config(&self) -> ModeConfig {
        self.config.mode_config()
    }

    pub fn plane(&self) -> &PrimaryPlane {
        &self.plane
    }

    pub fn crtc(&self) -> &Crtc {
        &self.crtc
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Modes the connector offers.
    pub fn get_modes(&self) -> Vec<DisplayMode> {
        self.connector.get_modes()
    }

    /// Describe a client buffer in the plane's only format.
    pub fn create_framebuffer(&self, handle: u64, size: Size) -> Result<Framebuffer> {
        Framebuffer::new(handle, size, PixelFormat::Xrgb8888, &self.mode_config())
    }

    /// Validate `request` against the current device state without applying it.
    pub fn atomic_check(&self, request: &CommitRequest) -> Result<()> {
        if request.crtc != self.crtc.id() {
            return Err(VkmsError::InvalidCommit(format!(
                "unknown crtc {} (this output drives crtc {})",
                request.crtc,
                self.crtc.id()
            )));
        }
        if self.encoder.possible_crtcs() & 1 == 0 {
            return Err(VkmsError::InvalidCommit(
                "encoder cannot be driven by this crtc".to_string(),
            ));
        }

        if request.active {
            let mode = request.mode.or_else(|| self.crtc.mode()).ok_or_else(|| {
                VkmsError::InvalidCommit("active crtc needs a mode".to_string())
            })?;
            if !self.mode_config().contains(mode) {
                return Err(VkmsError::InvalidCommit(format!(
                    "mode {} outside {}..={}",
                    mode, self.config.min_size, self.config.max_size
                )));
            }

            let fb = request.framebuffer.as_ref().ok_or_else(|| {
                VkmsError::InvalidCommit("active crtc needs a primary framebuffer".to_string())
            })?;
            if !self.plane.formats().contains(&fb.format) {
                return Err(VkmsError::InvalidCommit(format!(
                    "primary plane cannot scan out {:?}",
                    fb.format
                )));
            }
            if fb.size.width < mode.width || fb.size.height < mode.height {
                return Err(VkmsError::InvalidCommit(format!(
                    "framebuffer {} does not cover mode {}",
                    fb.size, mode
                )));
            }
        } else if request.framebuffer.is_some() {
            return Err(VkmsError::InvalidCommit(
                "framebuffer attached to an inactive crtc".to_string(),
            ));
        }

        if request.event.is_some() && self.crtc.event_pending() {
            return Err(VkmsError::AlreadyPending(None));
        }
        Ok(())
    }

    /// Validate and apply `request`.
    ///
    /// Order: disable, enable, plane update, flush. A requested completion
    /// event is delivered on the first vblank after the flush, or immediately
    /// when the commit leaves the CRTC off.
    pub fn atomic_commit(&self, request: CommitRequest) -> Result<()> {
        let _commit = self.commit_lock.lock();

        if let Err(err) = self.atomic_check(&request) {
            tracing::warn!(device = %self.config.name, error = %err, "Commit rejected");
            return Err(match err {
                VkmsError::AlreadyPending(None) => VkmsError::AlreadyPending(request.event),
                err => err,
            });
        }

        let CommitRequest {
            active,
            mode,
            framebuffer,
            event,
            ..
        } = request;

        if !active {
            self.crtc.atomic_disable();
            self.crtc.set_mode(None);
        } else {
            self.crtc.atomic_enable()?;
            if let Some(mode) = mode {
                self.crtc.set_mode(Some(mode));
            }
        }

        self.plane.atomic_update(framebuffer);
        self.crtc.atomic_flush(event)?;

        tracing::debug!(
            device = %self.config.name,
            active,
            mode = ?self.crtc.mode(),
            fb = ?framebuffer.map(|fb| fb.handle),
            "Commit applied"
        );
        Ok(())
    }

    /// Swap the scanout buffer, optionally asking for a completion event.
    pub fn page_flip(
        &self,
        framebuffer: Framebuffer,
        event: Option<CompletionToken>,
    ) -> Result<()> {
        let mut request = CommitRequest::flip(self.crtc.id(), framebuffer);
        request.event = event;
        self.atomic_commit(request)
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            name: self.config.name.clone(),
            driver: DRIVER_INFO,
            plane: self.plane.id(),
            crtc: self.crtc.id(),
            encoder: self.encoder.id(),
            connector: self.connector.id(),
            crtc_state: self.crtc.state(),
            mode: self.crtc.mode(),
            framebuffer: self.plane.framebuffer(),
            vblank: self.counter.last_vblank(self.crtc.id()),
            vblank_period_ns: self.crtc.vblank_period().as_nanos() as u64,
            event_pending: self.crtc.event_pending(),
        }
    }

    /// Disable the output and unregister the pipeline.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let _commit = self.commit_lock.lock();
        self.crtc.atomic_disable();

        for id in [
            self.connector.id(),
            self.encoder.id(),
            self.crtc.id(),
            self.plane.id(),
        ] {
            self.registry.unregister(id);
        }
        tracing::info!(device = %self.config.name, "Virtual output torn down");
    }
}

impl Drop for VirtualOutputDevice {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Register plane, CRTC, encoder and connector in order. On failure every
/// object already registered is unregistered again, newest first.
fn register_pipeline(registry: &dyn ObjectRegistry, name: &str) -> Result<PipelineIds> {
    let objects = [
        (ObjectKind::Plane, format!("{}-primary", name)),
        (ObjectKind::Crtc, format!("{}-crtc", name)),
        (ObjectKind::Encoder, format!("{}-encoder", name)),
        (ObjectKind::Connector, format!("{}-virtual", name)),
    ];

    let mut registered = Vec::with_capacity(objects.len());
    for (kind, label) in &objects {
        match registry.register(*kind, label) {
            Ok(id) => registered.push(id),
            Err(err) => {
                tracing::error!(%kind, error = %err, "Object registration failed, rolling back");
                for id in registered.into_iter().rev() {
                    registry.unregister(id);
                }
                return Err(err);
            }
        }
    }

    match registered[..] {
        [plane, crtc, encoder, connector] => Ok(PipelineIds {
            plane,
            crtc,
            encoder,
            connector,
        }),
        _ => Err(VkmsError::Registration(format!(
            "expected 4 pipeline objects, registered {}",
            registered.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> VkmsConfig {
        VkmsConfig {
            name: "test".to_string(),
            vblank_period_ns: Some(Duration::from_millis(10).as_nanos() as u64),
            ..Default::default()
        }
    }

    #[test]
    fn test_registration_order() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let kinds: Vec<ObjectKind> = output.objects.entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ObjectKind::Plane, ObjectKind::Crtc, ObjectKind::Encoder, ObjectKind::Connector]
        );
        assert_eq!(output.device.connector().encoder(), output.device.encoder().id());
    }

    #[test]
    fn test_check_rejects_foreign_crtc() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let err = output
            .device
            .atomic_check(&CommitRequest::disable(ObjectId(999)))
            .unwrap_err();
        assert!(matches!(err, VkmsError::InvalidCommit(_)));
    }

    #[test]
    fn test_check_rejects_active_without_framebuffer() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let device = &output.device;
        let request = CommitRequest {
            crtc: device.crtc().id(),
            active: true,
            mode: Some(Size::new(1024, 768)),
            framebuffer: None,
            event: None,
        };
        assert!(matches!(device.atomic_check(&request), Err(VkmsError::InvalidCommit(_))));
    }

    #[test]
    fn test_check_rejects_flip_without_mode() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let device = &output.device;
        let fb = device.create_framebuffer(1, Size::new(1024, 768)).unwrap();
        let err = device.page_flip(fb, None).unwrap_err();
        assert!(matches!(err, VkmsError::InvalidCommit(_)));
        assert!(!device.crtc().is_enabled());
    }

    #[test]
    fn test_check_rejects_small_framebuffer() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let device = &output.device;
        let fb = device.create_framebuffer(1, Size::new(640, 480)).unwrap();
        let request = CommitRequest::enable(device.crtc().id(), Size::new(1024, 768), fb);
        assert!(matches!(device.atomic_check(&request), Err(VkmsError::InvalidCommit(_))));
    }

    #[test]
    fn test_check_rejects_mode_out_of_range() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let device = &output.device;
        let fb = Framebuffer {
            handle: 1,
            size: Size::new(16_384, 16_384),
            format: PixelFormat::Xrgb8888,
            pitch: 16_384 * 4,
        };
        let request = CommitRequest::enable(device.crtc().id(), Size::new(16_384, 16_384), fb);
        assert!(matches!(device.atomic_check(&request), Err(VkmsError::InvalidCommit(_))));
    }

    #[test]
    fn test_check_rejects_unsupported_format() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let device = &output.device;
        let fb = Framebuffer {
            handle: 1,
            size: Size::new(1024, 768),
            format: PixelFormat::Argb8888,
            pitch: 4096,
        };
        let request = CommitRequest::enable(device.crtc().id(), Size::new(1024, 768), fb);
        assert!(matches!(device.atomic_check(&request), Err(VkmsError::InvalidCommit(_))));
    }

    #[test]
    fn test_check_rejects_framebuffer_on_inactive_crtc() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let device = &output.device;
        let mut request = CommitRequest::disable(device.crtc().id());
        request.framebuffer = Some(device.create_framebuffer(1, Size::new(1024, 768)).unwrap());
        assert!(matches!(device.atomic_check(&request), Err(VkmsError::InvalidCommit(_))));
    }

    #[test]
    fn test_commit_enables_and_disables() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let device = &output.device;
        let fb = device.create_framebuffer(7, Size::new(1024, 768)).unwrap();

        device
            .atomic_commit(CommitRequest::enable(device.crtc().id(), Size::new(1024, 768), fb))
            .unwrap();
        assert!(device.crtc().is_enabled());
        assert_eq!(device.plane().framebuffer(), Some(fb));
        assert_eq!(device.crtc().mode(), Some(Size::new(1024, 768)));

        device.atomic_commit(CommitRequest::disable(device.crtc().id())).unwrap();
        assert!(!device.crtc().is_enabled());
        assert!(!device.crtc().timer_running());
        assert_eq!(device.plane().framebuffer(), None);
        assert_eq!(device.crtc().mode(), None);
    }

    #[test]
    fn test_failed_enable_leaves_mode_untouched() {
        let StandaloneOutput {
            mut device,
            vblanks,
            events,
            ..
        } = VirtualOutputDevice::standalone(test_config()).unwrap();

        // A CRTC whose timer cannot start.
        let clock: SharedClock = Arc::new(SoftwareClock::new());
        device.crtc = Crtc::new(device.crtc.id(), Duration::ZERO, clock, vblanks, events);

        let mode = Size::new(1024, 768);
        let fb = device.create_framebuffer(1, mode).unwrap();
        let err = device
            .atomic_commit(CommitRequest::enable(device.crtc().id(), mode, fb))
            .unwrap_err();
        assert!(matches!(err, VkmsError::Configuration(_)));
        assert!(!device.crtc().is_enabled());
        assert_eq!(device.crtc().mode(), None);
        assert_eq!(device.plane().framebuffer(), None);
    }

    #[test]
    fn test_rejected_flip_returns_its_token() {
        let output = VirtualOutputDevice::standalone(VkmsConfig {
            vblank_period_ns: Some(Duration::from_secs(10).as_nanos() as u64),
            ..test_config()
        })
        .unwrap();
        let device = &output.device;
        let mode = Size::new(1024, 768);
        let fb = device.create_framebuffer(1, mode).unwrap();
        device
            .atomic_commit(CommitRequest::enable(device.crtc().id(), mode, fb))
            .unwrap();

        device.page_flip(fb, Some(CompletionToken::new(1))).unwrap();
        let err = device.page_flip(fb, Some(CompletionToken::new(2))).unwrap_err();
        assert_eq!(err.into_rejected_token().map(|t| t.id()), Some(2));
    }

    #[test]
    fn test_snapshot_serializes() {
        let output = VirtualOutputDevice::standalone(test_config()).unwrap();
        let json = output.device.snapshot().to_json().unwrap();
        assert_eq!(json["name"], "test");
        assert_eq!(json["driver"]["name"], "vkms");
        assert_eq!(json["crtc_state"], "disabled");
        assert_eq!(json["vblank_period_ns"], 10_000_000);
        assert_eq!(json["event_pending"], false);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_registration() {
        let objects = Arc::new(ModeObjectTable::new());
        let clock: SharedClock = Arc::new(SoftwareClock::new());
        let config = VkmsConfig {
            refresh_hz: 0,
            ..Default::default()
        };
        let result = VirtualOutputDevice::new(
            config,
            DeviceCollaborators {
                clock: Arc::clone(&clock),
                vblank_counter: Arc::new(VblankTracker::new(clock, 4)),
                completion_sink: Arc::new(EventQueue::new()),
                registry: objects.clone(),
            },
        );
        assert!(matches!(result, Err(VkmsError::Configuration(_))));
        assert!(objects.is_empty());
    }
}
