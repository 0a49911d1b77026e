// This is free and unencumbered software released into the public domain.

//! Seams between the lifecycle controller and the camera platform.
//!
//! Opening a device and configuring a session complete through callbacks
//! ([`DeviceCallbacks`], [`SessionCallbacks`]) which may fire on any thread;
//! they only enqueue a [`LifecycleEvent`] onto the controller's background
//! thread.

use crate::shared::{CameraError, ControlMode, EventSender, FrameSender, LifecycleEvent};
use std::{
    any::Any,
    sync::atomic::{AtomicBool, Ordering},
};

pub trait PermissionSource: Send + Sync {
    fn camera_granted(&self) -> bool;
}

/// Permission state pushed in by the host whenever its grant result changes.
#[derive(Debug, Default)]
pub struct PermissionFlag(AtomicBool);

impl PermissionFlag {
    pub fn new(granted: bool) -> Self {
        Self(AtomicBool::new(granted))
    }

    pub fn set(&self, granted: bool) {
        self.0.store(granted, Ordering::SeqCst);
    }
}

impl PermissionSource for PermissionFlag {
    fn camera_granted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Display-bound target receiving the live preview. Owned by the host.
pub trait PreviewSurface: Send + Sync {
    fn is_available(&self) -> bool;

    /// Sets the size of the buffers the camera will produce into this surface.
    fn set_default_buffer_size(&self, width: u32, height: u32) -> Result<(), CameraError>;

    fn as_any(&self) -> &dyn Any;
}

pub trait CameraPlatform: dogma::Named + Send + Sync {
    fn has_camera_permission(&self) -> bool;

    fn camera_ids(&self) -> Result<Vec<String>, CameraError>;

    /// Starts opening `id`. Exactly one of the callbacks' `opened`,
    /// `disconnected` or `error` reports the outcome unless this returns `Err`.
    fn open_device(&self, id: &str, callbacks: DeviceCallbacks) -> Result<(), CameraError>;
}

/// An opened camera. Implementations release the device on drop if
/// [`CameraDevice::close`] was never called.
pub trait CameraDevice: Send {
    fn id(&self) -> &str;

    /// Starts configuring a capture session for `outputs`. The outcome is
    /// reported through `callbacks` unless this returns `Err`.
    fn create_capture_session(
        &mut self,
        outputs: SessionOutputs<'_>,
        callbacks: SessionCallbacks,
    ) -> Result<(), CameraError>;

    fn close(&mut self) -> Result<(), CameraError>;
}

/// A configured capture session. Closed on drop if still open.
pub trait CaptureSession: Send {
    /// Issues the standing preview request built at configuration time.
    fn set_repeating_request(&mut self) -> Result<(), CameraError>;

    fn stop_repeating(&mut self) -> Result<(), CameraError>;

    fn close(&mut self);
}

pub struct SessionOutputs<'a> {
    pub preview: &'a dyn PreviewSurface,
    pub size: (u32, u32),
    pub control_mode: ControlMode,
    /// Present when the session must also feed an image reader.
    pub frames: Option<FrameSender>,
}

#[derive(Clone, Debug)]
pub struct DeviceCallbacks {
    device: String,
    events: EventSender,
}

impl DeviceCallbacks {
    pub(crate) fn new(device: impl Into<String>, events: EventSender) -> Self {
        Self {
            device: device.into(),
            events,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device
    }

    pub fn opened(&self, device: Box<dyn CameraDevice>) {
        self.events.post(LifecycleEvent::DeviceOpened(device));
    }

    pub fn disconnected(&self) {
        self.events.post(LifecycleEvent::DeviceDisconnected {
            device: self.device.clone(),
        });
    }

    pub fn error(&self, code: i32) {
        self.events.post(LifecycleEvent::DeviceError(CameraError::Device {
            device: self.device.clone(),
            code,
        }));
    }
}

#[derive(Clone, Debug)]
pub struct SessionCallbacks {
    events: EventSender,
}

impl SessionCallbacks {
    pub(crate) fn new(events: EventSender) -> Self {
        Self { events }
    }

    pub fn configured(&self, session: Box<dyn CaptureSession>) {
        self.events.post(LifecycleEvent::SessionConfigured(session));
    }

    pub fn configure_failed(&self, error: CameraError) {
        self.events.post(LifecycleEvent::SessionConfigureFailed(error));
    }
}
