// This is free and unencumbered software released into the public domain.

//! Controller state machine.
//!
//! Every notification the controller reacts to (host lifecycle, surface
//! availability, device and session completions) is a [`LifecycleEvent`].
//! [`CameraState::on`] maps each `(state, event)` pair to at most one
//! [`Transition`]; pairs without an entry leave the state untouched.

use crate::shared::{CameraDevice, CameraError, CaptureSession};
use derive_more::Display;

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum CameraState {
    #[default]
    #[display("CLOSED")]
    Closed,
    #[display("AWAITING_SURFACE")]
    AwaitingSurface,
    #[display("OPENING")]
    Opening,
    #[display("CONFIGURING")]
    Configuring,
    #[display("STREAMING")]
    Streaming,
    /// Device open, no capture session streaming.
    #[display("OPEN_IDLE")]
    OpenIdle,
}

impl CameraState {
    pub fn has_device(self) -> bool {
        matches!(self, Self::Configuring | Self::Streaming | Self::OpenIdle)
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Closed => 0,
            Self::AwaitingSurface => 1,
            Self::Opening => 2,
            Self::Configuring => 3,
            Self::Streaming => 4,
            Self::OpenIdle => 5,
        }
    }

    pub fn on(self, event: EventKind) -> Option<Transition> {
        use Action::*;
        use CameraState::*;
        use EventKind as E;

        let (to, actions): (CameraState, &'static [Action]) = match (self, event) {
            (_, E::Stop) => (Closed, &[CloseSession, CloseDevice]),

            (Closed, E::Start { surface_available: true }) => (Opening, &[OpenDevice]),
            (Closed, E::Start { surface_available: false }) => (AwaitingSurface, &[AwaitSurface]),
            (AwaitingSurface, E::SurfaceAvailable) => (Opening, &[OpenDevice]),

            (Opening, E::PermissionDenied) => (Closed, &[]),
            (Opening, E::DeviceOpened) => (Configuring, &[ConfigureSession]),

            (Opening | Configuring | Streaming | OpenIdle, E::DeviceDisconnected | E::DeviceError) => {
                (Closed, &[CloseSession, CloseDevice])
            },

            (Configuring, E::SessionConfigured) => (Streaming, &[StartRepeating]),
            (Configuring, E::SessionConfigureFailed) => (OpenIdle, &[]),
            (Streaming, E::RepeatingFailed) => (OpenIdle, &[CloseSession]),

            _ => return None,
        };
        Some(Transition { from: self, to, actions })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: CameraState,
    pub to: CameraState,
    pub actions: &'static [Action],
}

/// Side effects requested by a transition, executed in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Wait for the surface availability notification.
    AwaitSurface,
    OpenDevice,
    ConfigureSession,
    StartRepeating,
    CloseSession,
    CloseDevice,
}

/// Payload-free view of a [`LifecycleEvent`], used as the transition table key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Start { surface_available: bool },
    SurfaceAvailable,
    SurfaceSizeChanged,
    SurfaceDestroyed,
    PermissionDenied,
    DeviceOpened,
    DeviceDisconnected,
    DeviceError,
    SessionConfigured,
    SessionConfigureFailed,
    RepeatingFailed,
    Stop,
}

pub enum LifecycleEvent {
    Start { surface_available: bool },
    SurfaceAvailable { width: u32, height: u32 },
    SurfaceSizeChanged { width: u32, height: u32 },
    SurfaceDestroyed,
    PermissionDenied,
    DeviceOpened(Box<dyn CameraDevice>),
    DeviceDisconnected { device: String },
    DeviceError(CameraError),
    SessionConfigured(Box<dyn CaptureSession>),
    SessionConfigureFailed(CameraError),
    RepeatingFailed(CameraError),
    Stop,
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start { surface_available } => EventKind::Start {
                surface_available: *surface_available,
            },
            Self::SurfaceAvailable { .. } => EventKind::SurfaceAvailable,
            Self::SurfaceSizeChanged { .. } => EventKind::SurfaceSizeChanged,
            Self::SurfaceDestroyed => EventKind::SurfaceDestroyed,
            Self::PermissionDenied => EventKind::PermissionDenied,
            Self::DeviceOpened(_) => EventKind::DeviceOpened,
            Self::DeviceDisconnected { .. } => EventKind::DeviceDisconnected,
            Self::DeviceError(_) => EventKind::DeviceError,
            Self::SessionConfigured(_) => EventKind::SessionConfigured,
            Self::SessionConfigureFailed(_) => EventKind::SessionConfigureFailed,
            Self::RepeatingFailed(_) => EventKind::RepeatingFailed,
            Self::Stop => EventKind::Stop,
        }
    }
}

impl core::fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DeviceOpened(device) => f.debug_tuple("DeviceOpened").field(&device.id()).finish(),
            Self::DeviceDisconnected { device } => f
                .debug_struct("DeviceDisconnected")
                .field("device", device)
                .finish(),
            Self::DeviceError(err) | Self::SessionConfigureFailed(err) | Self::RepeatingFailed(err) => {
                write!(f, "{:?}({err})", self.kind())
            },
            Self::SurfaceAvailable { width, height } | Self::SurfaceSizeChanged { width, height } => {
                write!(f, "{:?}({width}x{height})", self.kind())
            },
            _ => write!(f, "{:?}", self.kind()),
        }
    }
}
