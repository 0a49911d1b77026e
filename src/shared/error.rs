// This is free and unencumbered software released into the public domain.

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no camera platform available for this target")]
    NoDriver,

    #[error("no camera device available")]
    NoCamera,

    #[error("camera permission not granted")]
    PermissionDenied,

    #[error("preview surface is not available")]
    SurfaceUnavailable,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("controller closed")]
    Closed,

    #[error("camera {device} disconnected")]
    Disconnected { device: String },

    #[error("camera {device} reported error {code}")]
    Device { device: String, code: i32 },

    #[error("capture session configuration failed")]
    ConfigureFailed,

    #[error("failed to spawn background thread")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("background thread {thread} panicked")]
    ThreadPanicked { thread: String },

    #[error("driver error while {context}")]
    DriverError {
        context: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Other(String),
}

impl CameraError {
    #[inline]
    pub fn driver(context: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::DriverError {
            context,
            source: Box::new(source),
        }
    }

    #[inline]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    #[inline]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = CameraError::driver("opening camera", io);
        assert_eq!(err.to_string(), "driver error while opening camera");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("boom"));
    }
}
