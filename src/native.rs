// This is free and unencumbered software released into the public domain.

//! Identity and one-time initialization of the native library.

use crate::shared::CameraError;
use std::sync::OnceLock;
use tracing::{error, info};

/// Identifies the frame processing engine bundled in this library.
pub fn version() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeInfo {
    pub version: &'static str,
    /// Android API level of the device, if running on Android.
    pub api_level: Option<u32>,
}

static INIT: OnceLock<Result<NativeInfo, String>> = OnceLock::new();

/// Initializes logging and verifies the platform can run the camera. Safe to
/// call any number of times; the first outcome is returned every time.
pub fn initialize() -> Result<&'static NativeInfo, CameraError> {
    INIT.get_or_init(|| {
        crate::logging::init();
        match detect() {
            Ok(info) => {
                info!(version = info.version, api_level = ?info.api_level, "native library initialized");
                Ok(info)
            },
            Err(err) => {
                error!(%err, "native library initialization failed");
                Err(err.to_string())
            },
        }
    })
    .as_ref()
    .map_err(|msg| CameraError::unsupported(msg.clone()))
}

#[cfg(all(feature = "android", target_os = "android"))]
fn detect() -> Result<NativeInfo, CameraError> {
    use crate::shared::drivers::camera2::{MIN_API_LEVEL, api_level};

    let api_level = api_level();
    if api_level < MIN_API_LEVEL {
        return Err(CameraError::unsupported(format!(
            "camera2 NDK requires API level {MIN_API_LEVEL}, device has {api_level}"
        )));
    }
    Ok(NativeInfo {
        version: version(),
        api_level: Some(api_level),
    })
}

#[cfg(not(all(feature = "android", target_os = "android")))]
fn detect() -> Result<NativeInfo, CameraError> {
    Ok(NativeInfo {
        version: version(),
        api_level: None,
    })
}
