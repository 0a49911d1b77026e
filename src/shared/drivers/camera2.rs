// This is free and unencumbered software released into the public domain.

//! Android camera2 NDK platform.

use crate::shared::{CameraError, CameraPlatform, DeviceCallbacks, PermissionSource};
use alloc::borrow::Cow;
use ndk_sys::android_get_device_api_level;
use std::sync::Arc;
use tracing::debug;

mod camera_device;
pub use camera_device::*;

mod camera_manager;
pub use camera_manager::*;

mod camera_output_target;
pub use camera_output_target::*;

mod camera_status;
pub use camera_status::*;

mod capture_request;
pub use capture_request::*;

mod capture_session;
pub use capture_session::*;

mod capture_session_output;
pub use capture_session_output::*;

mod capture_session_output_container;
pub use capture_session_output_container::*;

mod image;
pub use image::*;

mod image_reader;
pub use image_reader::*;

mod media_status;
pub use media_status::*;

mod native_window;
pub use native_window::*;

#[link(name = "camera2ndk")]
unsafe extern "C" {}

#[link(name = "mediandk")]
unsafe extern "C" {}

#[link(name = "android")]
unsafe extern "C" {}

/// The NDK camera2 API first shipped with Android 7.0.
pub const MIN_API_LEVEL: u32 = 24;

pub fn api_level() -> u32 {
    unsafe { android_get_device_api_level() }.max(0) as u32
}

pub struct Camera2Platform {
    manager: CameraManager,
    permission: Arc<dyn PermissionSource>,
    pub api_level: u32,
}

impl Camera2Platform {
    pub fn new(permission: Arc<dyn PermissionSource>) -> Result<Self, CameraError> {
        let api_level = api_level();
        if api_level < MIN_API_LEVEL {
            return Err(CameraError::unsupported(format!(
                "camera2 NDK requires API level {MIN_API_LEVEL}, device has {api_level}"
            )));
        }
        debug!(api_level, "camera2 platform ready");
        Ok(Self {
            manager: CameraManager::new(),
            permission,
            api_level,
        })
    }
}

impl core::fmt::Debug for Camera2Platform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Camera2Platform")
            .field("api_level", &self.api_level)
            .finish_non_exhaustive()
    }
}

impl dogma::Named for Camera2Platform {
    fn name(&self) -> Cow<'_, str> {
        "camera2".into()
    }
}

impl CameraPlatform for Camera2Platform {
    fn has_camera_permission(&self) -> bool {
        self.permission.camera_granted()
    }

    fn camera_ids(&self) -> Result<Vec<String>, CameraError> {
        self.manager
            .get_camera_ids()
            .map_err(|s| s.into_error("listing cameras"))
    }

    fn open_device(&self, id: &str, callbacks: DeviceCallbacks) -> Result<(), CameraError> {
        let device = Camera2Device::open(&self.manager, id, callbacks.clone())?;
        callbacks.opened(Box::new(device));
        Ok(())
    }
}
