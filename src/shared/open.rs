// This is free and unencumbered software released into the public domain.

use super::{CameraConfig, CameraController, CameraError, FrameSink, PermissionSource, PreviewSurface};
use std::sync::Arc;

/// Binds a controller to the camera platform of the current target.
pub fn open_camera(
    permission: Arc<dyn PermissionSource>,
    surface: Arc<dyn PreviewSurface>,
    config: CameraConfig,
    on_frame: FrameSink,
) -> Result<CameraController, CameraError> {
    cfg_if::cfg_if! {
        if #[cfg(all(feature = "android", target_os = "android"))] {
            let platform = super::drivers::camera2::Camera2Platform::new(permission)?;
            CameraController::new(Arc::new(platform), surface, config, on_frame)
        } else {
            let _ = (permission, surface, config, on_frame);
            Err(CameraError::NoDriver)
        }
    }
}
