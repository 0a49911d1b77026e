// This is free and unencumbered software released into the public domain.

use super::{CameraOutputTarget, CameraResult, CameraStatus};
use crate::shared::ControlMode;
use core::ptr::null_mut;
use ndk_sys::{
    ACameraDevice, ACameraDevice_createCaptureRequest, ACameraDevice_request_template,
    ACaptureRequest, ACaptureRequest_addTarget, ACaptureRequest_free, ACaptureRequest_setEntry_u8,
    acamera_metadata_tag,
};

#[derive(Debug)]
pub struct CaptureRequest {
    pub(crate) handle: *mut ACaptureRequest,
}

impl Drop for CaptureRequest {
    fn drop(&mut self) {
        unsafe { ACaptureRequest_free(self.handle) };
        self.handle = null_mut();
    }
}

impl CaptureRequest {
    pub fn preview(device: *mut ACameraDevice) -> CameraResult<Self> {
        let mut handle = null_mut();
        CameraStatus::check(unsafe {
            ACameraDevice_createCaptureRequest(
                device,
                ACameraDevice_request_template::TEMPLATE_PREVIEW,
                &mut handle,
            )
        })?;
        Ok(Self { handle })
    }

    pub fn add_target(&mut self, target: &CameraOutputTarget) -> CameraResult {
        CameraStatus::check(unsafe { ACaptureRequest_addTarget(self.handle, target.handle) })
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) -> CameraResult {
        let value = mode.metadata_value();
        CameraStatus::check(unsafe {
            ACaptureRequest_setEntry_u8(
                self.handle,
                acamera_metadata_tag::ACAMERA_CONTROL_MODE.0,
                1,
                &value,
            )
        })
    }
}
