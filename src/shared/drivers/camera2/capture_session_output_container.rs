// This is free and unencumbered software released into the public domain.

use super::{CameraResult, CameraStatus, CaptureSessionOutput};
use core::ptr::null_mut;
use ndk_sys::{
    ACaptureSessionOutputContainer, ACaptureSessionOutputContainer_add,
    ACaptureSessionOutputContainer_create, ACaptureSessionOutputContainer_free,
};

#[derive(Debug)]
pub struct CaptureSessionOutputContainer {
    pub(crate) handle: *mut ACaptureSessionOutputContainer,
}

impl Drop for CaptureSessionOutputContainer {
    fn drop(&mut self) {
        // See: https://developer.android.com/ndk/reference/group/camera#acapturesessionoutputcontainer_free
        unsafe { ACaptureSessionOutputContainer_free(self.handle) };
        self.handle = null_mut();
    }
}

impl CaptureSessionOutputContainer {
    pub fn new() -> CameraResult<Self> {
        let mut handle = null_mut();
        CameraStatus::check(unsafe { ACaptureSessionOutputContainer_create(&mut handle) })?;
        Ok(Self { handle })
    }

    pub fn add(&mut self, output: &CaptureSessionOutput) -> CameraResult {
        CameraStatus::check(unsafe {
            ACaptureSessionOutputContainer_add(self.handle, output.handle)
        })
    }
}
