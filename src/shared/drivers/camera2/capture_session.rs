// This is free and unencumbered software released into the public domain.

use super::{
    CameraOutputTarget, CameraStatus, CaptureRequest, CaptureSessionOutput,
    CaptureSessionOutputContainer, ImageReader, NativeWindow,
};
use crate::shared::{CameraError, CaptureSession as _};
use core::{ffi::c_void, ptr::null_mut};
use ndk_sys::{
    ACameraCaptureSession, ACameraCaptureSession_close, ACameraCaptureSession_setRepeatingRequest,
    ACameraCaptureSession_stateCallbacks, ACameraCaptureSession_stopRepeating, ACameraDevice,
    ACameraDevice_createCaptureSession,
};

/// A configured session together with everything its preview request
/// references. Fields drop after the session is closed, in declaration order.
#[derive(Debug)]
#[allow(unused)]
pub struct CaptureSession {
    handle: *mut ACameraCaptureSession,
    request: CaptureRequest,
    targets: Vec<CameraOutputTarget>,
    outputs: Vec<CaptureSessionOutput>,
    container: CaptureSessionOutputContainer,
    reader: Option<ImageReader>,
    windows: Vec<NativeWindow>,
}

unsafe impl Send for CaptureSession {}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl CaptureSession {
    pub(crate) fn open(
        device: *mut ACameraDevice,
        container: CaptureSessionOutputContainer,
        outputs: Vec<CaptureSessionOutput>,
        request: CaptureRequest,
        targets: Vec<CameraOutputTarget>,
        windows: Vec<NativeWindow>,
        reader: Option<ImageReader>,
    ) -> Result<Self, CameraError> {
        let state_callbacks = ACameraCaptureSession_stateCallbacks {
            context: null_mut(),
            onClosed: Some(on_closed),
            onReady: Some(on_ready),
            onActive: Some(on_active),
        };

        let mut handle = null_mut();
        CameraStatus::check(unsafe {
            ACameraDevice_createCaptureSession(device, container.handle, &state_callbacks, &mut handle)
        })
        .map_err(|s| match s.into_error("configuring capture session") {
            CameraError::DriverError { .. } => CameraError::ConfigureFailed,
            err => err,
        })?;

        Ok(Self {
            handle,
            request,
            targets,
            outputs,
            container,
            reader,
            windows,
        })
    }
}

impl crate::shared::CaptureSession for CaptureSession {
    /// See: https://developer.android.com/ndk/reference/group/camera#acameracapturesession_setrepeatingrequest
    fn set_repeating_request(&mut self) -> Result<(), CameraError> {
        let mut requests = self.request.handle;
        CameraStatus::check(unsafe {
            ACameraCaptureSession_setRepeatingRequest(
                self.handle,
                null_mut(),
                1,
                &mut requests,
                null_mut(),
            )
        })
        .map_err(|s| s.into_error("starting repeating request"))
    }

    fn stop_repeating(&mut self) -> Result<(), CameraError> {
        if self.handle.is_null() {
            return Ok(());
        }
        CameraStatus::check(unsafe { ACameraCaptureSession_stopRepeating(self.handle) })
            .map_err(|s| s.into_error("stopping repeating request"))
    }

    fn close(&mut self) {
        if !self.handle.is_null() {
            unsafe { ACameraCaptureSession_close(self.handle) };
            self.handle = null_mut();
        }
    }
}

unsafe extern "C" fn on_ready(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    tracing::trace!(?session, "capture session ready");
}

unsafe extern "C" fn on_active(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    tracing::trace!(?session, "capture session active");
}

unsafe extern "C" fn on_closed(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    tracing::trace!(?session, "capture session closed");
}
