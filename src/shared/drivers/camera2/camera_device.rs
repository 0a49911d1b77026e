// This is free and unencumbered software released into the public domain.

use super::{
    CameraManager, CameraOutputTarget, CameraStatus, CaptureRequest, CaptureSession,
    CaptureSessionOutput, CaptureSessionOutputContainer, ImageReader, NativeWindowSurface,
};
use crate::shared::{
    CameraDevice, CameraError, DeviceCallbacks, SessionCallbacks, SessionOutputs,
};
use core::{ffi::c_void, mem::zeroed, ptr::null_mut};
use ndk_sys::{ACameraDevice, ACameraDevice_StateCallbacks, ACameraDevice_close};
use tracing::debug;

/// Maximum images held by the frame reader at once.
const READER_IMAGES: i32 = 2;

#[derive(Debug)]
pub struct Camera2Device {
    id: String,
    handle: *mut ACameraDevice,
    /// Context of the NDK state callbacks, freed once the device is closed.
    callbacks: *mut DeviceCallbacks,
}

unsafe impl Send for Camera2Device {}

impl Drop for Camera2Device {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl Camera2Device {
    pub(crate) fn open(
        manager: &CameraManager,
        id: &str,
        callbacks: DeviceCallbacks,
    ) -> Result<Self, CameraError> {
        let context = Box::into_raw(Box::new(callbacks));
        let mut state_callbacks: ACameraDevice_StateCallbacks = unsafe { zeroed() };
        state_callbacks.context = context as *mut c_void;
        state_callbacks.onDisconnected = Some(on_disconnected);
        state_callbacks.onError = Some(on_error);

        match manager.open_camera(id, &mut state_callbacks) {
            Ok(handle) => Ok(Self {
                id: id.to_string(),
                handle,
                callbacks: context,
            }),
            Err(status) => {
                drop(unsafe { Box::from_raw(context) });
                Err(status.into_error("opening camera"))
            },
        }
    }
}

impl CameraDevice for Camera2Device {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_capture_session(
        &mut self,
        outputs: SessionOutputs<'_>,
        callbacks: SessionCallbacks,
    ) -> Result<(), CameraError> {
        let surface = outputs
            .preview
            .as_any()
            .downcast_ref::<NativeWindowSurface>()
            .ok_or_else(|| CameraError::unsupported("preview surface is not a native window"))?;
        let window = surface.window().ok_or(CameraError::SurfaceUnavailable)?;
        let configure = |status: CameraStatus| status.into_error("configuring capture session");

        let mut container = CaptureSessionOutputContainer::new().map_err(configure)?;
        let mut request = CaptureRequest::preview(self.handle).map_err(configure)?;
        request
            .set_control_mode(outputs.control_mode)
            .map_err(configure)?;

        let mut session_outputs = Vec::with_capacity(2);
        let mut targets = Vec::with_capacity(2);
        let mut windows = vec![window];

        let reader = match outputs.frames {
            Some(frames) => {
                let mut reader = ImageReader::new(outputs.size, READER_IMAGES)
                    .map_err(|s| s.into_error("creating image reader"))?;
                reader
                    .set_frame_sender(frames)
                    .map_err(|s| s.into_error("creating image reader"))?;
                windows.push(reader.window().map_err(|s| s.into_error("creating image reader"))?);
                Some(reader)
            },
            None => None,
        };

        for window in &windows {
            let output = CaptureSessionOutput::new(window).map_err(configure)?;
            container.add(&output).map_err(configure)?;
            session_outputs.push(output);

            let target = CameraOutputTarget::new(window).map_err(configure)?;
            request.add_target(&target).map_err(configure)?;
            targets.push(target);
        }

        match CaptureSession::open(
            self.handle,
            container,
            session_outputs,
            request,
            targets,
            windows,
            reader,
        ) {
            Ok(session) => {
                debug!(device = %self.id, "capture session configured");
                callbacks.configured(Box::new(session));
            },
            Err(err) => callbacks.configure_failed(err),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        if self.handle.is_null() {
            return Ok(());
        }
        let status = unsafe { ACameraDevice_close(self.handle) };
        self.handle = null_mut();
        if !self.callbacks.is_null() {
            drop(unsafe { Box::from_raw(self.callbacks) });
            self.callbacks = null_mut();
        }
        CameraStatus::check(status).map_err(|s| s.into_error("closing camera"))
    }
}

unsafe extern "C" fn on_disconnected(context: *mut c_void, _device: *mut ACameraDevice) {
    let callbacks = unsafe { &*(context as *const DeviceCallbacks) };
    callbacks.disconnected();
}

unsafe extern "C" fn on_error(context: *mut c_void, _device: *mut ACameraDevice, error: i32) {
    let callbacks = unsafe { &*(context as *const DeviceCallbacks) };
    callbacks.error(error);
}
