// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraError, PreviewSurface};
use core::any::Any;
use ndk_sys::{
    ANativeWindow, ANativeWindow_acquire, ANativeWindow_fromSurface, ANativeWindow_release,
    ANativeWindow_setBuffersGeometry,
};
use std::sync::Mutex;

/// An owned `ANativeWindow` reference.
#[derive(Debug)]
pub struct NativeWindow {
    pub(crate) handle: *mut ANativeWindow,
}

unsafe impl Send for NativeWindow {}

impl Drop for NativeWindow {
    fn drop(&mut self) {
        unsafe { ANativeWindow_release(self.handle) };
    }
}

impl Clone for NativeWindow {
    fn clone(&self) -> Self {
        unsafe { ANativeWindow_acquire(self.handle) };
        Self {
            handle: self.handle,
        }
    }
}

impl NativeWindow {
    /// # Safety
    /// `env` must be the JNI environment of the current thread and `surface`
    /// a live `android.view.Surface` reference.
    pub unsafe fn from_surface(
        env: *mut jni::sys::JNIEnv,
        surface: jni::sys::jobject,
    ) -> Option<Self> {
        let handle = unsafe { ANativeWindow_fromSurface(env as *mut _, surface as _) };
        (!handle.is_null()).then_some(Self { handle })
    }

    /// Takes over a reference the caller already holds.
    ///
    /// # Safety
    /// `handle` must be a valid window with one reference owned by the caller.
    pub(crate) unsafe fn from_raw(handle: *mut ANativeWindow) -> Self {
        Self { handle }
    }
}

/// The host's preview surface. Empty until the host attaches a window.
#[derive(Debug, Default)]
pub struct NativeWindowSurface {
    window: Mutex<Option<NativeWindow>>,
}

impl NativeWindowSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, window: NativeWindow) {
        *self.window.lock().unwrap_or_else(|p| p.into_inner()) = Some(window);
    }

    pub fn detach(&self) -> Option<NativeWindow> {
        self.window.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    /// A new reference to the attached window.
    pub fn window(&self) -> Option<NativeWindow> {
        self.window.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl PreviewSurface for NativeWindowSurface {
    fn is_available(&self) -> bool {
        self.window.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    fn set_default_buffer_size(&self, width: u32, height: u32) -> Result<(), CameraError> {
        let window = self.window().ok_or(CameraError::SurfaceUnavailable)?;
        // format 0 keeps the window's current pixel format
        let rc = unsafe {
            ANativeWindow_setBuffersGeometry(window.handle, width as i32, height as i32, 0)
        };
        if rc != 0 {
            return Err(CameraError::other(format!(
                "ANativeWindow_setBuffersGeometry failed with {rc}"
            )));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
