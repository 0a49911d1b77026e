// This is free and unencumbered software released into the public domain.

use super::{Image, MediaResult, MediaStatus, NativeWindow};
use crate::shared::FrameSender;
use core::{ffi::c_void, ptr::null_mut};
use ndk_sys::{
    AIMAGE_FORMATS, AImageReader, AImageReader_ImageListener, AImageReader_acquireLatestImage,
    AImageReader_delete, AImageReader_getWindow, AImageReader_new, AImageReader_setImageListener,
    ANativeWindow_acquire,
};

/// A YUV_420_888 image reader whose images are packed and handed to a
/// [`FrameSender`].
#[derive(Debug)]
pub struct ImageReader {
    pub(crate) handle: *mut AImageReader,
    sender: *mut FrameSender,
}

impl Drop for ImageReader {
    fn drop(&mut self) {
        unsafe {
            AImageReader_delete(self.handle);
            if !self.sender.is_null() {
                drop(Box::from_raw(self.sender));
            }
        }
        self.handle = null_mut();
        self.sender = null_mut();
    }
}

impl ImageReader {
    pub fn new(dimensions: (u32, u32), max_images: i32) -> MediaResult<Self> {
        let (width, height) = dimensions;
        let mut handle = null_mut();
        MediaStatus::check(unsafe {
            AImageReader_new(
                width as i32,
                height as i32,
                AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32,
                max_images,
                &mut handle,
            )
        })?;
        Ok(Self {
            handle,
            sender: null_mut(),
        })
    }

    /// The reader's input window. The reader keeps its own reference.
    pub fn window(&self) -> MediaResult<NativeWindow> {
        let mut window = null_mut();
        MediaStatus::check(unsafe { AImageReader_getWindow(self.handle, &mut window) })?;
        unsafe {
            ANativeWindow_acquire(window);
            Ok(NativeWindow::from_raw(window))
        }
    }

    pub fn acquire_latest_image(&self) -> MediaResult<Image> {
        let mut handle = null_mut();
        MediaStatus::check(unsafe { AImageReader_acquireLatestImage(self.handle, &mut handle) })?;
        Ok(Image { handle })
    }

    pub fn set_frame_sender(&mut self, sender: FrameSender) -> MediaResult {
        let context = Box::into_raw(Box::new(sender));
        let mut listener = AImageReader_ImageListener {
            context: context as *mut c_void,
            onImageAvailable: Some(on_image_available),
        };
        if let Err(status) =
            MediaStatus::check(unsafe { AImageReader_setImageListener(self.handle, &mut listener) })
        {
            drop(unsafe { Box::from_raw(context) });
            return Err(status);
        }
        self.sender = context;
        Ok(())
    }
}

unsafe extern "C" fn on_image_available(context: *mut c_void, reader: *mut AImageReader) {
    let sender = unsafe { &*(context as *const FrameSender) };
    let reader = core::mem::ManuallyDrop::new(ImageReader {
        handle: reader,
        sender: null_mut(),
    });
    let image = match reader.acquire_latest_image() {
        Ok(image) => image,
        Err(status) => {
            tracing::trace!(%status, "no image to acquire");
            return;
        },
    };
    match image.to_i420() {
        Ok(frame) => sender.send(frame),
        Err(status) => tracing::warn!(%status, "failed to read camera image"),
    }
}
