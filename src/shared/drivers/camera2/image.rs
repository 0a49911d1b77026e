// This is free and unencumbered software released into the public domain.

use super::{MediaResult, MediaStatus};
use crate::shared::{Frame, Plane};
use core::ptr::null_mut;
use ndk_sys::{
    AImage, AImage_delete, AImage_getHeight, AImage_getPlaneData, AImage_getPlanePixelStride,
    AImage_getPlaneRowStride, AImage_getTimestamp, AImage_getWidth,
};

#[derive(Debug)]
pub struct Image {
    pub(crate) handle: *mut AImage,
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe { AImage_delete(self.handle) };
        self.handle = null_mut();
    }
}

impl Image {
    pub fn dimensions(&self) -> MediaResult<(u32, u32)> {
        let (mut width, mut height) = (0, 0);
        MediaStatus::check(unsafe { AImage_getWidth(self.handle, &mut width) })?;
        MediaStatus::check(unsafe { AImage_getHeight(self.handle, &mut height) })?;
        Ok((width.max(0) as u32, height.max(0) as u32))
    }

    pub fn timestamp_ns(&self) -> MediaResult<u64> {
        let mut result = 0;
        MediaStatus::check(unsafe { AImage_getTimestamp(self.handle, &mut result) })?;
        Ok(result.max(0) as u64)
    }

    pub fn plane(&self, index: i32) -> MediaResult<Plane<'_>> {
        let (mut data, mut len) = (null_mut(), 0);
        let (mut row_stride, mut pixel_stride) = (0, 0);
        unsafe {
            MediaStatus::check(AImage_getPlaneData(self.handle, index, &mut data, &mut len))?;
            MediaStatus::check(AImage_getPlaneRowStride(self.handle, index, &mut row_stride))?;
            MediaStatus::check(AImage_getPlanePixelStride(self.handle, index, &mut pixel_stride))?;
        }
        let data = if data.is_null() || len <= 0 {
            &[][..]
        } else {
            // valid until the image is deleted
            unsafe { core::slice::from_raw_parts(data, len as usize) }
        };
        Ok(Plane {
            data,
            row_stride: row_stride.max(0) as usize,
            pixel_stride: pixel_stride.max(1) as usize,
        })
    }

    /// Copies a YUV_420_888 image into a packed I420 frame.
    pub fn to_i420(&self) -> MediaResult<Frame> {
        let (width, height) = self.dimensions()?;
        let planes = [self.plane(0)?, self.plane(1)?, self.plane(2)?];
        Ok(Frame::pack_i420(width, height, planes).with_timestamp_ns(self.timestamp_ns()?))
    }
}
