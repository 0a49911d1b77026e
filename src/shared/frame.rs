// This is free and unencumbered software released into the public domain.

use bytes::Bytes;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0: full-resolution Y, then quarter-resolution U and V.
    I420,
}

/// One plane of a strided YUV image, as exposed by an image reader.
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Plane<'_> {
    fn copy_into(&self, out: &mut Vec<u8>, width: usize, height: usize) {
        for row in 0..height {
            let start = row * self.row_stride;
            if self.pixel_stride == 1 {
                let end = (start + width).min(self.data.len());
                out.extend_from_slice(&self.data[start.min(end)..end]);
                out.resize(out.len() + (start + width - end.max(start)), 0);
            } else {
                out.extend((0..width).map(|col| {
                    self.data
                        .get(start + col * self.pixel_stride)
                        .copied()
                        .unwrap_or(0)
                }));
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub pixel_format: PixelFormat,
    pub timestamp_ns: u64,
}

impl Frame {
    pub fn new_i420(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            stride: width,
            pixel_format: PixelFormat::I420,
            timestamp_ns: 0,
        }
    }

    pub fn with_timestamp_ns(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Byte length of a packed I420 buffer for the given dimensions.
    pub fn i420_len(width: u32, height: u32) -> usize {
        let luma = width as usize * height as usize;
        let chroma = width.div_ceil(2) as usize * height.div_ceil(2) as usize;
        luma + 2 * chroma
    }

    /// Packs strided Y, U and V planes into a contiguous I420 frame. Bytes
    /// missing from a short plane are filled with zero.
    pub fn pack_i420(width: u32, height: u32, planes: [Plane<'_>; 3]) -> Self {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        let mut data = Vec::with_capacity(Self::i420_len(width, height));
        let [y, u, v] = planes;
        y.copy_into(&mut data, w, h);
        u.copy_into(&mut data, cw, ch);
        v.copy_into(&mut data, cw, ch);
        Self::new_i420(data, width, height)
    }

    /// The luma plane, which is what edge detection consumes.
    pub fn luma(&self) -> &[u8] {
        let len = (self.stride as usize * self.height as usize).min(self.data.len());
        &self.data[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i420_len_rounds_chroma_up() {
        assert_eq!(Frame::i420_len(640, 480), 640 * 480 * 3 / 2);
        assert_eq!(Frame::i420_len(3, 3), 9 + 2 * 4);
    }

    #[test]
    fn luma_is_the_leading_plane() {
        let mut data = vec![7u8; 4 * 2];
        data.extend_from_slice(&[1, 2, 3, 4]);
        let frame = Frame::new_i420(data, 4, 2).with_timestamp_ns(42);
        assert_eq!(frame.luma(), &[7u8; 8]);
        assert_eq!(frame.timestamp_ns, 42);
        assert_eq!(frame.pixel_format, PixelFormat::I420);
    }

    #[test]
    fn pack_i420_drops_row_padding() {
        let y = [1, 2, 0, 0, 3, 4, 0, 0];
        let u = [5, 0];
        let v = [6, 0];
        let frame = Frame::pack_i420(
            2,
            2,
            [
                Plane { data: &y, row_stride: 4, pixel_stride: 1 },
                Plane { data: &u, row_stride: 2, pixel_stride: 1 },
                Plane { data: &v, row_stride: 2, pixel_stride: 1 },
            ],
        );
        assert_eq!(&frame.data[..], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(frame.data.len(), Frame::i420_len(2, 2));
    }

    #[test]
    fn pack_i420_deinterleaves_semi_planar_chroma() {
        // NV21-style layout: V and U share one buffer, two bytes apart.
        let y = [9u8; 16];
        let vu = [20, 10, 21, 11, 22, 12, 23, 13];
        let frame = Frame::pack_i420(
            4,
            4,
            [
                Plane { data: &y, row_stride: 4, pixel_stride: 1 },
                Plane { data: &vu[1..], row_stride: 4, pixel_stride: 2 },
                Plane { data: &vu, row_stride: 4, pixel_stride: 2 },
            ],
        );
        assert_eq!(&frame.data[16..20], &[10, 11, 12, 13]);
        assert_eq!(&frame.data[20..], &[20, 21, 22, 23]);
    }

    #[test]
    fn pack_i420_zero_fills_short_planes() {
        let y = [1, 2, 3];
        let frame = Frame::pack_i420(
            2,
            2,
            [
                Plane { data: &y, row_stride: 2, pixel_stride: 1 },
                Plane { data: &[], row_stride: 1, pixel_stride: 1 },
                Plane { data: &[], row_stride: 1, pixel_stride: 1 },
            ],
        );
        assert_eq!(&frame.data[..], &[1, 2, 3, 0, 0, 0]);
    }
}
