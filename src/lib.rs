// This is free and unencumbered software released into the public domain.

//! Native side of the edge detection app: the camera lifecycle controller,
//! its Android camera2 platform, and the JNI bridge.

extern crate alloc;

pub mod logging;
pub mod native;
pub mod shared;

#[cfg(all(feature = "android", target_os = "android"))]
mod ffi;
