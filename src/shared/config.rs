// This is free and unencumbered software released into the public domain.

use crate::shared::CameraError;

/// Preview buffer width. The preview is not negotiated against the
/// device's supported stream configurations.
pub const PREVIEW_WIDTH: u32 = 640;

/// Preview buffer height.
pub const PREVIEW_HEIGHT: u32 = 480;

pub const DEFAULT_THREAD_NAME: &str = "CameraBackground";

/// Where the repeating capture request sends its buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameTarget {
    /// Display surface only. Frame sinks are never invoked.
    #[default]
    Preview,
    /// Display surface plus an image reader whose buffers feed the frame sinks.
    PreviewAndReader,
}

impl FrameTarget {
    pub fn delivers_frames(self) -> bool {
        matches!(self, Self::PreviewAndReader)
    }
}

/// `CONTROL_MODE` entry written into the preview request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlMode {
    Off,
    /// Automatic exposure, focus and white balance.
    #[default]
    Auto,
}

impl ControlMode {
    /// Value of the `ACAMERA_CONTROL_MODE` metadata enum.
    pub fn metadata_value(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Auto => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub device: Option<String>,
    pub thread_name: String,
    pub frame_target: FrameTarget,
    pub frame_buffer: usize,
    pub control_mode: ControlMode,
    pub diagnostics: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            frame_target: FrameTarget::Preview,
            frame_buffer: 2,
            control_mode: ControlMode::Auto,
            diagnostics: false,
        }
    }
}

impl CameraConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_frame_target(mut self, target: FrameTarget) -> Self {
        self.frame_target = target;
        self
    }

    pub fn with_frame_buffer(mut self, n: usize) -> Self {
        self.frame_buffer = n.max(1);
        self
    }

    pub fn with_control_mode(mut self, mode: ControlMode) -> Self {
        self.control_mode = mode;
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn preview_size(&self) -> (u32, u32) {
        (PREVIEW_WIDTH, PREVIEW_HEIGHT)
    }

    pub fn validate(&self) -> Result<(), CameraError> {
        if self.thread_name.trim().is_empty() {
            return Err(CameraError::invalid_config("background thread name is empty"));
        }
        if let Some(device) = &self.device {
            if device.trim().is_empty() {
                return Err(CameraError::invalid_config("device id is empty"));
            }
        }
        Ok(())
    }
}
