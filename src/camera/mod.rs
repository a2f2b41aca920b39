mod nokhwa_camera;

pub use nokhwa_camera::NokhwaCameraProvider;

use clap::ValueEnum;
use image::RgbImage;
use std::fmt;

/// Which physical camera feeds the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LensFacing {
    Front,
    #[default]
    Back,
}

impl LensFacing {
    pub fn toggled(self) -> Self {
        match self {
            LensFacing::Front => LensFacing::Back,
            LensFacing::Back => LensFacing::Front,
        }
    }
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "back"),
        }
    }
}

/// Trade-off used when taking a still
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CaptureMode {
    /// Reuse the frame currently on the preview
    #[default]
    MinLatency,
    /// Ask the camera for a fresh frame
    MaxQuality,
}

/// Preview use case: what the live stream should look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewConfig {
    target_resolution: (u32, u32),
    lens_facing: LensFacing,
}

impl PreviewConfig {
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder::default()
    }

    pub fn target_resolution(&self) -> (u32, u32) {
        self.target_resolution
    }

    pub fn lens_facing(&self) -> LensFacing {
        self.lens_facing
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreviewConfigBuilder {
    target_resolution: (u32, u32),
    lens_facing: LensFacing,
}

impl Default for PreviewConfigBuilder {
    fn default() -> Self {
        Self {
            target_resolution: (640, 480),
            lens_facing: LensFacing::default(),
        }
    }
}

impl PreviewConfigBuilder {
    pub fn target_resolution(mut self, width: u32, height: u32) -> Self {
        self.target_resolution = (width, height);
        self
    }

    pub fn lens_facing(mut self, lens_facing: LensFacing) -> Self {
        self.lens_facing = lens_facing;
        self
    }

    pub fn build(self) -> PreviewConfig {
        PreviewConfig {
            target_resolution: self.target_resolution,
            lens_facing: self.lens_facing,
        }
    }
}

/// Still-capture use case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    lens_facing: LensFacing,
    capture_mode: CaptureMode,
}

impl CaptureConfig {
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }

    pub fn lens_facing(&self) -> LensFacing {
        self.lens_facing
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture_mode
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureConfigBuilder {
    lens_facing: LensFacing,
    capture_mode: CaptureMode,
}

impl CaptureConfigBuilder {
    pub fn lens_facing(mut self, lens_facing: LensFacing) -> Self {
        self.lens_facing = lens_facing;
        self
    }

    pub fn capture_mode(mut self, capture_mode: CaptureMode) -> Self {
        self.capture_mode = capture_mode;
        self
    }

    pub fn build(self) -> CaptureConfig {
        CaptureConfig {
            lens_facing: self.lens_facing,
            capture_mode: self.capture_mode,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("no {0} camera available")]
    NoCameraWithFacing(LensFacing),

    #[error("camera backend error: {0}")]
    Backend(String),
}

/// Camera framework the session binds its use cases to
///
/// Implementations own the hardware. Callers must release a binding with
/// [`BoundUseCases::unbind`] before binding again.
pub trait CameraProvider {
    type Binding: BoundUseCases;

    /// Fails with [`CameraError::NoCameraWithFacing`] when no camera with
    /// `facing` is attached.
    fn camera_with_lens_facing(&self, facing: LensFacing) -> Result<(), CameraError>;

    /// Acquire the camera and start the preview stream
    fn bind(
        &mut self,
        preview: &PreviewConfig,
        capture: &CaptureConfig,
    ) -> Result<Self::Binding, CameraError>;
}

/// Preview and still-capture use cases bound to one camera
pub trait BoundUseCases {
    fn lens_facing(&self) -> LensFacing;

    /// Next frame of the live preview stream
    fn next_preview_frame(&mut self) -> Result<RgbImage, CameraError>;

    /// A frame taken for a still capture, bypassing anything the preview
    /// stream has buffered
    fn take_still(&mut self) -> Result<RgbImage, CameraError>;

    /// Release the camera
    fn unbind(self) -> Result<(), CameraError>;
}
