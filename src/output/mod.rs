mod loopback;
mod result_panel;

pub use loopback::V4L2Output;
pub use result_panel::ResultPanel;

use crate::camera::LensFacing;
use crate::transform::{DisplayRotation, RotationTransform};
use anyhow::Result;
use image::RgbImage;
use std::path::Path;

/// Display surface the live preview is rendered into
pub trait PreviewSurface {
    /// Current layout size (width, height)
    fn size(&self) -> (u32, u32);

    /// Rotation of the display the surface is shown on
    fn display_rotation(&self) -> DisplayRotation;

    /// Returns true once after each layout change
    fn take_layout_change(&mut self) -> bool;

    /// Point the surface at a newly bound preview stream
    fn attach_stream(&mut self, facing: LensFacing, resolution: (u32, u32)) -> Result<()>;

    fn set_transform(&mut self, transform: RotationTransform);

    /// Render one preview frame
    fn present(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Where capture results are shown to the user
pub trait ResultSink {
    /// Short transient message
    fn notify(&mut self, message: &str);

    /// Load a captured file into the result view
    fn show_capture(&mut self, path: &Path) -> Result<()>;
}
