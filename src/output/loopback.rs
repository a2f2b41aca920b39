use super::PreviewSurface;
use crate::camera::LensFacing;
use crate::transform::{DisplayRotation, RotationTransform};
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Preview surface backed by a v4l2loopback device
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    rotation: DisplayRotation,
    transform: Option<RotationTransform>,
    layout_changed: bool,
    source: Option<LensFacing>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(
        device_path: P,
        width: u32,
        height: u32,
        rotation: DisplayRotation,
    ) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{}, display {})",
            path.display(),
            width,
            height,
            rotation
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let format = Format::new(width, height, FourCC::new(b"YUYV"));
        Output::set_format(&device, &format).context("Failed to set YUYV output format")?;

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width,
            height,
            rotation,
            transform: None,
            layout_changed: true,
            source: None,
        })
    }

    /// Change the display rotation; counts as a layout change
    pub fn set_display_rotation(&mut self, rotation: DisplayRotation) {
        if rotation != self.rotation {
            tracing::info!("Display rotation changed to {}", rotation);
            self.rotation = rotation;
            self.layout_changed = true;
        }
    }

    /// Convert RGB frame to YUV422 (YUYV) format
    fn rgb_to_yuyv(rgb_image: &RgbImage) -> Vec<u8> {
        let (width, height) = rgb_image.dimensions();
        let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

        for y in 0..height {
            for x in (0..width).step_by(2) {
                let pixel1 = rgb_image.get_pixel(x, y);
                let pixel2 = if x + 1 < width {
                    rgb_image.get_pixel(x + 1, y)
                } else {
                    pixel1
                };

                let (y1, u1, v1) = rgb_to_yuv(pixel1[0], pixel1[1], pixel1[2]);
                let (y2, u2, v2) = rgb_to_yuv(pixel2[0], pixel2[1], pixel2[2]);

                // Chroma is shared by the pixel pair
                let u = ((u1 as u16 + u2 as u16) / 2) as u8;
                let v = ((v1 as u16 + v2 as u16) / 2) as u8;

                // YUYV format: Y0 U Y1 V
                yuyv.extend_from_slice(&[y1, u, y2, v]);
            }
        }

        yuyv
    }
}

fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl PreviewSurface for V4L2Output {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn display_rotation(&self) -> DisplayRotation {
        self.rotation
    }

    fn take_layout_change(&mut self) -> bool {
        std::mem::take(&mut self.layout_changed)
    }

    fn attach_stream(&mut self, facing: LensFacing, resolution: (u32, u32)) -> Result<()> {
        tracing::info!(
            "Preview attached to {} camera stream ({}x{})",
            facing,
            resolution.0,
            resolution.1
        );
        self.source = Some(facing);
        Ok(())
    }

    fn set_transform(&mut self, transform: RotationTransform) {
        tracing::debug!(
            "Preview transform: {}° about ({}, {})",
            transform.rotation_degrees(),
            transform.pivot().0,
            transform.pivot().1
        );
        self.transform = Some(transform);
    }

    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        if self.source.is_none() {
            tracing::debug!("Dropping frame, no stream attached");
            return Ok(());
        }

        let frame = if frame.dimensions() != (self.width, self.height) {
            image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            )
        } else {
            frame.clone()
        };

        let frame = match &self.transform {
            Some(transform) => transform.apply(&frame),
            None => frame,
        };

        let yuyv_data = Self::rgb_to_yuyv(&frame);

        self.file
            .write_all(&yuyv_data)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }
}
