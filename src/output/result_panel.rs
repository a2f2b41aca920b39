use super::ResultSink;
use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Shows the last captured photo
///
/// Captured files are decoded, center-cropped and scaled to the panel size.
/// When `save_to` is set the panel is also written there so an image viewer
/// can follow it.
pub struct ResultPanel {
    width: u32,
    height: u32,
    save_to: Option<PathBuf>,
    current: Option<RgbImage>,
}

impl ResultPanel {
    pub fn new(width: u32, height: u32, save_to: Option<PathBuf>) -> Self {
        Self {
            width,
            height,
            save_to,
            current: None,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&RgbImage> {
        self.current.as_ref()
    }
}

/// Decode `path` and scale it to fill `width`x`height`, cropping the overflow
/// evenly on both sides.
pub fn load_center_crop(path: &Path, width: u32, height: u32) -> Result<RgbImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(image.resize_to_fill(width, height, FilterType::Triangle).to_rgb8())
}

impl ResultSink for ResultPanel {
    fn notify(&mut self, message: &str) {
        tracing::info!("{}", message);
        println!("{}", message);
    }

    fn show_capture(&mut self, path: &Path) -> Result<()> {
        let _span = tracing::debug_span!("show_capture").entered();

        let image = load_center_crop(path, self.width, self.height)?;

        if let Some(save_to) = &self.save_to {
            image
                .save(save_to)
                .with_context(|| format!("Failed to write result view to {}", save_to.display()))?;
        }

        self.current = Some(image);
        Ok(())
    }
}
