//! Capture session controller
//!
//! Owns the camera binding, the preview surface and the capture worker.
//! All calls come from the display thread; only the JPEG writing happens
//! on the background worker.

use crate::camera::{
    BoundUseCases, CameraError, CameraProvider, CaptureConfig, CaptureMode, LensFacing,
    PreviewConfig,
};
use crate::capture::{CaptureError, CaptureErrorKind, CaptureNamer, CaptureWorker, PendingCapture};
use crate::output::PreviewSurface;
use crate::transform::RotationTransform;
use image::RgbImage;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("camera is already bound")]
    AlreadyBound,

    #[error("no camera is bound")]
    NotBound,

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("preview surface error: {0:#}")]
    Surface(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound(LensFacing),
}

/// What happens to the facing flag when the switched-to camera is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchPolicy {
    /// The flag stays toggled, the binding stays on the old camera
    #[default]
    KeepToggle,
    /// The flag is restored so it matches the binding
    Rollback,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub target_resolution: (u32, u32),
    pub capture_mode: CaptureMode,
    pub media_dir: PathBuf,
    pub switch_policy: SwitchPolicy,
}

pub struct CaptureSessionController<P: CameraProvider, S> {
    provider: P,
    surface: S,
    settings: SessionSettings,
    lens_facing: LensFacing,
    binding: Option<P::Binding>,
    last_frame: Option<RgbImage>,
    namer: CaptureNamer,
    worker: CaptureWorker,
}

impl<P: CameraProvider, S: PreviewSurface> CaptureSessionController<P, S> {
    pub fn new(provider: P, surface: S, settings: SessionSettings) -> std::io::Result<Self> {
        Ok(Self {
            provider,
            surface,
            settings,
            lens_facing: LensFacing::default(),
            binding: None,
            last_frame: None,
            namer: CaptureNamer::new(),
            worker: CaptureWorker::spawn()?,
        })
    }

    pub fn state(&self) -> BindingState {
        match &self.binding {
            Some(binding) => BindingState::Bound(binding.lens_facing()),
            None => BindingState::Unbound,
        }
    }

    /// The selected facing. Can differ from [`Self::bound_facing`] after a
    /// failed switch under [`SwitchPolicy::KeepToggle`].
    pub fn lens_facing(&self) -> LensFacing {
        self.lens_facing
    }

    #[cfg(test)]
    pub fn bound_facing(&self) -> Option<LensFacing> {
        self.binding.as_ref().map(|b| b.lens_facing())
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Bind preview and still capture for `facing` and attach the preview
    /// surface to the new stream
    pub fn start(&mut self, facing: LensFacing) -> Result<(), SessionError> {
        if self.binding.is_some() {
            return Err(SessionError::AlreadyBound);
        }

        let preview = PreviewConfig::builder()
            .target_resolution(self.settings.target_resolution.0, self.settings.target_resolution.1)
            .lens_facing(facing)
            .build();
        let capture = CaptureConfig::builder()
            .lens_facing(facing)
            .capture_mode(self.settings.capture_mode)
            .build();

        let use_cases = self.provider.bind(&preview, &capture)?;
        self.binding = Some(use_cases);
        self.lens_facing = facing;
        self.last_frame = None;

        self.surface
            .attach_stream(facing, preview.target_resolution())
            .map_err(SessionError::Surface)?;
        self.update_transform();

        tracing::info!("Camera session bound to {} camera", facing);
        Ok(())
    }

    /// Recompute the preview rotation for the surface's current layout
    pub fn update_transform(&mut self) {
        let (width, height) = self.surface.size();
        let transform =
            RotationTransform::for_display(self.surface.display_rotation(), width, height);
        self.surface.set_transform(transform);
    }

    /// Move one preview frame from the camera to the surface
    pub fn render_frame(&mut self) -> Result<(), SessionError> {
        if self.surface.take_layout_change() {
            self.update_transform();
        }

        let binding = self.binding.as_mut().ok_or(SessionError::NotBound)?;
        let frame = binding.next_preview_frame()?;

        self.surface.present(&frame).map_err(SessionError::Surface)?;
        self.last_frame = Some(frame);
        Ok(())
    }

    /// Take a still and write it to `<media dir>/<epoch-millis>.jpg`
    ///
    /// Encoding and file I/O run on the capture worker; the returned handle
    /// settles once the file is written or the capture failed.
    pub fn capture(&mut self) -> PendingCapture {
        let frame = match self.still_frame() {
            Ok(frame) => frame,
            Err(e) => {
                return PendingCapture::resolved(Err(CaptureError::new(
                    CaptureErrorKind::CaptureFailed,
                    e.to_string(),
                )))
            }
        };

        let (path, timestamp_millis) = self.namer.next_path(&self.settings.media_dir);
        tracing::debug!("Capturing to {}", path.display());
        self.worker.submit(frame, path, timestamp_millis)
    }

    fn still_frame(&mut self) -> Result<RgbImage, SessionError> {
        let binding = self.binding.as_mut().ok_or(SessionError::NotBound)?;

        match self.settings.capture_mode {
            CaptureMode::MinLatency => match &self.last_frame {
                Some(frame) => Ok(frame.clone()),
                None => Ok(binding.next_preview_frame()?),
            },
            CaptureMode::MaxQuality => Ok(binding.take_still()?),
        }
    }

    /// Rebind to the opposite camera
    ///
    /// The facing flag is toggled before the new camera is looked up. When
    /// the lookup fails the current binding is left alone and the flag is
    /// handled per [`SwitchPolicy`].
    ///
    /// A camera that is listed but fails to bind leaves the session
    /// [`BindingState::Unbound`] with the toggled flag: the old binding is
    /// already released. Later captures and switches fail with
    /// [`SessionError::NotBound`] until [`Self::start`] succeeds again.
    pub fn switch_facing(&mut self) -> Result<LensFacing, SessionError> {
        if self.binding.is_none() {
            return Err(SessionError::NotBound);
        }

        let previous = self.lens_facing;
        self.lens_facing = previous.toggled();

        if let Err(e) = self.provider.camera_with_lens_facing(self.lens_facing) {
            if self.settings.switch_policy == SwitchPolicy::Rollback {
                self.lens_facing = previous;
            }
            return Err(e.into());
        }

        self.stop();
        self.start(self.lens_facing)?;
        Ok(self.lens_facing)
    }

    /// Unbind all use cases
    pub fn stop(&mut self) {
        if let Some(binding) = self.binding.take() {
            let facing = binding.lens_facing();
            if let Err(e) = binding.unbind() {
                tracing::error!("Failed to unbind {} camera: {}", facing, e);
            }
            tracing::info!("Camera session unbound");
        }
        self.last_frame = None;
    }
}
