use super::{BoundUseCases, CameraError, CameraProvider, CaptureConfig, LensFacing, PreviewConfig};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

/// Webcams attached through nokhwa
///
/// Desktop cameras carry no facing information, so each facing is mapped
/// to a device index.
pub struct NokhwaCameraProvider {
    back_index: u32,
    front_index: u32,
    frame_rate: u32,
}

impl NokhwaCameraProvider {
    pub fn new(back_index: u32, front_index: u32, frame_rate: u32) -> Self {
        Self {
            back_index,
            front_index,
            frame_rate,
        }
    }

    fn device_index(&self, facing: LensFacing) -> u32 {
        match facing {
            LensFacing::Back => self.back_index,
            LensFacing::Front => self.front_index,
        }
    }
}

impl CameraProvider for NokhwaCameraProvider {
    type Binding = NokhwaUseCases;

    fn camera_with_lens_facing(&self, facing: LensFacing) -> Result<(), CameraError> {
        let wanted = self.device_index(facing);
        let cameras = nokhwa::query(ApiBackend::Auto).map_err(backend_error)?;

        tracing::debug!("Found {} camera(s)", cameras.len());

        let found = cameras
            .iter()
            .any(|info| info.index().as_index().map(|i| i == wanted).unwrap_or(false));

        if found {
            Ok(())
        } else {
            Err(CameraError::NoCameraWithFacing(facing))
        }
    }

    fn bind(
        &mut self,
        preview: &PreviewConfig,
        capture: &CaptureConfig,
    ) -> Result<NokhwaUseCases, CameraError> {
        let facing = preview.lens_facing();
        let device_index = self.device_index(facing);
        let (width, height) = preview.target_resolution();

        tracing::info!(
            "Binding {} camera (device {}) at {}x{}, capture mode {:?}",
            facing,
            device_index,
            width,
            height,
            capture.capture_mode()
        );

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::MJPEG,
                self.frame_rate,
            ),
        ));

        let mut camera =
            Camera::new(CameraIndex::Index(device_index), requested).map_err(backend_error)?;

        camera.open_stream().map_err(backend_error)?;

        tracing::info!("Camera stream opened");

        Ok(NokhwaUseCases { camera, facing })
    }
}

pub struct NokhwaUseCases {
    camera: Camera,
    facing: LensFacing,
}

impl NokhwaUseCases {
    fn decode_next(&mut self) -> Result<RgbImage, CameraError> {
        let frame = self.camera.frame().map_err(backend_error)?;
        frame.decode_image::<RgbFormat>().map_err(backend_error)
    }
}

impl BoundUseCases for NokhwaUseCases {
    fn lens_facing(&self) -> LensFacing {
        self.facing
    }

    fn next_preview_frame(&mut self) -> Result<RgbImage, CameraError> {
        self.decode_next()
    }

    fn take_still(&mut self) -> Result<RgbImage, CameraError> {
        // The driver hands out the oldest queued buffer first; skip it
        self.camera.frame().map_err(backend_error)?;
        self.decode_next()
    }

    fn unbind(mut self) -> Result<(), CameraError> {
        tracing::info!("Unbinding {} camera", self.facing);
        self.camera.stop_stream().map_err(backend_error)
    }
}

fn backend_error(err: nokhwa::NokhwaError) -> CameraError {
    CameraError::Backend(err.to_string())
}
