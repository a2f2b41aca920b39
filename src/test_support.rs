//! In-process stand-ins for the camera, the display and the host

use crate::camera::{
    BoundUseCases, CameraError, CameraProvider, CaptureConfig, LensFacing, PreviewConfig,
};
use crate::output::{PreviewSurface, ResultSink};
use crate::permission::{Permission, PermissionHost, REQUIRED_PERMISSIONS};
use crate::transform::{DisplayRotation, RotationTransform};
use anyhow::Result;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Fresh empty directory under the system temp dir
pub fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("snapcam-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Default)]
struct ProviderState {
    active: usize,
    max_active: usize,
    history: Vec<LensFacing>,
}

/// Camera provider producing solid frames: red for back, blue for front
#[derive(Clone)]
pub struct FakeCameraProvider {
    available: Vec<LensFacing>,
    /// Listed, but binding them fails
    broken: Vec<LensFacing>,
    failing_frames: bool,
    state: Arc<Mutex<ProviderState>>,
}

impl FakeCameraProvider {
    pub fn with(available: &[LensFacing]) -> Self {
        Self {
            available: available.to_vec(),
            broken: Vec::new(),
            failing_frames: false,
            state: Arc::default(),
        }
    }

    pub fn with_broken(mut self, facing: LensFacing) -> Self {
        self.broken.push(facing);
        self
    }

    /// Every preview frame and still errors out
    pub fn with_failing_frames(mut self) -> Self {
        self.failing_frames = true;
        self
    }

    pub fn with_both() -> Self {
        Self::with(&[LensFacing::Back, LensFacing::Front])
    }

    pub fn active_binds(&self) -> usize {
        self.state.lock().unwrap().active
    }

    pub fn max_concurrent_binds(&self) -> usize {
        self.state.lock().unwrap().max_active
    }

    pub fn bind_history(&self) -> Vec<LensFacing> {
        self.state.lock().unwrap().history.clone()
    }
}

impl CameraProvider for FakeCameraProvider {
    type Binding = FakeUseCases;

    fn camera_with_lens_facing(&self, facing: LensFacing) -> Result<(), CameraError> {
        if self.available.contains(&facing) {
            Ok(())
        } else {
            Err(CameraError::NoCameraWithFacing(facing))
        }
    }

    fn bind(
        &mut self,
        preview: &PreviewConfig,
        _capture: &CaptureConfig,
    ) -> Result<FakeUseCases, CameraError> {
        let facing = preview.lens_facing();
        self.camera_with_lens_facing(facing)?;
        if self.broken.contains(&facing) {
            return Err(CameraError::Backend(format!("{} camera is busy", facing)));
        }

        let mut state = self.state.lock().unwrap();
        state.active += 1;
        state.max_active = state.max_active.max(state.active);
        state.history.push(facing);

        Ok(FakeUseCases {
            facing,
            resolution: preview.target_resolution(),
            failing_frames: self.failing_frames,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeUseCases {
    facing: LensFacing,
    resolution: (u32, u32),
    failing_frames: bool,
    state: Arc<Mutex<ProviderState>>,
}

impl FakeUseCases {
    fn frame(&self) -> Result<RgbImage, CameraError> {
        if self.failing_frames {
            return Err(CameraError::Backend("frame timeout".into()));
        }
        let color = match self.facing {
            LensFacing::Back => Rgb([255, 0, 0]),
            LensFacing::Front => Rgb([0, 0, 255]),
        };
        Ok(RgbImage::from_pixel(self.resolution.0, self.resolution.1, color))
    }
}

impl BoundUseCases for FakeUseCases {
    fn lens_facing(&self) -> LensFacing {
        self.facing
    }

    fn next_preview_frame(&mut self) -> Result<RgbImage, CameraError> {
        self.frame()
    }

    fn take_still(&mut self) -> Result<RgbImage, CameraError> {
        self.frame()
    }

    fn unbind(self) -> Result<(), CameraError> {
        self.state.lock().unwrap().active -= 1;
        Ok(())
    }
}

/// Preview surface that records what the session does to it
pub struct FakeSurface {
    width: u32,
    height: u32,
    rotation: DisplayRotation,
    layout_changed: bool,
    pub attached: Vec<LensFacing>,
    pub transforms: Vec<RotationTransform>,
    pub presented: usize,
}

impl FakeSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rotation: DisplayRotation::R0,
            layout_changed: false,
            attached: Vec::new(),
            transforms: Vec::new(),
            presented: 0,
        }
    }

    pub fn rotate_to(&mut self, rotation: DisplayRotation) {
        self.rotation = rotation;
        self.layout_changed = true;
    }
}

impl PreviewSurface for FakeSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn display_rotation(&self) -> DisplayRotation {
        self.rotation
    }

    fn take_layout_change(&mut self) -> bool {
        std::mem::take(&mut self.layout_changed)
    }

    fn attach_stream(&mut self, facing: LensFacing, _resolution: (u32, u32)) -> Result<()> {
        self.attached.push(facing);
        Ok(())
    }

    fn set_transform(&mut self, transform: RotationTransform) {
        self.transforms.push(transform);
    }

    fn present(&mut self, _frame: &RgbImage) -> Result<()> {
        self.presented += 1;
        Ok(())
    }
}

/// Permission host with a fixed set of granted permissions
pub struct FakePermissionHost {
    granted: Vec<Permission>,
    /// Grant everything when a request comes in, as a user accepting the dialog
    pub grant_on_request: bool,
    pub requests: Vec<(Vec<Permission>, u32)>,
    finished: Option<u32>,
}

impl FakePermissionHost {
    pub fn new(granted: &[Permission]) -> Self {
        Self {
            granted: granted.to_vec(),
            grant_on_request: false,
            requests: Vec::new(),
            finished: None,
        }
    }

    pub fn granting_all() -> Self {
        Self::new(&REQUIRED_PERMISSIONS)
    }
}

impl PermissionHost for FakePermissionHost {
    fn check(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    fn request(&mut self, permissions: &[Permission], request_code: u32) {
        self.requests.push((permissions.to_vec(), request_code));
        if self.grant_on_request {
            self.granted = REQUIRED_PERMISSIONS.to_vec();
        }
        self.finished = Some(request_code);
    }

    fn poll_result(&mut self) -> Option<u32> {
        self.finished.take()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Vec<String>,
    pub shown: Vec<PathBuf>,
}

impl ResultSink for RecordingSink {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn show_capture(&mut self, path: &Path) -> Result<()> {
        self.shown.push(path.to_path_buf());
        Ok(())
    }
}
