//! The camera screen: permission gate, session and result view wired to
//! explicit lifecycle hooks

use crate::camera::{CameraProvider, LensFacing};
use crate::capture::PendingCapture;
use crate::output::{PreviewSurface, ResultSink};
use crate::permission::{GateDecision, PermissionGate, PermissionHost, RequestOutcome};
use crate::session::{BindingState, CaptureSessionController};

pub const PERMISSIONS_DENIED_MESSAGE: &str = "Permissions not granted by the user.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Created,
    AwaitingPermissions,
    Running,
    Finished,
}

pub struct CameraScreen<P: CameraProvider, S, H, R> {
    gate: PermissionGate<H>,
    controller: CaptureSessionController<P, S>,
    results: R,
    default_facing: LensFacing,
    pending: Vec<PendingCapture>,
    state: ScreenState,
}

impl<P, S, H, R> CameraScreen<P, S, H, R>
where
    P: CameraProvider,
    S: PreviewSurface,
    H: PermissionHost,
    R: ResultSink,
{
    pub fn new(
        gate: PermissionGate<H>,
        controller: CaptureSessionController<P, S>,
        results: R,
        default_facing: LensFacing,
    ) -> Self {
        Self {
            gate,
            controller,
            results,
            default_facing,
            pending: Vec::new(),
            state: ScreenState::Created,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ScreenState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == ScreenState::Finished
    }

    #[cfg(test)]
    pub fn controller(&self) -> &CaptureSessionController<P, S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut CaptureSessionController<P, S> {
        &mut self.controller
    }

    #[cfg(test)]
    pub fn results(&self) -> &R {
        &self.results
    }

    /// Screen opened
    pub fn initialize(&mut self) {
        match self.gate.open() {
            GateDecision::Granted => self.start_camera(),
            GateDecision::Pending => self.state = ScreenState::AwaitingPermissions,
        }
    }

    /// Result of the batched permission request
    pub fn on_permissions_result(&mut self, request_code: u32) {
        match self.gate.on_request_result(request_code) {
            Some(RequestOutcome::Granted) => self.start_camera(),
            Some(RequestOutcome::Denied) => self.finish_denied(),
            None => {}
        }
    }

    fn start_camera(&mut self) {
        match self.controller.start(self.default_facing) {
            Ok(()) => self.state = ScreenState::Running,
            Err(e) => {
                tracing::error!("Failed to start camera: {}", e);
                self.finish();
            }
        }
    }

    fn finish_denied(&mut self) {
        tracing::warn!("{}", PERMISSIONS_DENIED_MESSAGE);
        self.results.notify(PERMISSIONS_DENIED_MESSAGE);
        self.finish();
    }

    fn finish(&mut self) {
        self.controller.stop();
        self.state = ScreenState::Finished;
    }

    /// One pass of the display loop
    pub fn tick(&mut self) {
        match self.state {
            ScreenState::AwaitingPermissions => {
                if let Some(code) = self.gate.host_mut().poll_result() {
                    self.on_permissions_result(code);
                }
            }
            ScreenState::Running => {
                if let Err(e) = self.controller.render_frame() {
                    tracing::warn!("Preview frame dropped: {}", e);
                }
                self.resolve_captures();
            }
            ScreenState::Created | ScreenState::Finished => {}
        }
    }

    fn resolve_captures(&mut self) {
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for mut pending in self.pending.drain(..) {
            match pending.try_take() {
                None => still_pending.push(pending),
                Some(Ok(file)) => {
                    let path = file.path();
                    tracing::info!(
                        "onImageSaved: {} (taken at {})",
                        path.display(),
                        file.timestamp_millis()
                    );
                    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                    self.results
                        .notify(&format!("onImageSaved:{}", absolute.display()));
                    if let Err(e) = self.results.show_capture(&absolute) {
                        tracing::error!("Failed to display {}: {:#}", absolute.display(), e);
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("onError: code={} message={}", e.kind().code(), e.message());
                }
            }
        }

        self.pending = still_pending;
    }

    /// Capture button
    pub fn capture_clicked(&mut self) {
        if self.state != ScreenState::Running {
            tracing::debug!("Ignoring capture, screen is {:?}", self.state);
            return;
        }
        let pending = self.controller.capture();
        self.pending.push(pending);
    }

    /// Switch-camera button; failures are logged and otherwise ignored
    pub fn switch_clicked(&mut self) {
        if self.state != ScreenState::Running {
            tracing::debug!("Ignoring switch, screen is {:?}", self.state);
            return;
        }
        match self.controller.switch_facing() {
            Ok(facing) => tracing::info!("Switched to {} camera", facing),
            Err(e) => {
                tracing::error!("Camera switch failed: {}", e);
                if let BindingState::Unbound = self.controller.state() {
                    tracing::error!("No camera bound after failed switch");
                }
            }
        }
    }

    /// Screen closing: waits for in-flight captures and unbinds the camera
    pub fn teardown(&mut self) {
        for pending in self.pending.drain(..) {
            if let Err(e) = pending.wait() {
                tracing::error!("onError: code={} message={}", e.kind().code(), e.message());
            }
        }
        self.finish();
    }
}
