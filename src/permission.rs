use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Request code used for the one batched permission request
pub const PERMISSION_REQUEST_CODE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Camera,
    ReadExternalStorage,
    WriteExternalStorage,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Camera => write!(f, "camera"),
            Permission::ReadExternalStorage => write!(f, "read storage"),
            Permission::WriteExternalStorage => write!(f, "write storage"),
        }
    }
}

pub const REQUIRED_PERMISSIONS: [Permission; 3] = [
    Permission::Camera,
    Permission::WriteExternalStorage,
    Permission::ReadExternalStorage,
];

/// Host environment that owns permission state
pub trait PermissionHost {
    fn check(&self, permission: Permission) -> bool;

    /// Ask for `permissions`; the outcome arrives later through
    /// [`PermissionHost::poll_result`] tagged with `request_code`.
    fn request(&mut self, permissions: &[Permission], request_code: u32);

    /// Request code of a finished request, if any
    fn poll_result(&mut self) -> Option<u32>;
}

/// What opening the gate did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    /// A request is outstanding
    Pending,
}

/// Answer to an outstanding request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Granted,
    Denied,
}

/// Decides whether the camera may be started
pub struct PermissionGate<H> {
    host: H,
    awaiting_result: bool,
}

impl<H: PermissionHost> PermissionGate<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            awaiting_result: false,
        }
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn all_granted(&self) -> bool {
        REQUIRED_PERMISSIONS.iter().all(|p| self.host.check(*p))
    }

    /// Grants immediately or issues a single batched request
    pub fn open(&mut self) -> GateDecision {
        if self.all_granted() {
            return GateDecision::Granted;
        }

        let missing: Vec<String> = REQUIRED_PERMISSIONS
            .iter()
            .filter(|p| !self.host.check(**p))
            .map(|p| p.to_string())
            .collect();
        tracing::info!("Requesting permissions, missing: {}", missing.join(", "));

        self.host.request(&REQUIRED_PERMISSIONS, PERMISSION_REQUEST_CODE);
        self.awaiting_result = true;
        GateDecision::Pending
    }

    /// Handle a request result. Results for other request codes, or with
    /// no request outstanding, are ignored.
    pub fn on_request_result(&mut self, request_code: u32) -> Option<RequestOutcome> {
        if request_code != PERMISSION_REQUEST_CODE || !self.awaiting_result {
            tracing::debug!("Ignoring permission result for request code {}", request_code);
            return None;
        }

        self.awaiting_result = false;
        if self.all_granted() {
            Some(RequestOutcome::Granted)
        } else {
            Some(RequestOutcome::Denied)
        }
    }
}

/// Permissions as seen by a desktop process
///
/// The camera is usable when its device node opens for reading, storage
/// when the media directory can be listed and written. A request can only
/// create the media directory; device access is up to the system.
pub struct SystemPermissions {
    camera_device: PathBuf,
    media_dir: PathBuf,
    finished_request: Option<u32>,
}

impl SystemPermissions {
    pub fn new(camera_device: PathBuf, media_dir: PathBuf) -> Self {
        Self {
            camera_device,
            media_dir,
            finished_request: None,
        }
    }
}

/// Writable means a file can be created in it
fn can_write_dir(dir: &Path) -> bool {
    let check_file = dir.join(".snapcam-write-check");
    match File::create(&check_file) {
        Ok(_) => {
            if let Err(e) = std::fs::remove_file(&check_file) {
                tracing::warn!("Failed to remove {}: {}", check_file.display(), e);
            }
            true
        }
        Err(e) => {
            tracing::debug!("{} is not writable: {}", dir.display(), e);
            false
        }
    }
}

impl PermissionHost for SystemPermissions {
    fn check(&self, permission: Permission) -> bool {
        match permission {
            Permission::Camera => File::open(&self.camera_device).is_ok(),
            Permission::ReadExternalStorage => std::fs::read_dir(&self.media_dir).is_ok(),
            Permission::WriteExternalStorage => can_write_dir(&self.media_dir),
        }
    }

    fn request(&mut self, permissions: &[Permission], request_code: u32) {
        let wants_storage = permissions.iter().any(|p| {
            matches!(
                p,
                Permission::ReadExternalStorage | Permission::WriteExternalStorage
            )
        });

        if wants_storage {
            if let Err(e) = std::fs::create_dir_all(&self.media_dir) {
                tracing::warn!(
                    "Failed to create media directory {}: {}",
                    self.media_dir.display(),
                    e
                );
            }
        }

        self.finished_request = Some(request_code);
    }

    fn poll_result(&mut self) -> Option<u32> {
        self.finished_request.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{temp_dir, FakePermissionHost};

    #[test]
    fn test_all_granted_skips_request() {
        let mut gate = PermissionGate::new(FakePermissionHost::granting_all());
        assert_eq!(gate.open(), GateDecision::Granted);
        assert!(gate.host().requests.is_empty());
    }

    #[test]
    fn test_missing_permission_issues_one_batched_request() {
        let mut gate = PermissionGate::new(FakePermissionHost::new(&[Permission::Camera]));
        assert_eq!(gate.open(), GateDecision::Pending);

        let requests = &gate.host().requests;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.len(), 3);
        assert_eq!(requests[0].1, PERMISSION_REQUEST_CODE);
    }

    #[test]
    fn test_result_grants_after_user_accepts() {
        let mut host = FakePermissionHost::new(&[]);
        host.grant_on_request = true;
        let mut gate = PermissionGate::new(host);
        assert_eq!(gate.open(), GateDecision::Pending);

        let code = gate.host_mut().poll_result().unwrap();
        assert_eq!(gate.on_request_result(code), Some(RequestOutcome::Granted));
    }

    #[test]
    fn test_any_denial_denies() {
        let mut gate = PermissionGate::new(FakePermissionHost::new(&[
            Permission::Camera,
            Permission::ReadExternalStorage,
        ]));
        gate.open();
        assert_eq!(
            gate.on_request_result(PERMISSION_REQUEST_CODE),
            Some(RequestOutcome::Denied)
        );
    }

    #[test]
    fn test_foreign_request_code_is_ignored() {
        let mut gate = PermissionGate::new(FakePermissionHost::new(&[]));
        gate.open();
        assert_eq!(gate.on_request_result(7), None);
        // Still waiting for our own result
        assert_eq!(
            gate.on_request_result(PERMISSION_REQUEST_CODE),
            Some(RequestOutcome::Denied)
        );
        assert_eq!(gate.on_request_result(PERMISSION_REQUEST_CODE), None);
    }

    #[test]
    fn test_system_request_creates_media_dir() {
        let media_dir = temp_dir().join("media");
        let mut host = SystemPermissions::new(PathBuf::from("/dev/null"), media_dir.clone());

        assert!(!host.check(Permission::WriteExternalStorage));
        host.request(&REQUIRED_PERMISSIONS, PERMISSION_REQUEST_CODE);

        assert!(host.check(Permission::ReadExternalStorage));
        assert!(host.check(Permission::WriteExternalStorage));
        assert_eq!(host.poll_result(), Some(PERMISSION_REQUEST_CODE));
        assert_eq!(host.poll_result(), None);
    }

    #[test]
    fn test_write_check_needs_existing_dir_and_leaves_no_file() {
        let dir = temp_dir();
        let host = SystemPermissions::new(PathBuf::from("/dev/null"), dir.clone());
        assert!(host.check(Permission::WriteExternalStorage));
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        let missing = SystemPermissions::new(PathBuf::from("/dev/null"), dir.join("absent"));
        assert!(!missing.check(Permission::WriteExternalStorage));
    }

    #[test]
    fn test_write_check_rejects_plain_file() {
        let dir = temp_dir();
        let file = dir.join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let host = SystemPermissions::new(PathBuf::from("/dev/null"), file);
        assert!(!host.check(Permission::WriteExternalStorage));
    }

    #[test]
    fn test_system_camera_needs_device_node() {
        let host = SystemPermissions::new(PathBuf::from("/nonexistent/video0"), temp_dir());
        assert!(!host.check(Permission::Camera));
    }
}
