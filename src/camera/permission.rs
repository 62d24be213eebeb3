//! Camera permission gate.
//!
//! On Linux the camera is a V4L2 device node; "permission" means the current
//! user can open it read/write. Granting happens outside the process (video
//! group membership, udev rules), so a request is a fresh probe of the node.

use crate::error::{Result, ShopAssistError};
use serde::{Deserialize, Serialize};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Whether the camera may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAccess {
    Granted,
    Denied,
    /// No device node at the configured path.
    Unavailable,
}

impl CameraAccess {
    pub fn is_granted(self) -> bool {
        self == CameraAccess::Granted
    }

    /// Fail unless granted.
    pub fn require(self, device: &str) -> Result<()> {
        match self {
            CameraAccess::Granted => Ok(()),
            CameraAccess::Denied => Err(ShopAssistError::PermissionDenied {
                device: device.to_string(),
            }),
            CameraAccess::Unavailable => Err(ShopAssistError::CameraUnavailable {
                device: device.to_string(),
            }),
        }
    }
}

/// Checks and requests camera access.
pub trait PermissionGate: Send + Sync {
    /// Current access without side effects.
    fn check(&self) -> CameraAccess;

    /// Ask for access again (the "Grant Permission" action).
    fn request(&self) -> CameraAccess;

    /// Device the gate guards, for display.
    fn device(&self) -> &str;
}

/// Run the startup gate: check, and request once if not yet granted.
pub fn ensure_access(gate: &dyn PermissionGate) -> CameraAccess {
    match gate.check() {
        CameraAccess::Granted => CameraAccess::Granted,
        _ => gate.request(),
    }
}

/// Permission gate backed by `access(2)` on the device node.
#[derive(Debug, Clone)]
pub struct DevicePermission {
    device: PathBuf,
    display: String,
}

impl DevicePermission {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        let device = device.into();
        let display = device.display().to_string();
        Self { device, display }
    }

    fn probe(path: &Path) -> CameraAccess {
        if !path.exists() {
            return CameraAccess::Unavailable;
        }
        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            return CameraAccess::Denied;
        };
        // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
        let rc = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) };
        if rc == 0 {
            CameraAccess::Granted
        } else {
            CameraAccess::Denied
        }
    }
}

impl PermissionGate for DevicePermission {
    fn check(&self) -> CameraAccess {
        Self::probe(&self.device)
    }

    fn request(&self) -> CameraAccess {
        let access = Self::probe(&self.device);
        match access {
            CameraAccess::Granted => tracing::info!(device = %self.display, "camera access granted"),
            CameraAccess::Denied => tracing::warn!(
                device = %self.display,
                "camera access denied; add your user to the 'video' group and retry"
            ),
            CameraAccess::Unavailable => {
                tracing::warn!(device = %self.display, "camera device not found")
            }
        }
        access
    }

    fn device(&self) -> &str {
        &self.display
    }
}

/// Gate that replays a scripted sequence of answers (last one repeats).
#[derive(Debug)]
pub struct MockPermission {
    answers: std::sync::Mutex<Vec<CameraAccess>>,
    requests: std::sync::atomic::AtomicUsize,
}

impl MockPermission {
    pub fn new(answers: Vec<CameraAccess>) -> Self {
        Self {
            answers: std::sync::Mutex::new(answers),
            requests: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(vec![CameraAccess::Granted])
    }

    /// Number of `request()` calls seen.
    pub fn request_count(&self) -> usize {
        self.requests.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn current(&self) -> CameraAccess {
        self.answers
            .lock()
            .ok()
            .and_then(|a| a.first().copied())
            .unwrap_or(CameraAccess::Denied)
    }
}

impl PermissionGate for MockPermission {
    fn check(&self) -> CameraAccess {
        self.current()
    }

    fn request(&self) -> CameraAccess {
        self.requests
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Ok(mut answers) = self.answers.lock()
            && answers.len() > 1
        {
            answers.remove(0);
        }
        self.current()
    }

    fn device(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_device_is_unavailable() {
        let gate = DevicePermission::new("/dev/shopassist-no-such-camera");
        assert_eq!(gate.check(), CameraAccess::Unavailable);
        assert_eq!(gate.request(), CameraAccess::Unavailable);
    }

    #[test]
    fn test_readable_writable_node_is_granted() {
        let node = NamedTempFile::new().unwrap();
        let gate = DevicePermission::new(node.path());
        assert_eq!(gate.check(), CameraAccess::Granted);
    }

    #[test]
    fn test_unreadable_node_is_denied() {
        use std::os::unix::fs::PermissionsExt;

        // root bypasses file modes
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let node = NamedTempFile::new().unwrap();
        std::fs::set_permissions(node.path(), std::fs::Permissions::from_mode(0o000)).unwrap();
        let gate = DevicePermission::new(node.path());
        assert_eq!(gate.check(), CameraAccess::Denied);
    }

    #[test]
    fn test_ensure_access_requests_only_when_needed() {
        let granted = MockPermission::granted();
        assert_eq!(ensure_access(&granted), CameraAccess::Granted);
        assert_eq!(granted.request_count(), 0);

        let denied_then_granted =
            MockPermission::new(vec![CameraAccess::Denied, CameraAccess::Granted]);
        assert_eq!(ensure_access(&denied_then_granted), CameraAccess::Granted);
        assert_eq!(denied_then_granted.request_count(), 1);
    }

    #[test]
    fn test_mock_repeats_last_answer() {
        let gate = MockPermission::new(vec![CameraAccess::Denied]);
        assert_eq!(gate.request(), CameraAccess::Denied);
        assert_eq!(gate.request(), CameraAccess::Denied);
        assert_eq!(gate.request_count(), 2);
    }

    #[test]
    fn test_require_maps_to_camera_errors() {
        assert!(CameraAccess::Granted.require("/dev/video0").is_ok());
        assert!(matches!(
            CameraAccess::Denied.require("/dev/video0"),
            Err(ShopAssistError::PermissionDenied { device }) if device == "/dev/video0"
        ));
        assert!(matches!(
            CameraAccess::Unavailable.require("/dev/video0"),
            Err(ShopAssistError::CameraUnavailable { .. })
        ));
    }

    #[test]
    fn test_access_serializes_snake_case() {
        let json = serde_json::to_string(&CameraAccess::Unavailable).unwrap();
        assert_eq!(json, "\"unavailable\"");
    }
}
