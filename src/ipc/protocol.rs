//! JSON message protocol for IPC communication between CLI and daemon.

use crate::camera::permission::CameraAccess;
use serde::{Deserialize, Serialize};

/// Commands sent by CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Clear the debounce flag so the next barcode is looked up
    Scan,
    /// Capture a photo and read its text aloud
    Recognize,
    /// Retry the camera permission gate
    Grant,
    /// Get daemon status
    Status,
    /// Shutdown the daemon
    Shutdown,
}

impl Command {
    /// Serialize command to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize command from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Responses sent by daemon to CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Command succeeded
    Ok,
    /// Text recognized from a fresh photo
    Recognized { text: String },
    /// Current session status
    Status {
        camera: CameraAccess,
        scanner_running: bool,
        scan_armed: bool,
        product_name: String,
        ocr_text: Option<String>,
        image_path: Option<String>,
    },
    /// Error occurred
    Error { message: String },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
