//! Camera access: permission gate, barcode detection stream, still capture.

pub mod capture;
pub mod controller;
pub mod permission;
pub mod scanner;

pub use capture::{FfmpegCamera, MockCamera, StillCamera};
pub use controller::{CameraController, ScannerFactory};
pub use permission::{CameraAccess, DevicePermission, MockPermission, PermissionGate};
pub use scanner::{CodeSource, DetectionEvent, MockCodeSource, Symbology, ZbarScanner};
