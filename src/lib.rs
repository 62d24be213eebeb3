//! shopassist - barcode lookup and label reading, spoken aloud
//!
//! Scans EAN-13, QR and Code-128 codes from a camera, looks products up in
//! Open Food Facts, reads text off photos and announces every result.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod camera;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod ipc;
pub mod logging;
pub mod ocr;
#[cfg(feature = "cli")]
pub mod output;
pub mod session;
pub mod speech;

// Composition root - needs everything
#[cfg(all(feature = "cli", feature = "catalog"))]
pub mod app;
#[cfg(all(feature = "cli", feature = "catalog"))]
pub mod daemon;

// Capability traits
pub use camera::{CameraAccess, CodeSource, PermissionGate, StillCamera};
pub use catalog::ProductCatalog;
pub use exec::{CommandExecutor, SystemCommandExecutor};
pub use ocr::TextRecognizer;
pub use speech::{Speech, SpeechEngine};

// Session
pub use session::{Session, SessionHandle, SessionState, SessionUpdate, spawn_session};

// Error handling
pub use error::{Result, ShopAssistError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_hash_suffix() {
        let ver = version_string();
        match option_env!("GIT_HASH") {
            Some(hash) if !hash.is_empty() => assert_eq!(ver.split('+').nth(1), Some(hash)),
            _ => assert_eq!(ver, env!("CARGO_PKG_VERSION")),
        }
    }
}
