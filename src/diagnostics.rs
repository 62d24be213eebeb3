//! System diagnostics and dependency checking.
//!
//! Verifies that the external tools behind each capability are installed and
//! that the camera device can be opened.

use crate::camera::permission::{CameraAccess, DevicePermission, PermissionGate};
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// External tools and the flag that makes each print its version.
const TOOLS: &[(&str, &str, &str)] = &[
    ("zbarcam", "--version", "barcode scanning"),
    ("ffmpeg", "-version", "still capture"),
    ("tesseract", "--version", "text recognition"),
    ("espeak-ng", "--version", "speech"),
];

/// Install hint per tool, Debian/Ubuntu and Arch package names.
fn install_hint(tool: &str) -> Option<(&'static str, &'static str)> {
    match tool {
        "zbarcam" => Some(("zbar-tools", "zbar")),
        "ffmpeg" => Some(("ffmpeg", "ffmpeg")),
        "tesseract" => Some(("tesseract-ocr", "tesseract tesseract-data-eng")),
        "espeak-ng" => Some(("espeak-ng", "espeak-ng")),
        _ => None,
    }
}

/// Check if a command exists and is executable.
fn check_command(command: &str, version_flag: &str) -> CheckResult {
    match Command::new(command).arg(version_flag).output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but {} failed", command, version_flag)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Check that the camera device node exists and is usable.
fn check_camera(gate: &dyn PermissionGate) -> CheckResult {
    match gate.check() {
        CameraAccess::Granted => CheckResult::Ok,
        CameraAccess::Unavailable => CheckResult::NotFound,
        CameraAccess::Denied => CheckResult::Warning(
            "permission denied. Add your user to the 'video' group:\n\
             \x20   sudo usermod -aG video $USER\n\
             \x20 then log out and back in"
                .to_string(),
        ),
    }
}

/// Run all dependency checks and print results.
///
/// Returns true when everything required is present.
pub fn check_dependencies(device: &str) -> bool {
    println!("Checking system dependencies...\n");
    let mut all_ok = true;

    for (tool, flag, purpose) in TOOLS {
        print!("{} ({}): ", tool, purpose);
        match check_command(tool, flag) {
            CheckResult::Ok => println!("✓ OK"),
            CheckResult::NotFound => {
                all_ok = false;
                println!("✗ NOT FOUND");
                if let Some((debian, arch)) = install_hint(tool) {
                    println!("  Install: sudo apt install {}  (Debian/Ubuntu)", debian);
                    println!("           sudo pacman -S {}    (Arch)", arch);
                }
            }
            CheckResult::Warning(msg) => println!("⚠ WARNING: {}", msg),
        }
    }

    print!("camera ({}): ", device);
    match check_camera(&DevicePermission::new(device)) {
        CheckResult::Ok => println!("✓ OK"),
        CheckResult::NotFound => {
            all_ok = false;
            println!("✗ NOT FOUND");
            println!("  Set camera.device in the config or pass --device");
        }
        CheckResult::Warning(msg) => {
            all_ok = false;
            println!("⚠ WARNING: {}", msg);
        }
    }

    println!();
    if all_ok {
        println!("All dependencies satisfied.");
    } else {
        println!("Some dependencies are missing; see above.");
    }
    all_ok
}
