//! Terminal rendering for the interactive session and daemon verbose mode.
//!
//! Purely reactive: everything shown here comes from a [`SessionUpdate`] or
//! a state snapshot. Nothing in this module touches session state.

use crate::camera::permission::CameraAccess;
use crate::session::{SessionState, SessionUpdate};
use owo_colors::OwoColorize;

/// Label for the product panel.
pub const PRODUCT_LABEL: &str = "Product Name:";
/// Label for the recognized text panel.
pub const OCR_LABEL: &str = "OCR:";

/// Fallback view text for a camera that may not be used.
pub fn access_message(access: CameraAccess) -> Option<&'static str> {
    match access {
        CameraAccess::Granted => None,
        CameraAccess::Denied => Some("No Camera Permission"),
        CameraAccess::Unavailable => Some("Camera not available"),
    }
}

/// Session header, shown once at startup.
pub fn render_header(device: &str) {
    println!("{} {}", "ShopAssist".bold(), crate::version_string().dimmed());
    println!("  {}  {}", "Camera:".dimmed(), device);
}

/// The key bindings available for the current camera state.
pub fn render_actions(access: CameraAccess) {
    match access {
        CameraAccess::Granted => println!(
            "  [{}] Scan Barcode   [{}] Recognize Text   [{}] Quit",
            "s".bold(),
            "r".bold(),
            "q".bold()
        ),
        CameraAccess::Denied => {
            println!("  [{}] Grant Permission   [{}] Quit", "g".bold(), "q".bold())
        }
        CameraAccess::Unavailable => {
            println!("  [{}] Retry   [{}] Quit", "g".bold(), "q".bold())
        }
    }
}

/// The permission fallback view.
pub fn render_access(access: CameraAccess, device: &str) {
    match access_message(access) {
        None => println!("{} camera {} ready", "●".green(), device),
        Some(message) => println!("{} {} ({})", "○".yellow(), message.yellow(), device),
    }
}

/// Both read-only panels, from a snapshot.
pub fn render_panels(state: &SessionState) {
    println!("{}", format_ocr_panel(state.ocr_text.as_deref()));
    println!("{}", format_product_panel(&state.product_name));
    if let Some(path) = &state.image_path {
        println!("  {} {}", "Photo:".dimmed(), path.display());
    }
}

pub fn format_ocr_panel(text: Option<&str>) -> String {
    match text {
        Some(text) => format!("{OCR_LABEL} {}", text.replace('\n', "\n     ")),
        None => OCR_LABEL.to_string(),
    }
}

pub fn format_product_panel(name: &str) -> String {
    if name.is_empty() {
        PRODUCT_LABEL.to_string()
    } else {
        format!("{PRODUCT_LABEL} {name}")
    }
}

/// Boxed alert; stays on screen until the next prompt.
pub fn format_alert(title: &str, message: &str) -> String {
    let width = title.chars().count().max(message.chars().count()) + 2;
    let rule = "─".repeat(width);
    format!(
        "┌{rule}┐\n│ {title:<inner$} │\n│ {message:<inner$} │\n└{rule}┘",
        inner = width - 2
    )
}

/// Render one session update to stdout.
pub fn render_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::Detected(code) => {
            println!("{} {} {}", "▸".dimmed(), code.symbology, code.value.bold());
        }
        SessionUpdate::ProductName(name) => println!("{}", format_product_panel(name).green()),
        SessionUpdate::ImageCaptured(path) => {
            println!("  {} {}", "Photo:".dimmed(), path.display());
        }
        SessionUpdate::OcrText(text) => println!("{}", format_ocr_panel(Some(text)).green()),
        SessionUpdate::ScanArmed => println!("{}", "Ready to scan".dimmed()),
        SessionUpdate::Alert { title, message } => {
            println!("{}", format_alert(title, message).red());
        }
        SessionUpdate::CameraBound(bound) => {
            if *bound {
                println!("{}", "Camera active".dimmed());
            } else {
                println!("{}", "Camera inactive".dimmed());
            }
        }
    }
}
