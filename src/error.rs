//! Error types for shopassist.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopAssistError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Camera errors
    #[error("Camera permission denied for {device}")]
    PermissionDenied { device: String },

    #[error("Camera not available: {device}")]
    CameraUnavailable { device: String },

    #[error("Scanner failed: {message}")]
    Scanner { message: String },

    #[error("Photo capture failed: {message}")]
    Capture { message: String },

    // Text recognition errors
    #[error("Text recognition failed: {message}")]
    Recognition { message: String },

    // Catalog errors
    #[error("Product lookup failed: {message}")]
    LookupTransport { message: String },

    #[error("Product not found: {code}")]
    LookupNotFound { code: String },

    // Speech errors
    #[error("Speech playback failed: {message}")]
    Speech { message: String },

    // External tool errors
    #[error("Required tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ShopAssistError>;
