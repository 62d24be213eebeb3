use crate::defaults;
use crate::error::{Result, ShopAssistError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub catalog: CatalogConfig,
    pub ocr: OcrConfig,
    pub speech: SpeechConfig,
}

/// Camera, scanner and still capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub device: String,
    pub symbologies: Vec<String>,
    /// Directory for captured photos; the system temp dir when unset.
    pub capture_dir: Option<PathBuf>,
}

/// Product catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
}

/// Text recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub language: String,
}

/// Speech announcer configuration, applied once at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub locale: String,
    pub rate: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: defaults::CAMERA_DEVICE.to_string(),
            symbologies: defaults::SYMBOLOGIES.iter().map(|s| s.to_string()).collect(),
            capture_dir: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::CATALOG_BASE_URL.to_string(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: defaults::OCR_LANGUAGE.to_string(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            locale: defaults::SPEECH_LOCALE.to_string(),
            rate: defaults::SPEECH_RATE,
        }
    }
}

impl CameraConfig {
    /// Directory captured photos are written to.
    pub fn capture_dir(&self) -> PathBuf {
        self.capture_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("shopassist"))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values; invalid TOML or out-of-range
    /// values are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShopAssistError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ShopAssistError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(ShopAssistError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Check values serde cannot constrain.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.speech.rate) {
            return Err(ShopAssistError::ConfigInvalidValue {
                key: "speech.rate".to_string(),
                message: format!("{} is outside 0.0..=1.0", self.speech.rate),
            });
        }
        if self.camera.symbologies.is_empty() {
            return Err(ShopAssistError::ConfigInvalidValue {
                key: "camera.symbologies".to_string(),
                message: "at least one symbology is required".to_string(),
            });
        }
        for name in &self.camera.symbologies {
            if crate::camera::scanner::Symbology::from_config_name(name).is_none() {
                return Err(ShopAssistError::ConfigInvalidValue {
                    key: "camera.symbologies".to_string(),
                    message: format!("unknown symbology '{name}'"),
                });
            }
        }
        if !self.catalog.base_url.starts_with("http://")
            && !self.catalog.base_url.starts_with("https://")
        {
            return Err(ShopAssistError::ConfigInvalidValue {
                key: "catalog.base_url".to_string(),
                message: format!("'{}' is not an http(s) URL", self.catalog.base_url),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SHOPASSIST_CAMERA_DEVICE → camera.device
    /// - SHOPASSIST_CATALOG_URL → catalog.base_url
    /// - SHOPASSIST_LOCALE → speech.locale
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("SHOPASSIST_CAMERA_DEVICE")
            && !device.is_empty()
        {
            self.camera.device = device;
        }

        if let Ok(url) = std::env::var("SHOPASSIST_CATALOG_URL")
            && !url.is_empty()
        {
            self.catalog.base_url = url;
        }

        if let Ok(locale) = std::env::var("SHOPASSIST_LOCALE")
            && !locale.is_empty()
        {
            self.speech.locale = locale;
        }

        self
    }

    /// Look up a value by dotted path, e.g. `speech.rate`.
    pub fn get_value_by_path(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self).map_err(|e| ShopAssistError::Other(e.to_string()))?;
        let mut current = &root;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| ShopAssistError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "no such key".to_string(),
                })?;
        }
        Ok(match current {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ShopAssistError::Other(e.to_string()))
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/shopassist/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("shopassist")
            .join("config.toml")
    }
}
