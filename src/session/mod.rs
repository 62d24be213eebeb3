//! Scan and capture session.
//!
//! [`Session`] owns every piece of mutable UI state: the debounce flag, the
//! latest product name, the latest recognized text. It is driven one input
//! at a time (see [`actor`]), so no locking is involved. Presentation
//! listens to [`SessionUpdate`]s and never mutates state itself.

pub mod actor;

use crate::camera::capture::StillCamera;
use crate::camera::scanner::DetectionEvent;
use crate::catalog::ProductCatalog;
use crate::defaults;
use crate::error::{Result, ShopAssistError};
use crate::ocr::{TextBlock, TextRecognizer, join_blocks};
use crate::speech::Speech;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub use actor::{SessionHandle, SessionInput, spawn_session};

/// Everything the presentation shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Debounce flag: a detection is being (or has been) handled.
    pub scanned: bool,
    /// Latest product name; empty until the first lookup finishes.
    pub product_name: String,
    /// Latest OCR result; `None` until the first capture succeeds.
    pub ocr_text: Option<String>,
    /// Most recent captured photo.
    pub image_path: Option<PathBuf>,
    /// Code that triggered the latest lookup.
    pub last_code: Option<DetectionEvent>,
}

/// A photo and the text found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    pub image_path: PathBuf,
    pub blocks: Vec<TextBlock>,
}

/// State changes and notices for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A detection was accepted and a lookup started.
    Detected(DetectionEvent),
    ProductName(String),
    ImageCaptured(PathBuf),
    OcrText(String),
    /// The debounce flag was cleared; the next detection triggers a lookup.
    ScanArmed,
    /// Blocking notice for a failed user action.
    Alert { title: String, message: String },
    /// A camera was bound or unbound.
    CameraBound(bool),
}

pub struct Session {
    state: SessionState,
    catalog: Arc<dyn ProductCatalog>,
    recognizer: Arc<dyn TextRecognizer>,
    speech: Arc<dyn Speech>,
    camera: Option<Arc<dyn StillCamera>>,
    updates: Option<Sender<SessionUpdate>>,
}

impl Session {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        recognizer: Arc<dyn TextRecognizer>,
        speech: Arc<dyn Speech>,
    ) -> Self {
        Self {
            state: SessionState::default(),
            catalog,
            recognizer,
            speech,
            camera: None,
            updates: None,
        }
    }

    /// Bind a camera handle for still capture.
    pub fn with_camera(mut self, camera: Arc<dyn StillCamera>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Send state changes to the presentation layer.
    pub fn with_update_sender(mut self, tx: Sender<SessionUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn bind_camera(&mut self, camera: Option<Arc<dyn StillCamera>>) {
        let bound = camera.is_some();
        self.camera = camera;
        self.emit(SessionUpdate::CameraBound(bound));
    }

    fn emit(&self, update: SessionUpdate) {
        if let Some(tx) = &self.updates
            && tx.try_send(update).is_err()
        {
            tracing::debug!("presentation not listening; update dropped");
        }
    }

    /// Handle one batch of detections from the scanner.
    ///
    /// The first code of the first batch seen while the flag is clear sets
    /// the flag and is looked up. Everything else is ignored until
    /// [`Session::rescan`]. Returns whether a lookup ran.
    pub async fn on_codes_scanned(&mut self, codes: &[DetectionEvent]) -> bool {
        if self.state.scanned {
            return false;
        }
        let Some(first) = codes.first() else {
            return false;
        };

        self.state.scanned = true;
        self.state.last_code = Some(first.clone());
        tracing::info!(code = %first.value, symbology = %first.symbology, "scanned barcode");
        self.emit(SessionUpdate::Detected(first.clone()));

        let code = first.value.clone();
        let found = self.lookup(&code).await.is_ok();
        tracing::debug!(code, found, "lookup finished");
        true
    }

    /// Look up a code, store the name and announce the outcome.
    ///
    /// Failures never escape: the name becomes the error placeholder and a
    /// generic phrase is announced.
    pub async fn lookup(&mut self, code: &str) -> Result<String> {
        match self.catalog.product_name(code).await {
            Ok(name) => {
                self.state.product_name = name.clone();
                self.emit(SessionUpdate::ProductName(name.clone()));
                self.speech.say(&defaults::product_phrase(&name));
                Ok(name)
            }
            Err(e) => {
                tracing::error!(code, error = %e, "error fetching product");
                self.state.product_name = defaults::LOOKUP_FAILED.to_string();
                self.emit(SessionUpdate::ProductName(defaults::LOOKUP_FAILED.to_string()));
                self.speech.say(defaults::LOOKUP_FAILED);
                Err(e)
            }
        }
    }

    /// The "Scan Barcode" action: clear the debounce flag unconditionally.
    pub fn rescan(&mut self) {
        self.state.scanned = false;
        self.emit(SessionUpdate::ScanArmed);
    }

    /// The "Recognize Text" action: capture, recognize, display, announce.
    ///
    /// On failure an alert is raised, the displayed text is left as it was,
    /// and the error is returned for callers that report it elsewhere.
    pub async fn recognize_text(&mut self) -> Result<CaptureResult> {
        match self.capture_and_recognize().await {
            Ok(result) => {
                let text = match join_blocks(&result.blocks) {
                    Some(text) => {
                        self.speech.say(&defaults::recognized_phrase(&text));
                        text
                    }
                    None => {
                        self.speech.say(defaults::NO_TEXT_DETECTED);
                        defaults::NO_TEXT_DETECTED.to_string()
                    }
                };
                self.state.ocr_text = Some(text.clone());
                self.emit(SessionUpdate::OcrText(text));
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "OCR error");
                self.emit(SessionUpdate::Alert {
                    title: defaults::OCR_ALERT_TITLE.to_string(),
                    message: defaults::OCR_ALERT_MESSAGE.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn capture_and_recognize(&mut self) -> Result<CaptureResult> {
        let camera = self.camera.clone().ok_or_else(|| ShopAssistError::Capture {
            message: "no camera bound".to_string(),
        })?;

        let image_path = camera.take_photo().await?;
        self.state.image_path = Some(image_path.clone());
        self.emit(SessionUpdate::ImageCaptured(image_path.clone()));

        let blocks = self.recognizer.recognize(&image_path).await?;
        Ok(CaptureResult { image_path, blocks })
    }
}
