//! Text recognition on captured images.
//!
//! Tesseract prints recognized text paragraph by paragraph, separated by
//! blank lines; each paragraph becomes one [`TextBlock`].

use crate::error::{Result, ShopAssistError};
use crate::exec::CommandExecutor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A visually grouped region of recognized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Recognizes text blocks in an image file.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Blocks in reading order; empty when the image has no text.
    async fn recognize(&self, image: &Path) -> Result<Vec<TextBlock>>;
}

/// Split raw OCR output into blocks at blank lines.
pub fn split_blocks(output: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(TextBlock::new(current.join("\n")));
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        blocks.push(TextBlock::new(current.join("\n")));
    }

    blocks
}

/// Join block texts with newlines, or `None` when there are no blocks.
pub fn join_blocks(blocks: &[TextBlock]) -> Option<String> {
    if blocks.is_empty() {
        return None;
    }
    Some(
        blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Recognizer backed by the `tesseract` CLI.
pub struct TesseractRecognizer<E: CommandExecutor> {
    executor: E,
    language: String,
}

impl<E: CommandExecutor> TesseractRecognizer<E> {
    pub fn new(executor: E, language: impl Into<String>) -> Self {
        Self {
            executor,
            language: language.into(),
        }
    }
}

#[async_trait]
impl<E: CommandExecutor> TextRecognizer for TesseractRecognizer<E> {
    async fn recognize(&self, image: &Path) -> Result<Vec<TextBlock>> {
        let args = vec![
            image.display().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
        ];
        let output = self
            .executor
            .execute("tesseract", &args)
            .await
            .map_err(|e| ShopAssistError::Recognition {
                message: e.to_string(),
            })?;

        let blocks = split_blocks(&output);
        tracing::info!(image = %image.display(), blocks = blocks.len(), "text recognition finished");
        Ok(blocks)
    }
}

/// Recognizer returning fixed blocks, or failing on demand.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    blocks: Vec<TextBlock>,
    should_fail: bool,
}

impl MockRecognizer {
    pub fn new(blocks: &[&str]) -> Self {
        Self {
            blocks: blocks.iter().map(|t| TextBlock::new(*t)).collect(),
            should_fail: false,
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, _image: &Path) -> Result<Vec<TextBlock>> {
        if self.should_fail {
            Err(ShopAssistError::Recognition {
                message: "mock recognition failure".to_string(),
            })
        } else {
            Ok(self.blocks.clone())
        }
    }
}
