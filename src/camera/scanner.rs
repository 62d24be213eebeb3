//! Continuous barcode detection stream.
//!
//! `ZbarScanner` runs `zbarcam --xml` against the camera device. Every
//! `<index>` record zbar prints is one analysed frame and becomes one batch
//! of [`DetectionEvent`]s. Symbol data arrives in CDATA sections, so values
//! spanning several lines survive intact. Debouncing is not done here; the
//! session decides which detections trigger a lookup.

use crate::error::{Result, ShopAssistError};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const INDEX_CLOSE: &str = "</index>";

/// Encoding format of a scannable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Symbology {
    #[serde(rename = "ean-13")]
    Ean13,
    Qr,
    #[serde(rename = "code-128")]
    Code128,
}

impl Symbology {
    /// Parse the name used in the config file (`ean-13`, `qr`, `code-128`).
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ean-13" | "ean13" => Some(Self::Ean13),
            "qr" | "qrcode" => Some(Self::Qr),
            "code-128" | "code128" => Some(Self::Code128),
            _ => None,
        }
    }

    /// Parse the type prefix zbar prints (`EAN-13`, `QR-Code`, `CODE-128`).
    pub fn from_zbar_name(name: &str) -> Option<Self> {
        match name {
            "EAN-13" => Some(Self::Ean13),
            "QR-Code" => Some(Self::Qr),
            "CODE-128" => Some(Self::Code128),
            _ => None,
        }
    }

    /// Decoder name in zbar's `-S<name>.enable` option.
    pub fn zbar_decoder(self) -> &'static str {
        match self {
            Self::Ean13 => "ean13",
            Self::Qr => "qrcode",
            Self::Code128 => "code128",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ean13 => "EAN-13",
            Self::Qr => "QR",
            Self::Code128 => "Code-128",
        };
        f.write_str(name)
    }
}

/// One decoded code value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub value: String,
    pub symbology: Symbology,
}

impl DetectionEvent {
    pub fn new(value: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            value: value.into(),
            symbology,
        }
    }
}

/// Resolve config names to symbologies, skipping unknown entries.
pub fn symbologies_from_config(names: &[String]) -> Vec<Symbology> {
    names
        .iter()
        .filter_map(|n| Symbology::from_config_name(n))
        .collect()
}

/// Accumulates `zbarcam --xml` output and splits it into frame records.
#[derive(Debug, Default)]
pub struct ZbarXmlReader {
    buffer: String,
}

impl ZbarXmlReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
    }

    /// Remove and return the next complete `<index>...</index>` record.
    pub fn next_frame(&mut self) -> Option<String> {
        let end = frame_end(&self.buffer)?;
        let frame: String = self.buffer.drain(..end).collect();
        Some(frame)
    }
}

/// Byte offset just past the first `</index>` that is not inside CDATA.
fn frame_end(buf: &str) -> Option<usize> {
    let mut pos = 0;
    loop {
        let rest = &buf[pos..];
        let close = rest.find(INDEX_CLOSE)?;
        match rest.find(CDATA_OPEN) {
            Some(open) if open < close => {
                let body = pos + open + CDATA_OPEN.len();
                pos = body + buf[body..].find(CDATA_CLOSE)? + CDATA_CLOSE.len();
            }
            _ => return Some(pos + close + INDEX_CLOSE.len()),
        }
    }
}

/// Value of `name='...'` (or double-quoted) inside a start tag.
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let start = tag.find(&format!(" {name}="))? + name.len() + 2;
    let quote = tag[start..].chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let value = &tag[start + 1..];
    Some(&value[..value.find(quote)?])
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Contents of a `<data>` element, starting right after the opening tag.
///
/// zbar splits a payload containing `]]>` over several CDATA sections; they
/// are joined back together. Returns the text and the offset past `</data>`.
fn read_data(body: &str) -> Option<(String, usize)> {
    let mut text = String::new();
    let mut pos = 0;
    loop {
        let rest = &body[pos..];
        if let Some(after) = rest.strip_prefix(CDATA_OPEN) {
            let len = after.find(CDATA_CLOSE)?;
            text.push_str(&after[..len]);
            pos += CDATA_OPEN.len() + len + CDATA_CLOSE.len();
        } else if rest.starts_with("</data>") {
            return Some((text, pos + "</data>".len()));
        } else {
            let len = rest.find('<')?;
            text.push_str(&unescape(&rest[..len]));
            pos += len;
        }
    }
}

/// Parse one `<index>` record of zbar XML output into detections.
///
/// Symbols of other symbologies, symbols outside `allowed` and empty values
/// are skipped. Base64-encoded binary payloads are decoded lossily.
pub fn parse_zbar_frame(frame: &str, allowed: &[Symbology]) -> Vec<DetectionEvent> {
    let mut events = Vec::new();
    let mut pos = 0;
    while let Some(found) = frame[pos..].find("<symbol") {
        let tag_start = pos + found;
        let Some(tag_len) = frame[tag_start..].find('>') else {
            break;
        };
        let tag = &frame[tag_start..tag_start + tag_len];
        pos = tag_start + tag_len + 1;

        let Some(data_at) = frame[pos..].find("<data>") else {
            break;
        };
        let body = pos + data_at + "<data>".len();
        let Some((raw, consumed)) = read_data(&frame[body..]) else {
            break;
        };
        pos = body + consumed;

        let Some(symbology) = attribute(tag, "type").and_then(Symbology::from_zbar_name) else {
            continue;
        };
        if !allowed.contains(&symbology) {
            continue;
        }
        let value = if attribute(tag, "format") == Some("base64") {
            match BASE64.decode(raw.split_whitespace().collect::<String>()) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::debug!(error = %e, "undecodable scanner payload");
                    continue;
                }
            }
        } else {
            raw
        };
        if value.trim().is_empty() {
            continue;
        }
        events.push(DetectionEvent::new(value, symbology));
    }
    events
}

/// A stream of detection batches, one batch per analysed frame.
#[async_trait]
pub trait CodeSource: Send {
    /// Next batch of codes, in the order the decoder reported them.
    ///
    /// `Ok(None)` ends the stream.
    async fn next_codes(&mut self) -> Result<Option<Vec<DetectionEvent>>>;

    /// Release the camera device. The source is not read again afterwards.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Barcode scanner backed by a `zbarcam` child process.
pub struct ZbarScanner {
    child: Child,
    stdout: BufReader<ChildStdout>,
    reader: ZbarXmlReader,
    symbologies: Vec<Symbology>,
}

impl ZbarScanner {
    /// Arguments passed to zbarcam for the given device and symbology set.
    pub fn args(device: &str, symbologies: &[Symbology]) -> Vec<String> {
        let mut args = vec![
            "--nodisplay".to_string(),
            "--xml".to_string(),
            "-Sdisable".to_string(),
        ];
        for sym in symbologies {
            args.push(format!("-S{}.enable", sym.zbar_decoder()));
        }
        args.push(device.to_string());
        args
    }

    /// Start zbarcam on `device`.
    pub fn spawn(device: &str, symbologies: Vec<Symbology>) -> Result<Self> {
        let mut child = Command::new("zbarcam")
            .args(Self::args(device, &symbologies))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ShopAssistError::ToolNotFound {
                        tool: "zbarcam".to_string(),
                    }
                } else {
                    ShopAssistError::Scanner {
                        message: format!("failed to start zbarcam: {e}"),
                    }
                }
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ShopAssistError::Scanner {
            message: "zbarcam stdout unavailable".to_string(),
        })?;

        tracing::info!(device, ?symbologies, "scanner started");
        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            reader: ZbarXmlReader::new(),
            symbologies,
        })
    }
}

#[async_trait]
impl CodeSource for ZbarScanner {
    async fn next_codes(&mut self) -> Result<Option<Vec<DetectionEvent>>> {
        let mut chunk = String::new();
        loop {
            while let Some(frame) = self.reader.next_frame() {
                let events = parse_zbar_frame(&frame, &self.symbologies);
                if !events.is_empty() {
                    return Ok(Some(events));
                }
                tracing::debug!(frame = %frame.trim(), "ignoring scanner output");
            }

            chunk.clear();
            let read = self
                .stdout
                .read_line(&mut chunk)
                .await
                .map_err(|e| ShopAssistError::Scanner {
                    message: format!("failed to read zbarcam output: {e}"),
                })?;

            if read == 0 {
                let status = self.child.wait().await?;
                tracing::info!(%status, "scanner exited");
                return Ok(None);
            }
            self.reader.push(&chunk);
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill().await?;
        tracing::debug!("scanner killed");
        Ok(())
    }
}

/// Code source that replays scripted batches, then ends.
#[derive(Debug, Default)]
pub struct MockCodeSource {
    batches: VecDeque<Vec<DetectionEvent>>,
}

impl MockCodeSource {
    pub fn new(batches: Vec<Vec<DetectionEvent>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

#[async_trait]
impl CodeSource for MockCodeSource {
    async fn next_codes(&mut self) -> Result<Option<Vec<DetectionEvent>>> {
        Ok(self.batches.pop_front())
    }
}
