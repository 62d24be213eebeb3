//! Default configuration constants and user-facing phrases for shopassist.
//!
//! Phrases shown on screen and spoken aloud live here so the session, the
//! presentation and the tests agree on the exact wording.

/// Default V4L2 camera device node.
pub const CAMERA_DEVICE: &str = "/dev/video0";

/// Symbologies the scanner listens for unless configured otherwise.
pub const SYMBOLOGIES: &[&str] = &["ean-13", "qr", "code-128"];

/// Base URL of the Open Food Facts catalog.
pub const CATALOG_BASE_URL: &str = "https://world.openfoodfacts.org";

/// Tesseract language pack used for text recognition.
pub const OCR_LANGUAGE: &str = "eng";

/// Speech locale, fixed for the lifetime of the process.
pub const SPEECH_LOCALE: &str = "en-US";

/// Normalized speech rate (0.0 to 1.0); 0.5 is the engine's normal pace.
pub const SPEECH_RATE: f32 = 0.5;

/// espeak-ng words-per-minute at rate 1.0.
///
/// Chosen so that the default rate of 0.5 lands on espeak's own default of
/// 175 wpm.
pub const MAX_WORDS_PER_MINUTE: f32 = 350.0;

/// Capacity of the scanner -> session channel.
///
/// Detection batches beyond this are dropped while the session is busy; the
/// debounce flag would ignore them anyway.
pub const DETECTION_QUEUE: usize = 8;

/// Product name shown when the catalog entry has no name.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Product name shown (and spoken) when a lookup fails.
pub const LOOKUP_FAILED: &str = "Error fetching product";

/// Text shown (and spoken) when a photo contains no recognizable text.
pub const NO_TEXT_DETECTED: &str = "No text detected.";

/// Alert raised when the capture pipeline fails.
pub const OCR_ALERT_TITLE: &str = "Error";
pub const OCR_ALERT_MESSAGE: &str = "Failed to process OCR.";

/// Phrase announced after a successful lookup.
pub fn product_phrase(name: &str) -> String {
    format!("Product name is {name}")
}

/// Phrase announced after text was recognized.
pub fn recognized_phrase(text: &str) -> String {
    format!("Recognized text is: {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_phrase_wording() {
        assert_eq!(product_phrase("Acme Juice"), "Product name is Acme Juice");
    }

    #[test]
    fn recognized_phrase_keeps_newlines() {
        assert_eq!(
            recognized_phrase("Milk\n2% Fat"),
            "Recognized text is: Milk\n2% Fat"
        );
    }

    #[test]
    fn default_rate_maps_to_espeak_default() {
        assert_eq!((SPEECH_RATE * MAX_WORDS_PER_MINUTE).round() as u32, 175);
    }
}
