//! OCR backend abstraction.
//!
//! The model selector passed with each run request is opaque to the
//! pipeline. It is resolved here into one of the supported engines:
//! - `tesseract` or `tesseract:<lang>`: Tesseract via command line
//! - anything else: PaddleOCR via its command line, using `<model>_det` and
//!   `<model>_rec` as detection and recognition model names

use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use super::paddle::PaddleBackend;
use super::tesseract::TesseractBackend;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of OCR on one image.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Recognized text lines, in reading order.
    pub lines: Vec<String>,
    /// Which backend produced this result.
    pub backend: OcrBackendType,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    Tesseract,
    /// PaddleOCR via command-line.
    PaddleOcr,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::PaddleOcr => "paddleocr",
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (binary installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Core OCR: extract text lines from an image file.
    fn run_ocr(&self, image_path: &Path) -> Result<Vec<String>, OcrError>;

    /// Run OCR on an image file, returning a timed result.
    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let lines = self.run_ocr(image_path)?;
        Ok(OcrResult {
            lines,
            backend: self.backend_type(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Configuration shared by OCR backends.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng").
    pub language: String,
    /// Model family name (PaddleOCR), e.g. "PP-OCRv5_server".
    pub model: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            model: None,
        }
    }
}

/// Resolve a model selector into a backend.
pub fn backend_for_model(selector: &str) -> Box<dyn OcrBackend> {
    let selector = selector.trim();
    let (name, arg) = match selector.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (selector, None),
    };

    if name.eq_ignore_ascii_case("tesseract") || name.is_empty() {
        let mut config = OcrConfig::default();
        if let Some(lang) = arg.filter(|a| !a.is_empty()) {
            config.language = lang.to_string();
        }
        Box::new(TesseractBackend::with_config(config))
    } else {
        Box::new(PaddleBackend::with_config(OcrConfig {
            model: Some(selector.to_string()),
            ..OcrConfig::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_for_model() {
        assert_eq!(
            backend_for_model("tesseract").backend_type(),
            OcrBackendType::Tesseract
        );
        assert_eq!(
            backend_for_model("Tesseract:deu").backend_type(),
            OcrBackendType::Tesseract
        );
        assert_eq!(
            backend_for_model("PP-OCRv5_server").backend_type(),
            OcrBackendType::PaddleOcr
        );
    }
}
