//! Tesseract backend for broadcast frames.
//!
//! Frames carry short, scattered overlay text (scoreboards, court boards,
//! sponsor bugs) rather than paragraphs, so Tesseract runs in sparse-text
//! mode and every non-blank output line becomes one recognized line.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_utils::{check_binary, split_text_lines};

const BINARY: &str = "tesseract";

/// Page segmentation mode 11: find as much text as possible, in no order.
const SPARSE_TEXT_PSM: &str = "11";

/// Tesseract CLI bound to one recognition language.
pub struct TesseractBackend {
    language: String,
}

impl TesseractBackend {
    /// Backend for `language` (a tesseract traineddata name such as `eng`).
    /// A blank language falls back to the default one.
    pub fn for_language(language: &str) -> Self {
        let language = language.trim();
        Self {
            language: if language.is_empty() {
                OcrConfig::default().language
            } else {
                language.to_string()
            },
        }
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self::for_language(&config.language)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Arguments for one frame, output on stdout.
    fn args<'a>(&'a self, frame: &'a Path) -> Vec<&'a OsStr> {
        vec![
            frame.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&self.language),
            OsStr::new("--psm"),
            OsStr::new(SPARSE_TEXT_PSM),
        ]
    }

    fn recognize(&self, frame: &Path) -> Result<String, OcrError> {
        let output = Command::new(BINARY).args(self.args(frame)).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OcrError::BackendNotAvailable(self.availability_hint())
            } else {
                OcrError::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(OcrError::OcrFailed(format!(
                "tesseract exited with {} on {}: {}",
                output.status,
                frame.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::with_config(OcrConfig::default())
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(BINARY)
    }

    fn availability_hint(&self) -> String {
        if check_binary(BINARY) {
            format!("Tesseract is available (language: {})", self.language)
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        }
    }

    /// One entry per non-blank output line; the trailing form feed
    /// tesseract appends after each page is dropped.
    fn run_ocr(&self, image_path: &Path) -> Result<Vec<String>, OcrError> {
        let text = self.recognize(image_path)?;
        Ok(split_text_lines(&text.replace('\x0c', "\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_language_uses_default() {
        assert_eq!(TesseractBackend::for_language("  ").language(), "eng");
        assert_eq!(TesseractBackend::for_language("deu").language(), "deu");
        assert_eq!(TesseractBackend::default().language(), "eng");
    }

    #[test]
    fn test_args_use_sparse_text_mode() {
        let backend = TesseractBackend::for_language("eng");
        let frame = Path::new("frames/frame_0003.jpg");
        let args: Vec<String> = backend
            .args(frame)
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["frames/frame_0003.jpg", "stdout", "-l", "eng", "--psm", "11"]
        );
    }
}
