//! PaddleOCR backend implementation.
//!
//! Uses the `paddleocr` command-line tool (PaddleOCR 3.x) via subprocess.
//! The model selector names a model family; detection and recognition
//! models are `<family>_det` and `<family>_rec`.
//!
//! ```bash
//! pip install paddleocr
//! paddleocr ocr -i frame.jpg --text_detection_model_name PP-OCRv5_server_det \
//!     --text_recognition_model_name PP-OCRv5_server_rec --save_path out/
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tempfile::TempDir;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_utils::check_binary;

/// Model family used when no selector is given.
const DEFAULT_MODEL: &str = "PP-OCRv5_server";

/// The subset of the saved `*_res.json` we read.
#[derive(Debug, Deserialize)]
struct PaddleResult {
    #[serde(default)]
    rec_texts: Vec<String>,
}

/// PaddleOCR backend using subprocess.
pub struct PaddleBackend {
    config: OcrConfig,
    /// Path to the paddleocr binary.
    binary_path: PathBuf,
}

impl PaddleBackend {
    /// Create a new PaddleOCR backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    /// Create a new PaddleOCR backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            config,
            binary_path: PathBuf::from("paddleocr"),
        }
    }

    /// Set the path to the paddleocr binary.
    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = path.into();
        self
    }

    fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    fn is_binary_available(&self) -> bool {
        check_binary(&self.binary_path.to_string_lossy()) || self.binary_path.exists()
    }

    /// Run PaddleOCR on an image, returning the recognized lines.
    fn run_paddle(&self, image_path: &Path) -> Result<Vec<String>, OcrError> {
        let save_dir = TempDir::new()?;
        let model = self.model();

        let output = Command::new(&self.binary_path)
            .arg("ocr")
            .arg("-i")
            .arg(image_path)
            .args(["--text_detection_model_name", &format!("{}_det", model)])
            .args(["--text_recognition_model_name", &format!("{}_rec", model)])
            .args(["--use_doc_orientation_classify", "False"])
            .args(["--use_doc_unwarping", "False"])
            .args(["--use_textline_orientation", "False"])
            .arg("--save_path")
            .arg(save_dir.path())
            .output();

        match output {
            Ok(output) if output.status.success() => read_rec_texts(save_dir.path()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("paddleocr failed: {}", stderr)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "paddleocr not found (pip install paddleocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for PaddleBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect `rec_texts` from every `*_res.json` in the save directory.
fn read_rec_texts(save_dir: &Path) -> Result<Vec<String>, OcrError> {
    let mut results: Vec<PathBuf> = std::fs::read_dir(save_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_res.json"))
        })
        .collect();
    results.sort();

    if results.is_empty() {
        return Err(OcrError::OcrFailed(
            "paddleocr produced no result file".to_string(),
        ));
    }

    let mut lines = Vec::new();
    for path in results {
        let contents = std::fs::read_to_string(&path)?;
        let parsed: PaddleResult = serde_json::from_str(&contents)
            .map_err(|e| OcrError::OcrFailed(format!("{}: {}", path.display(), e)))?;
        lines.extend(parsed.rec_texts);
    }
    Ok(lines)
}

impl OcrBackend for PaddleBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::PaddleOcr
    }

    fn is_available(&self) -> bool {
        self.is_binary_available()
    }

    fn availability_hint(&self) -> String {
        if !self.is_binary_available() {
            format!(
                "PaddleOCR not found at '{}'. Install with: pip install paddleocr",
                self.binary_path.display()
            )
        } else {
            format!("PaddleOCR is available (model: {})", self.model())
        }
    }

    fn run_ocr(&self, image_path: &Path) -> Result<Vec<String>, OcrError> {
        self.run_paddle(image_path)
    }
}
