//! OCR and the merged frame-text artifact.
//!
//! Recognizes text in sampled video frames using:
//! - Tesseract OCR via command line (default)
//! - PaddleOCR via its command line, selected by model family name
//!
//! Recognized lines for all frames are merged into a single text artifact
//! (`merged_texts.txt`), which is the only thing later stages read.

mod backend;
mod frame_text;
mod model_utils;
mod paddle;
mod tesseract;

pub use backend::{backend_for_model, OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
pub use frame_text::{render_merged_texts, FrameTextStore};
pub use model_utils::check_binary;
pub use paddle::PaddleBackend;
pub use tesseract::TesseractBackend;
