//! Frame acquisition and OCR: the producer of the merged text artifact.
//!
//! The pipeline only depends on [`FrameTextProducer`]. The stock producer
//! downloads the video with yt-dlp, samples frames with ffmpeg, recognizes
//! each frame and writes `merged_texts.txt` into the run directory.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{image_stem, result_label};
use crate::ocr::{backend_for_model, render_merged_texts, OcrBackend, OcrError};
use crate::storage::{write_atomic, RunContext, StoreError};

use super::youtube;

/// Errors from the acquisition collaborator.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Frame extraction failed: {0}")]
    Frames(String),

    #[error("OCR backend unavailable: {0}")]
    Unavailable(String),

    #[error("{frame}: {source}")]
    Ocr {
        frame: String,
        #[source]
        source: OcrError,
    },

    #[error("OCR task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the pipeline asks the producer for.
#[derive(Debug, Clone, Copy)]
pub struct AcquireRequest<'a> {
    pub source_url: &'a str,
    /// Opaque OCR model selector.
    pub model: &'a str,
    pub sampling_fps: f64,
    pub run: &'a RunContext,
}

/// What the producer reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquireSummary {
    /// Frames sampled from the video.
    pub frames: usize,
    /// Frames sent through OCR.
    pub recognized: usize,
}

/// Produces frame images and the merged text artifact for a run.
#[async_trait]
pub trait FrameTextProducer: Send + Sync {
    /// Fill `request.run.frames_dir()` and write `request.run.merged_texts()`.
    async fn produce(&self, request: &AcquireRequest<'_>) -> Result<AcquireSummary, AcquireError>;
}

/// yt-dlp + ffmpeg + OCR backend.
pub struct YoutubeOcrProducer {
    /// Frames sent to OCR (0 = unlimited).
    max_frames: usize,
}

impl YoutubeOcrProducer {
    pub fn new(max_frames: usize) -> Self {
        Self { max_frames }
    }
}

#[async_trait]
impl FrameTextProducer for YoutubeOcrProducer {
    async fn produce(&self, request: &AcquireRequest<'_>) -> Result<AcquireSummary, AcquireError> {
        let run = request.run;

        let backend = backend_for_model(request.model);
        if !backend.is_available() {
            return Err(AcquireError::Unavailable(backend.availability_hint()));
        }

        let download = youtube::download_video(request.source_url, run.root())
            .await
            .map_err(|e| AcquireError::Download(format!("{:#}", e)))?;
        info!(
            "Downloaded '{}' ({})",
            download.metadata.title, download.metadata.id
        );

        let frames = youtube::extract_frames(
            &download.video_path,
            &run.frames_dir(),
            request.sampling_fps,
        )
        .await
        .map_err(|e| AcquireError::Frames(format!("{:#}", e)))?;
        let sampled = frames.len();

        let max_frames = self.max_frames;
        let recognized = tokio::task::spawn_blocking(move || {
            recognize_frames(backend.as_ref(), &frames, max_frames)
        })
        .await
        .map_err(|e| AcquireError::Task(e.to_string()))??;

        let merged = render_merged_texts(
            recognized
                .iter()
                .map(|(label, lines)| (label.as_str(), lines.as_slice())),
        );
        write_atomic(&run.merged_texts(), merged.as_bytes())?;
        info!("Merged OCR text written to {}", run.merged_texts().display());

        Ok(AcquireSummary {
            frames: sampled,
            recognized: recognized.len(),
        })
    }
}

/// OCR the first `max_frames` frames (0 = all), in the given order.
///
/// Returns `(label, lines)` pairs where the label is `<image stem>_result`.
pub fn recognize_frames(
    backend: &dyn OcrBackend,
    frames: &[PathBuf],
    max_frames: usize,
) -> Result<Vec<(String, Vec<String>)>, AcquireError> {
    let limit = if max_frames == 0 {
        frames.len()
    } else {
        max_frames.min(frames.len())
    };

    let mut results = Vec::with_capacity(limit);
    for (idx, path) in frames.iter().take(limit).enumerate() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let label = result_label(image_stem(&stem));

        let result = backend.ocr_image(path).map_err(|source| AcquireError::Ocr {
            frame: label.clone(),
            source,
        })?;
        debug!(
            "[{}/{}] {}: {} lines in {}ms",
            idx + 1,
            limit,
            label,
            result.lines.len(),
            result.processing_time_ms
        );
        results.push((label, result.lines));
    }
    Ok(results)
}
