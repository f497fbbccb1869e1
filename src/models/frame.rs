//! Sampled video frames and their recognized text.
//!
//! Frame labels come from the OCR collaborator and look like
//! `frame_0012_result`. The numeric part is the zero-padded sampling index
//! and determines the frame's time offset in the video.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// Suffix the OCR collaborator appends to each frame label.
pub const RESULT_SUFFIX: &str = "_result";

/// Extensions tried, in order, when resolving a frame label to its image.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

static INDEX_RE: OnceLock<Regex> = OnceLock::new();

fn index_re() -> &'static Regex {
    INDEX_RE.get_or_init(|| Regex::new(r"(\d+)(?:_result)?$").expect("static regex"))
}

/// One sampled instant of the source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Label as written in the merged text artifact.
    pub label: String,
    /// Recognized text lines, in OCR order.
    pub lines: Vec<String>,
    /// Sampling index (parsed from the label, or discovery position).
    pub index: usize,
}

impl Frame {
    /// Create a frame. `position` is used as the index when the label has no digits.
    pub fn new(label: impl Into<String>, lines: Vec<String>, position: usize) -> Self {
        let label = label.into();
        let index = frame_index(&label).unwrap_or(position);
        Self {
            label,
            lines,
            index,
        }
    }

    /// Whether any line carries non-whitespace text.
    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|line| !line.trim().is_empty())
    }

    /// Lowercased whitespace-delimited tokens across all lines.
    pub fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        self.lines
            .iter()
            .flat_map(|line| line.split_whitespace())
            .map(str::to_lowercase)
    }

    /// Time offset in seconds at the given sampling rate.
    pub fn time_secs(&self, fps: f64) -> f64 {
        frame_time_secs(self.index, fps)
    }
}

/// Parse the sampling index out of a frame label (`frame_0012_result` -> 12).
pub fn frame_index(label: &str) -> Option<usize> {
    index_re()
        .captures(label.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Convert a sampling index into seconds, rounded to two decimals.
pub fn frame_time_secs(index: usize, fps: f64) -> f64 {
    if fps <= 0.0 {
        return index as f64;
    }
    (index as f64 / fps * 100.0).round() / 100.0
}

/// Image file stem for a frame label (drops the OCR result suffix).
pub fn image_stem(label: &str) -> &str {
    label.strip_suffix(RESULT_SUFFIX).unwrap_or(label)
}

/// File stem used for the frame image at a sampling index.
pub fn frame_file_stem(index: usize) -> String {
    format!("frame_{:04}", index)
}

/// Label the OCR merge step writes for a frame image stem.
pub fn result_label(stem: &str) -> String {
    format!("{}{}", stem, RESULT_SUFFIX)
}

/// Find the image for a frame label inside `frames_dir`, if one exists.
pub fn find_frame_image(label: &str, frames_dir: &Path) -> Option<PathBuf> {
    let stem = image_stem(label);
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| frames_dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.is_file())
}
