//! Merged OCR text artifact (the frame-text store).
//!
//! Format, as written by the OCR merge step:
//!
//! ```text
//! === frame_0000_result ===
//! first recognized line
//! second recognized line
//!
//! === frame_0001_result ===
//!
//! ```
//!
//! Lines before the first delimiter are ignored. Blank lines never count as
//! text. A repeated label replaces the earlier block but keeps its position.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::models::Frame;

/// Parsed merged text artifact: frames in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTextStore {
    frames: Vec<Frame>,
}

impl FrameTextStore {
    /// Parse the merged text artifact.
    pub fn parse(contents: &str) -> Self {
        let mut frames: Vec<Frame> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut current: Option<usize> = None;

        for raw in contents.lines() {
            let line = raw.trim();
            if let Some(label) = delimiter_label(line) {
                current = if label.is_empty() {
                    None
                } else if let Some(&pos) = positions.get(label) {
                    frames[pos].lines.clear();
                    Some(pos)
                } else {
                    let pos = frames.len();
                    positions.insert(label.to_string(), pos);
                    frames.push(Frame::new(label, Vec::new(), pos));
                    Some(pos)
                };
            } else if !line.is_empty() {
                if let Some(pos) = current {
                    frames[pos].lines.push(line.to_string());
                }
            }
        }

        Self { frames }
    }

    /// Read and parse the artifact at `path`.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// All frames, in discovery order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frames carrying at least one non-empty line.
    pub fn text_frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().filter(|f| f.has_text())
    }

    pub fn get(&self, label: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.label == label)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Extract the label from a `=== label ===` delimiter line.
fn delimiter_label(line: &str) -> Option<&str> {
    if line.len() >= 6 && line.starts_with("===") && line.ends_with("===") {
        Some(line.trim_matches(|c| c == '=' || c == ' '))
    } else {
        None
    }
}

/// Render frames into the merged text format.
pub fn render_merged_texts<'a, I>(frames: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut out = String::new();
    for (label, lines) in frames {
        let _ = writeln!(out, "=== {} ===", label);
        for line in lines {
            let _ = writeln!(out, "{}", line);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks_in_order() {
        let text = "=== frame_0000_result ===\nCoinbase on court\n\n=== frame_0001_result ===\nno text\n\n";
        let store = FrameTextStore::parse(text);
        assert_eq!(store.len(), 2);
        assert_eq!(store.frames()[0].label, "frame_0000_result");
        assert_eq!(store.frames()[0].lines, vec!["Coinbase on court"]);
        assert_eq!(store.frames()[1].index, 1);
    }

    #[test]
    fn test_parse_skips_preamble_and_blank_lines() {
        let text = "stray line\n=== frame_0002_result ===\n   \n\nTISSOT\n";
        let store = FrameTextStore::parse(text);
        assert_eq!(store.len(), 1);
        assert_eq!(store.frames()[0].lines, vec!["TISSOT"]);
    }

    #[test]
    fn test_parse_empty_frames_are_kept_but_not_text_frames() {
        let text = "=== frame_0000_result ===\n\n=== frame_0001_result ===\nkia\n\n";
        let store = FrameTextStore::parse(text);
        assert_eq!(store.len(), 2);
        let labels: Vec<&str> = store.text_frames().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["frame_0001_result"]);
    }

    #[test]
    fn test_repeated_label_replaces_block() {
        let text = "=== a1 ===\nold\n\n=== b2 ===\nx\n\n=== a1 ===\nnew\n";
        let store = FrameTextStore::parse(text);
        assert_eq!(store.len(), 2);
        assert_eq!(store.frames()[0].lines, vec!["new"]);
    }

    #[test]
    fn test_render_then_parse() {
        let lines = vec!["espn".to_string()];
        let empty: Vec<String> = Vec::new();
        let text = render_merged_texts([
            ("frame_0000_result", lines.as_slice()),
            ("frame_0001_result", empty.as_slice()),
        ]);
        assert_eq!(
            text,
            "=== frame_0000_result ===\nespn\n\n=== frame_0001_result ===\n\n"
        );
        assert_eq!(FrameTextStore::parse(&text).len(), 2);
    }
}
