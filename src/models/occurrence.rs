//! Occurrence matrix, match log and per-brand totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::frame::frame_index;

/// Label of the synthetic row emitted when no frame carries any text.
pub const SENTINEL_FRAME: &str = "no_valid_frames";

/// Schema violations in an occurrence matrix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("Occurrence matrix has no brand columns")]
    NoBrands,

    #[error("Occurrence matrix has no rows")]
    NoRows,

    #[error("Row {frame} has {found} counts, expected {expected}")]
    RowWidth {
        frame: String,
        found: usize,
        expected: usize,
    },

    #[error("Duplicate frame row: {0}")]
    DuplicateFrame(String),
}

/// One frame's match counts, one per brand column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceRow {
    pub frame: String,
    /// Sampling index, used for the frame -> time mapping.
    pub index: usize,
    pub counts: Vec<u32>,
}

impl OccurrenceRow {
    /// Row for `frame`; `position` is the fallback index when the label has no digits.
    pub fn new(frame: impl Into<String>, position: usize, counts: Vec<u32>) -> Self {
        let frame = frame.into();
        let index = frame_index(&frame).unwrap_or(position);
        Self {
            frame,
            index,
            counts,
        }
    }

    /// Number of brands with a positive count in this frame.
    pub fn active_brands(&self) -> usize {
        self.counts.iter().filter(|c| **c > 0).count()
    }
}

/// Frame x brand table of fuzzy match counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceMatrix {
    brands: Vec<String>,
    rows: Vec<OccurrenceRow>,
}

impl OccurrenceMatrix {
    /// Build a validated matrix. Rows keep the given order.
    pub fn new(brands: Vec<String>, rows: Vec<OccurrenceRow>) -> Result<Self, MatrixError> {
        if brands.is_empty() {
            return Err(MatrixError::NoBrands);
        }
        if rows.is_empty() {
            return Err(MatrixError::NoRows);
        }
        let mut seen = std::collections::HashSet::new();
        for row in &rows {
            if row.counts.len() != brands.len() {
                return Err(MatrixError::RowWidth {
                    frame: row.frame.clone(),
                    found: row.counts.len(),
                    expected: brands.len(),
                });
            }
            if !seen.insert(row.frame.as_str()) {
                return Err(MatrixError::DuplicateFrame(row.frame.clone()));
            }
        }
        Ok(Self { brands, rows })
    }

    /// The one-row all-zero matrix used when no frame has text.
    pub fn sentinel(brands: Vec<String>) -> Self {
        let counts = vec![0; brands.len()];
        Self {
            brands,
            rows: vec![OccurrenceRow {
                frame: SENTINEL_FRAME.to_string(),
                index: 0,
                counts,
            }],
        }
    }

    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    pub fn rows(&self) -> &[OccurrenceRow] {
        &self.rows
    }

    pub fn is_sentinel(&self) -> bool {
        self.rows.len() == 1 && self.rows[0].frame == SENTINEL_FRAME
    }

    pub fn brand_position(&self, brand: &str) -> Option<usize> {
        self.brands.iter().position(|b| b == brand)
    }

    /// Counts of one brand column, in row order.
    pub fn column(&self, brand_idx: usize) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().map(move |row| row.counts[brand_idx])
    }

    /// Column sum for one brand.
    pub fn total(&self, brand_idx: usize) -> u64 {
        self.column(brand_idx).map(u64::from).sum()
    }

    /// Number of frames in which the brand has a positive count.
    pub fn frames_present(&self, brand_idx: usize) -> usize {
        self.column(brand_idx).filter(|c| *c > 0).count()
    }

    /// Column sums in brand column order.
    pub fn totals(&self) -> Vec<TotalsRow> {
        self.brands
            .iter()
            .enumerate()
            .map(|(idx, brand)| TotalsRow {
                brand: brand.clone(),
                total: self.total(idx),
            })
            .collect()
    }
}

/// One fuzzy match of an OCR token against a brand variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub brand: String,
    pub word: String,
    pub matched_variant: String,
    pub score: f64,
}

/// Frame label -> matches found in that frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchLog(BTreeMap<String, Vec<MatchRecord>>);

impl MatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame, even if it ends up with no matches.
    pub fn add_frame(&mut self, frame: &str) {
        self.0.entry(frame.to_string()).or_default();
    }

    pub fn push(&mut self, frame: &str, record: MatchRecord) {
        self.0.entry(frame.to_string()).or_default().push(record);
    }

    pub fn frame(&self, frame: &str) -> &[MatchRecord] {
        self.0.get(frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Matched words for one brand within one frame, in match order.
    pub fn words_for(&self, frame: &str, brand: &str) -> Vec<&str> {
        self.frame(frame)
            .iter()
            .filter(|m| m.brand == brand)
            .map(|m| m.word.as_str())
            .collect()
    }

    pub fn frames(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Aggregate score of one brand over all frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsRow {
    pub brand: String,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brands() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }

    #[test]
    fn test_new_validates_row_width() {
        let err = OccurrenceMatrix::new(brands(), vec![OccurrenceRow::new("frame_0000", 0, vec![1])])
            .unwrap_err();
        assert_eq!(
            err,
            MatrixError::RowWidth {
                frame: "frame_0000".into(),
                found: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(
            OccurrenceMatrix::new(vec![], vec![]).unwrap_err(),
            MatrixError::NoBrands
        );
        assert_eq!(
            OccurrenceMatrix::new(brands(), vec![]).unwrap_err(),
            MatrixError::NoRows
        );
    }

    #[test]
    fn test_sentinel_is_all_zero() {
        let matrix = OccurrenceMatrix::sentinel(brands());
        assert!(matrix.is_sentinel());
        assert_eq!(matrix.rows()[0].frame, SENTINEL_FRAME);
        assert!(matrix.totals().iter().all(|t| t.total == 0));
    }

    #[test]
    fn test_totals_and_presence() {
        let matrix = OccurrenceMatrix::new(
            brands(),
            vec![
                OccurrenceRow::new("frame_0000_result", 0, vec![2, 0]),
                OccurrenceRow::new("frame_0001_result", 1, vec![1, 1]),
            ],
        )
        .unwrap();
        let totals = matrix.totals();
        assert_eq!(totals[0].total, 3);
        assert_eq!(totals[1].total, 1);
        assert_eq!(matrix.frames_present(0), 2);
        assert_eq!(matrix.frames_present(1), 1);
        assert_eq!(matrix.rows()[1].active_brands(), 2);
    }

    #[test]
    fn test_match_log_serializes_as_map() {
        let mut log = MatchLog::new();
        log.add_frame("frame_0001_result");
        log.push(
            "frame_0000_result",
            MatchRecord {
                brand: "Kia".into(),
                word: "kia".into(),
                matched_variant: "kia".into(),
                score: 100.0,
            },
        );
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["frame_0000_result"][0]["matched_variant"], "kia");
        assert!(json["frame_0001_result"].as_array().unwrap().is_empty());
        assert_eq!(log.words_for("frame_0000_result", "Kia"), vec!["kia"]);
    }
}
