//! Fuzzy brand counting: frame text -> occurrence matrix + match log.

use tracing::{debug, info, warn};

use crate::models::{
    BrandKeywordTable, MatchLog, MatchRecord, MatrixError, OccurrenceMatrix, OccurrenceRow,
};
use crate::ocr::FrameTextStore;

use super::fuzzy::BrandMatcher;

/// Output of the counting stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandCount {
    pub matrix: OccurrenceMatrix,
    pub match_log: MatchLog,
}

/// Count fuzzy brand matches in every frame that carries text.
///
/// Columns follow the table order. Rows keep discovery order and only frames
/// with at least one non-blank line get a row; when there are none the
/// result is the one-row sentinel matrix with an empty match log.
pub fn count_brands(
    store: &FrameTextStore,
    table: &BrandKeywordTable,
    threshold: f64,
) -> Result<BrandCount, MatrixError> {
    if table.is_empty() {
        return Err(MatrixError::NoBrands);
    }

    let matcher = BrandMatcher::new(table, threshold);
    let mut match_log = MatchLog::new();
    let mut rows = Vec::new();

    for (position, frame) in store.text_frames().enumerate() {
        let mut counts = vec![0u32; table.len()];
        match_log.add_frame(&frame.label);

        for token in frame.tokens() {
            for hit in matcher.match_token(&token) {
                counts[hit.brand_idx] += 1;
                match_log.push(
                    &frame.label,
                    MatchRecord {
                        brand: hit.brand.to_string(),
                        word: token.clone(),
                        matched_variant: hit.variant.to_string(),
                        score: hit.score,
                    },
                );
            }
        }

        debug!("{}: {:?}", frame.label, counts);
        rows.push(OccurrenceRow::new(frame.label.clone(), position, counts));
    }

    if rows.is_empty() {
        warn!(
            "No recognized text in any of {} frames; emitting empty counts",
            store.len()
        );
        return Ok(BrandCount {
            matrix: OccurrenceMatrix::sentinel(table.names()),
            match_log: MatchLog::new(),
        });
    }

    info!(
        "Counted {} brands across {} frames with text",
        table.len(),
        rows.len()
    );
    Ok(BrandCount {
        matrix: OccurrenceMatrix::new(table.names(), rows)?,
        match_log,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SENTINEL_FRAME;
    use crate::ocr::render_merged_texts;

    /// Build a store from `(label, text)` pairs; text lines are split on '\n'.
    fn store(frames: &[(&str, &str)]) -> FrameTextStore {
        let owned: Vec<(String, Vec<String>)> = frames
            .iter()
            .map(|(label, text)| {
                (
                    label.to_string(),
                    text.lines().map(str::to_string).collect(),
                )
            })
            .collect();
        FrameTextStore::parse(&render_merged_texts(
            owned.iter().map(|(l, lines)| (l.as_str(), lines.as_slice())),
        ))
    }

    fn table(names: &[&str]) -> BrandKeywordTable {
        BrandKeywordTable::broadcast_default().select(names)
    }

    #[test]
    fn test_counts_three_frames() {
        let store = store(&[
            ("frame_0000_result", "Coinbase on court"),
            ("frame_0001_result", "no text"),
            ("frame_0002_result", "tissot ultra"),
        ]);
        let table = table(&["Coinbase", "Tissot", "Michelob Ultra"]);
        let count = count_brands(&store, &table, 80.0).unwrap();

        let matrix = &count.matrix;
        assert_eq!(matrix.rows().len(), 3);
        assert_eq!(matrix.rows()[0].counts, vec![1, 0, 0]);
        assert_eq!(matrix.rows()[1].counts, vec![0, 0, 0]);
        assert_eq!(matrix.rows()[2].counts, vec![0, 1, 1]);
        let totals: Vec<u64> = matrix.totals().iter().map(|t| t.total).collect();
        assert_eq!(totals, vec![1, 1, 1]);

        let records = count.match_log.frame("frame_0000_result");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].word, "coinbase");
        assert_eq!(records[0].matched_variant, "coinbas");
    }

    #[test]
    fn test_every_positive_cell_has_a_record() {
        let store = store(&[
            ("frame_0000_result", "GOOGLE google\nespn kia"),
            ("frame_0001_result", "statefarm"),
        ]);
        let table = BrandKeywordTable::broadcast_default();
        let count = count_brands(&store, &table, 80.0).unwrap();

        for row in count.matrix.rows() {
            for (idx, c) in row.counts.iter().enumerate() {
                let brand = &count.matrix.brands()[idx];
                let words = count.match_log.words_for(&row.frame, brand);
                assert_eq!(words.len(), *c as usize, "{} / {}", row.frame, brand);
            }
        }
        assert_eq!(count.match_log.words_for("frame_0000_result", "Google").len(), 2);
    }

    #[test]
    fn test_blank_frames_are_skipped() {
        let store = store(&[
            ("frame_0000_result", ""),
            ("frame_0001_result", "kia"),
        ]);
        let count = count_brands(&store, &table(&["Kia"]), 80.0).unwrap();
        assert_eq!(count.matrix.rows().len(), 1);
        assert_eq!(count.matrix.rows()[0].frame, "frame_0001_result");
        assert_eq!(count.matrix.rows()[0].index, 1);
    }

    #[test]
    fn test_sentinel_when_no_text() {
        let store = store(&[("frame_0000_result", ""), ("frame_0001_result", "")]);
        let count = count_brands(&store, &table(&["Kia", "ESPN"]), 80.0).unwrap();

        assert!(count.matrix.is_sentinel());
        assert_eq!(count.matrix.rows()[0].frame, SENTINEL_FRAME);
        assert_eq!(count.matrix.totals().iter().map(|t| t.total).sum::<u64>(), 0);
        assert!(count.match_log.is_empty());
    }

    #[test]
    fn test_empty_store_is_sentinel() {
        let count = count_brands(&FrameTextStore::default(), &table(&["Kia"]), 80.0).unwrap();
        assert!(count.matrix.is_sentinel());
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let empty = table(&["Unknown"]);
        assert_eq!(
            count_brands(&FrameTextStore::default(), &empty, 80.0).unwrap_err(),
            MatrixError::NoBrands
        );
    }
}
