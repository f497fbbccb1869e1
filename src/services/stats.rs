//! Derived statistics: per-brand totals, ranks, shares and extremes.
//!
//! Everything here is recomputed from the occurrence matrix on each run.

use serde::Serialize;

use crate::models::{frame_time_secs, OccurrenceMatrix};

/// A frame singled out for one brand (its peak or lowest non-zero count).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameExtreme {
    pub frame: String,
    pub index: usize,
    pub time_secs: f64,
    pub count: u32,
}

/// Statistics of one brand column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandStat {
    pub brand: String,
    /// Position of the brand's column in the matrix.
    pub column: usize,
    pub total: u64,
    /// 1 = highest total; ties keep column order.
    pub rank: usize,
    /// Percentage of the grand total (0 when the grand total is 0).
    pub share: f64,
    /// Rows in which the brand has a positive count.
    pub frames_present: usize,
    /// Percentage of analysed rows in which the brand appears.
    pub appearance_rate: f64,
    /// First row holding the brand's maximum count, if positive.
    pub peak: Option<FrameExtreme>,
    /// First row holding the brand's smallest positive count.
    pub lowest: Option<FrameExtreme>,
}

/// Statistics of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    /// Brands ordered by rank.
    pub ranked: Vec<BrandStat>,
    /// Rows of the occurrence matrix, 0 for the sentinel matrix.
    pub frames_analysed: usize,
    pub grand_total: u64,
    /// Mean total per brand.
    pub mean_total: f64,
    /// Rows in which more than one brand is positive.
    pub co_occurrence_frames: usize,
    /// Percentage of analysed rows with co-occurrence.
    pub co_occurrence_rate: f64,
    /// Span covered by the sampled frames, `(last index + 1) / fps`.
    pub duration_secs: f64,
}

impl RunStatistics {
    /// Compute statistics for `matrix` at sampling rate `fps`.
    pub fn compute(matrix: &OccurrenceMatrix, fps: f64) -> Self {
        let frames_analysed = if matrix.is_sentinel() {
            0
        } else {
            matrix.rows().len()
        };
        let totals = matrix.totals();
        let grand_total: u64 = totals.iter().map(|t| t.total).sum();

        let mut ranked: Vec<BrandStat> = totals
            .iter()
            .enumerate()
            .map(|(column, row)| {
                let frames_present = matrix.frames_present(column);
                BrandStat {
                    brand: row.brand.clone(),
                    column,
                    total: row.total,
                    rank: 0,
                    share: percentage(row.total as f64, grand_total as f64),
                    frames_present,
                    appearance_rate: percentage(frames_present as f64, frames_analysed as f64),
                    peak: extreme(matrix, column, fps, Extreme::Peak),
                    lowest: extreme(matrix, column, fps, Extreme::Lowest),
                }
            })
            .collect();

        // Stable sort keeps column order among equal totals
        ranked.sort_by(|a, b| b.total.cmp(&a.total));
        for (pos, stat) in ranked.iter_mut().enumerate() {
            stat.rank = pos + 1;
        }

        let co_occurrence_frames = matrix
            .rows()
            .iter()
            .filter(|row| row.active_brands() > 1)
            .count();

        let duration_secs = if frames_analysed == 0 {
            0.0
        } else {
            let last = matrix.rows().iter().map(|r| r.index).max().unwrap_or(0);
            frame_time_secs(last + 1, fps)
        };

        Self {
            mean_total: if totals.is_empty() {
                0.0
            } else {
                grand_total as f64 / totals.len() as f64
            },
            co_occurrence_rate: percentage(co_occurrence_frames as f64, frames_analysed as f64),
            ranked,
            frames_analysed,
            grand_total,
            co_occurrence_frames,
            duration_secs,
        }
    }

    /// The highest-ranked brand.
    pub fn top(&self) -> Option<&BrandStat> {
        self.ranked.first()
    }

    pub fn get(&self, brand: &str) -> Option<&BrandStat> {
        self.ranked.iter().find(|s| s.brand == brand)
    }

    /// Ranked brands with a positive total.
    pub fn detected(&self) -> impl Iterator<Item = &BrandStat> {
        self.ranked.iter().filter(|s| s.total > 0)
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[derive(Clone, Copy)]
enum Extreme {
    Peak,
    Lowest,
}

fn extreme(matrix: &OccurrenceMatrix, column: usize, fps: f64, which: Extreme) -> Option<FrameExtreme> {
    let mut best: Option<(usize, u32)> = None;
    for (pos, row) in matrix.rows().iter().enumerate() {
        let count = row.counts[column];
        if count == 0 {
            continue;
        }
        let better = match (which, best) {
            (_, None) => true,
            (Extreme::Peak, Some((_, b))) => count > b,
            (Extreme::Lowest, Some((_, b))) => count < b,
        };
        if better {
            best = Some((pos, count));
        }
    }

    best.map(|(pos, count)| {
        let row = &matrix.rows()[pos];
        FrameExtreme {
            frame: row.frame.clone(),
            index: row.index,
            time_secs: frame_time_secs(row.index, fps),
            count,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OccurrenceRow;

    fn matrix(brands: &[&str], rows: &[(&str, &[u32])]) -> OccurrenceMatrix {
        OccurrenceMatrix::new(
            brands.iter().map(|b| b.to_string()).collect(),
            rows.iter()
                .enumerate()
                .map(|(pos, (frame, counts))| OccurrenceRow::new(*frame, pos, counts.to_vec()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_ranks_break_ties_by_column_order() {
        let m = matrix(
            &["Coinbase", "Tissot", "Michelob Ultra"],
            &[
                ("frame_0000_result", &[1, 0, 0]),
                ("frame_0001_result", &[0, 0, 0]),
                ("frame_0002_result", &[0, 1, 1]),
            ],
        );
        let stats = RunStatistics::compute(&m, 1.0);
        let order: Vec<(&str, usize)> = stats
            .ranked
            .iter()
            .map(|s| (s.brand.as_str(), s.rank))
            .collect();
        assert_eq!(
            order,
            vec![("Coinbase", 1), ("Tissot", 2), ("Michelob Ultra", 3)]
        );
        assert_eq!(stats.co_occurrence_frames, 1);
        assert_eq!(stats.frames_analysed, 3);
        assert_eq!(stats.duration_secs, 3.0);
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let m = matrix(
            &["A", "B", "C"],
            &[("frame_0000", &[3, 1, 0]), ("frame_0001", &[2, 0, 0])],
        );
        let stats = RunStatistics::compute(&m, 1.0);
        let sum: f64 = stats.ranked.iter().map(|s| s.share).sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert_eq!(stats.get("C").unwrap().share, 0.0);
        assert_eq!(stats.top().unwrap().brand, "A");
        assert!((stats.mean_total - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_sentinel_has_zero_shares() {
        let m = OccurrenceMatrix::sentinel(vec!["A".into(), "B".into()]);
        let stats = RunStatistics::compute(&m, 1.0);
        assert_eq!(stats.grand_total, 0);
        assert_eq!(stats.frames_analysed, 0);
        assert!(stats.ranked.iter().all(|s| s.share == 0.0 && s.peak.is_none()));
        assert_eq!(stats.detected().count(), 0);
        assert_eq!(stats.duration_secs, 0.0);
    }

    #[test]
    fn test_peak_and_lowest_frames() {
        let m = matrix(
            &["A"],
            &[
                ("frame_0000_result", &[0]),
                ("frame_0004_result", &[2]),
                ("frame_0005_result", &[5]),
                ("frame_0006_result", &[1]),
                ("frame_0008_result", &[5]),
                ("frame_0009_result", &[1]),
            ],
        );
        let stats = RunStatistics::compute(&m, 2.0);
        let a = stats.get("A").unwrap();

        let peak = a.peak.as_ref().unwrap();
        assert_eq!((peak.frame.as_str(), peak.count), ("frame_0005_result", 5));
        assert_eq!(peak.time_secs, 2.5);

        let lowest = a.lowest.as_ref().unwrap();
        assert_eq!((lowest.frame.as_str(), lowest.count), ("frame_0006_result", 1));
        assert_eq!(a.frames_present, 5);
        assert!((a.appearance_rate - 500.0 / 6.0).abs() < 1e-9);
    }
}
