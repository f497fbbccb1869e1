//! Chart data, computed from the occurrence matrix alone.
//!
//! Rendering reads only these structures, so two runs over the same matrix
//! draw from identical data.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{frame_time_secs, OccurrenceMatrix};

/// Minimum height of a marked peak.
pub const PEAK_MIN_HEIGHT: f64 = 0.5;

/// Minimum distance, in frames, between two marked peaks.
pub const PEAK_MIN_DISTANCE: usize = 5;

/// One detection on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    /// Brand lane (column position).
    pub lane: usize,
    pub time_secs: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineData {
    pub lanes: Vec<String>,
    pub points: Vec<TimelinePoint>,
    pub max_time_secs: f64,
}

/// Detections per brand lane over time.
pub fn timeline(matrix: &OccurrenceMatrix, fps: f64) -> TimelineData {
    let mut points = Vec::new();
    for (lane, _) in matrix.brands().iter().enumerate() {
        for row in matrix.rows() {
            let count = row.counts[lane];
            if count > 0 {
                points.push(TimelinePoint {
                    lane,
                    time_secs: frame_time_secs(row.index, fps),
                    count,
                });
            }
        }
    }
    TimelineData {
        lanes: matrix.brands().to_vec(),
        max_time_secs: max_time(matrix, fps),
        points,
    }
}

fn max_time(matrix: &OccurrenceMatrix, fps: f64) -> f64 {
    matrix
        .rows()
        .iter()
        .map(|r| frame_time_secs(r.index, fps))
        .fold(0.0, f64::max)
}

/// One pie slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareSlice {
    pub brand: String,
    /// Column position, used for a stable color.
    pub column: usize,
    pub total: u64,
    pub percent: f64,
}

/// Brand totals restricted to brands with a positive total, in column order.
pub fn market_share(matrix: &OccurrenceMatrix) -> Vec<ShareSlice> {
    let totals = matrix.totals();
    let grand: u64 = totals.iter().map(|t| t.total).sum();
    totals
        .into_iter()
        .enumerate()
        .filter(|(_, t)| t.total > 0)
        .map(|(column, t)| ShareSlice {
            percent: t.total as f64 / grand as f64 * 100.0,
            brand: t.brand,
            column,
            total: t.total,
        })
        .collect()
}

/// A fixed-width time window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start_secs: u64,
    pub end_secs: u64,
}

impl TimeWindow {
    pub fn label(&self) -> String {
        format!("{}-{}s", self.start_secs, self.end_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapData {
    pub brands: Vec<String>,
    /// Windows holding at least one frame, ascending.
    pub windows: Vec<TimeWindow>,
    /// `cells[brand][window]` = summed count.
    pub cells: Vec<Vec<u64>>,
}

impl HeatmapData {
    pub fn max_cell(&self) -> u64 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// Summed counts per brand and time window. Windows without frames are omitted.
pub fn heatmap(matrix: &OccurrenceMatrix, fps: f64, window_secs: u32) -> HeatmapData {
    let width = u64::from(window_secs.max(1));
    let mut sums: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for row in matrix.rows() {
        let time = frame_time_secs(row.index, fps);
        let window = (time / width as f64).floor() as u64;
        let entry = sums
            .entry(window)
            .or_insert_with(|| vec![0; matrix.brands().len()]);
        for (cell, count) in entry.iter_mut().zip(&row.counts) {
            *cell += u64::from(*count);
        }
    }

    let windows = sums
        .keys()
        .map(|w| TimeWindow {
            start_secs: w * width,
            end_secs: (w + 1) * width,
        })
        .collect();
    let cells = (0..matrix.brands().len())
        .map(|b| sums.values().map(|col| col[b]).collect())
        .collect();

    HeatmapData {
        brands: matrix.brands().to_vec(),
        windows,
        cells,
    }
}

/// One bar of a frequency panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub brand: String,
    pub column: usize,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyData {
    /// Total per brand, ascending.
    pub totals: Vec<Bar>,
    /// Frames in which each brand appears, ascending.
    pub presence: Vec<Bar>,
}

/// Totals and presence per brand, each sorted ascending (ties keep column order).
pub fn frequency(matrix: &OccurrenceMatrix) -> FrequencyData {
    let bars = |value: &dyn Fn(usize) -> u64| {
        let mut bars: Vec<Bar> = matrix
            .brands()
            .iter()
            .enumerate()
            .map(|(column, brand)| Bar {
                brand: brand.clone(),
                column,
                value: value(column),
            })
            .collect();
        bars.sort_by_key(|b| b.value);
        bars
    };

    FrequencyData {
        totals: bars(&|c| matrix.total(c)),
        presence: bars(&|c| matrix.frames_present(c) as u64),
    }
}

/// One brand's count series with its marked peaks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakSeries {
    pub brand: String,
    pub column: usize,
    /// `(time, count)` for every row, in row order.
    pub points: Vec<(f64, u32)>,
    /// Row positions of marked peaks.
    pub peaks: Vec<usize>,
}

/// Count series and local maxima for every brand with a positive count.
pub fn peak_series(matrix: &OccurrenceMatrix, fps: f64) -> Vec<PeakSeries> {
    matrix
        .brands()
        .iter()
        .enumerate()
        .filter(|(column, _)| matrix.column(*column).any(|c| c > 0))
        .map(|(column, brand)| {
            let points: Vec<(f64, u32)> = matrix
                .rows()
                .iter()
                .map(|row| (frame_time_secs(row.index, fps), row.counts[column]))
                .collect();
            let values: Vec<f64> = points.iter().map(|(_, c)| f64::from(*c)).collect();
            PeakSeries {
                brand: brand.clone(),
                column,
                peaks: find_peaks(&values, PEAK_MIN_HEIGHT, PEAK_MIN_DISTANCE),
                points,
            }
        })
        .collect()
}

/// Local maxima of `values`.
///
/// A peak is a sample (or the middle of a flat plateau) strictly higher than
/// both neighbours; the first and last samples never qualify. Peaks lower
/// than `min_height` are dropped. Peaks closer than `min_distance` samples
/// are thinned, keeping the higher one (the later one on equal height).
/// Returned positions are ascending.
pub fn find_peaks(values: &[f64], min_height: f64, min_distance: usize) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    peaks.retain(|&p| values[p] >= min_height);

    if min_distance > 1 && peaks.len() > 1 {
        let mut order: Vec<usize> = (0..peaks.len()).collect();
        order.sort_by(|&a, &b| {
            values[peaks[b]]
                .total_cmp(&values[peaks[a]])
                .then(b.cmp(&a))
        });

        let mut keep = vec![true; peaks.len()];
        for &j in &order {
            if !keep[j] {
                continue;
            }
            for (k, &p) in peaks.iter().enumerate() {
                if k != j && keep[k] && peaks[j].abs_diff(p) < min_distance {
                    keep[k] = false;
                }
            }
        }
        peaks = peaks
            .into_iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(p))
            .collect();
    }

    peaks
}

/// A frame in which more than one brand is visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoOccurrence {
    pub frame: String,
    pub time_secs: f64,
    pub brands: Vec<String>,
}

impl CoOccurrence {
    pub fn count(&self) -> usize {
        self.brands.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoOccurrenceData {
    pub points: Vec<CoOccurrence>,
    /// Largest number of simultaneous brands (0 when there is no co-occurrence).
    pub max_count: usize,
    /// Positions in `points` reaching `max_count`.
    pub annotated: Vec<usize>,
}

impl CoOccurrenceData {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Frames with strictly more than one active brand.
pub fn co_occurrence(matrix: &OccurrenceMatrix, fps: f64) -> CoOccurrenceData {
    let points: Vec<CoOccurrence> = matrix
        .rows()
        .iter()
        .filter(|row| row.active_brands() > 1)
        .map(|row| CoOccurrence {
            frame: row.frame.clone(),
            time_secs: frame_time_secs(row.index, fps),
            brands: row
                .counts
                .iter()
                .zip(matrix.brands())
                .filter(|(c, _)| **c > 0)
                .map(|(_, b)| b.clone())
                .collect(),
        })
        .collect();

    let max_count = points.iter().map(CoOccurrence::count).max().unwrap_or(0);
    let annotated = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.count() == max_count)
        .map(|(i, _)| i)
        .collect();

    CoOccurrenceData {
        points,
        max_count,
        annotated,
    }
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
    fn test_timeline_uses_frame_index_for_time() {
        let m = matrix(
            &["A", "B"],
            &[("frame_0004_result", &[2, 0]), ("frame_0010_result", &[0, 1])],
        );
        let data = timeline(&m, 2.0);
        assert_eq!(
            data.points,
            vec![
                TimelinePoint { lane: 0, time_secs: 2.0, count: 2 },
                TimelinePoint { lane: 1, time_secs: 5.0, count: 1 },
            ]
        );
        assert_eq!(data.max_time_secs, 5.0);
    }

    #[test]
    fn test_market_share_drops_zero_totals() {
        let m = matrix(&["A", "B", "C"], &[("f0", &[1, 0, 3])]);
        let slices = market_share(&m);
        let brands: Vec<&str> = slices.iter().map(|s| s.brand.as_str()).collect();
        assert_eq!(brands, vec!["A", "C"]);
        assert_eq!(slices[1].percent, 75.0);
        assert!(market_share(&OccurrenceMatrix::sentinel(vec!["A".into()])).is_empty());
    }

    #[test]
    fn test_heatmap_omits_empty_windows() {
        let m = matrix(
            &["A", "B"],
            &[
                ("frame_0000", &[1, 0]),
                ("frame_0029", &[2, 1]),
                ("frame_0095", &[0, 4]),
            ],
        );
        let data = heatmap(&m, 1.0, 30);
        let labels: Vec<String> = data.windows.iter().map(TimeWindow::label).collect();
        assert_eq!(labels, vec!["0-30s", "90-120s"]);
        assert_eq!(data.cells, vec![vec![3, 0], vec![1, 4]]);
        assert_eq!(data.max_cell(), 4);
    }

    #[test]
    fn test_frequency_sorted_ascending_stable() {
        let m = matrix(
            &["A", "B", "C"],
            &[("f0", &[3, 1, 1]), ("f1", &[0, 0, 1])],
        );
        let data = frequency(&m);
        let totals: Vec<(&str, u64)> = data.totals.iter().map(|b| (b.brand.as_str(), b.value)).collect();
        assert_eq!(totals, vec![("B", 1), ("C", 2), ("A", 3)]);
        let presence: Vec<(&str, u64)> =
            data.presence.iter().map(|b| (b.brand.as_str(), b.value)).collect();
        assert_eq!(presence, vec![("A", 1), ("B", 1), ("C", 2)]);
    }

    #[test]
    fn test_find_peaks_basic() {
        let values = [0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0];
        assert_eq!(find_peaks(&values, 0.5, 5), vec![1, 7]);
    }

    #[test]
    fn test_find_peaks_excludes_edges_and_low_peaks() {
        let values = [5.0, 0.0, 0.3, 0.0, 1.0, 0.0, 5.0];
        assert_eq!(find_peaks(&values, 0.5, 1), vec![4]);
    }

    #[test]
    fn test_find_peaks_plateau_midpoint() {
        let values = [0.0, 2.0, 2.0, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 0.5, 5), vec![2]);
        // A plateau running into the last sample is not a peak
        let values = [0.0, 2.0, 2.0];
        assert!(find_peaks(&values, 0.5, 5).is_empty());
    }

    #[test]
    fn test_find_peaks_distance_keeps_higher() {
        let values = [0.0, 1.0, 0.0, 3.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 0.5, 5), vec![3, 9]);
        // Equal heights: the later peak wins
        let values = [0.0, 2.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 0.5, 5), vec![3]);
        let values = [0.0, 1.0, 0.0, 3.0, 0.0, 3.0, 0.0, 1.0, 0.0];
        assert_eq!(find_peaks(&values, 0.5, 3), vec![1, 5]);
    }

    #[test]
    fn test_peak_series_skips_silent_brands() {
        let m = matrix(&["A", "B"], &[("f0", &[0, 0]), ("f1", &[0, 2]), ("f2", &[0, 0])]);
        let series = peak_series(&m, 1.0);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].brand, "B");
        assert_eq!(series[0].peaks, vec![1]);
    }

    #[test]
    fn test_co_occurrence_single_frame() {
        let m = matrix(
            &["A", "B", "C"],
            &[("frame_0000", &[1, 0, 0]), ("frame_0001", &[1, 2, 0])],
        );
        let data = co_occurrence(&m, 1.0);
        assert_eq!(data.points.len(), 1);
        assert_eq!(data.points[0].count(), 2);
        assert_eq!(data.points[0].brands, vec!["A", "B"]);
        assert_eq!(data.max_count, 2);
        assert_eq!(data.annotated, vec![0]);
    }

    #[test]
    fn test_co_occurrence_empty() {
        let m = matrix(&["A", "B"], &[("f0", &[1, 0]), ("f1", &[0, 1])]);
        let data = co_occurrence(&m, 1.0);
        assert!(data.is_empty());
        assert_eq!(data.max_count, 0);
    }

    #[test]
    fn test_chart_data_is_deterministic() {
        let m = matrix(
            &["A", "B"],
            &[("frame_0000", &[1, 1]), ("frame_0003", &[0, 2]), ("frame_0007", &[4, 0])],
        );
        assert_eq!(heatmap(&m, 1.0, 5), heatmap(&m, 1.0, 5));
        assert_eq!(
            serde_json::to_string(&peak_series(&m, 1.0)).unwrap(),
            serde_json::to_string(&peak_series(&m, 1.0)).unwrap()
        );
    }
}
