//! Chart generation.
//!
//! [`data`] derives what each chart shows from the occurrence matrix;
//! [`render`] turns that into PNG images under the run's plots directory.

pub mod data;
pub mod render;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::OccurrenceMatrix;
use crate::storage::{write_atomic, StoreError};

/// Fonts tried when no chart font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Failed to encode {chart}: {source}")]
    Encode {
        chart: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The six charts, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Timeline,
    MarketShare,
    Heatmap,
    Frequency,
    Peaks,
    CoOccurrence,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Timeline,
        ChartKind::MarketShare,
        ChartKind::Heatmap,
        ChartKind::Frequency,
        ChartKind::Peaks,
        ChartKind::CoOccurrence,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ChartKind::Timeline => "brand_timeline_overview.png",
            ChartKind::MarketShare => "brand_market_share.png",
            ChartKind::Heatmap => "brand_intensity_heatmap.png",
            ChartKind::Frequency => "brand_frequency_analysis.png",
            ChartKind::Peaks => "brand_peak_analysis.png",
            ChartKind::CoOccurrence => "brand_competitive_landscape.png",
        }
    }

    /// Page title used in the report.
    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Timeline => "BRAND DETECTION TIMELINE",
            ChartKind::MarketShare => "BRAND VISIBILITY MARKET SHARE",
            ChartKind::Heatmap => "DETECTION INTENSITY BY TIME WINDOWS",
            ChartKind::Frequency => "BRAND DETECTION FREQUENCY ANALYSIS",
            ChartKind::Peaks => "BRAND DETECTION PEAKS AND TRENDS",
            ChartKind::CoOccurrence => "COMPETITIVE LANDSCAPE - BRAND CO-OCCURRENCES",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChartKind::Timeline => {
                "This timeline shows when each brand was detected throughout the broadcast. \
                 Larger markers indicate more detections within a single frame, revealing \
                 moments of concentrated brand exposure."
            }
            ChartKind::MarketShare => {
                "Share of total detections captured by each brand. Only brands detected at \
                 least once are shown; the percentages compare relative on-screen presence."
            }
            ChartKind::Heatmap => {
                "Detection counts summed over fixed time windows. Darker cells mark the \
                 periods in which a brand was most visible; windows without sampled frames \
                 are omitted."
            }
            ChartKind::Frequency => {
                "Left: total detections per brand. Right: number of frames in which each \
                 brand appears, a measure of how consistently the brand stays on screen."
            }
            ChartKind::Peaks => {
                "Per-brand detection counts over time. Stars mark local peaks, the moments \
                 where a brand's visibility rose above its surrounding frames."
            }
            ChartKind::CoOccurrence => {
                "Frames in which more than one brand is visible at once, plotted by the \
                 number of brands sharing the screen. The busiest frames are annotated with \
                 the brands involved."
            }
        }
    }
}

/// Parameters of one chart generation pass.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub fps: f64,
    pub heatmap_window_secs: u32,
    /// TTF used for labels; system fonts are tried when unset.
    pub font_path: Option<PathBuf>,
}

/// Load the configured font, falling back to common system fonts.
pub fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = configured {
        match read_font(path) {
            Some(font) => return Some(font),
            None => warn!("Chart font {} could not be loaded", path.display()),
        }
    }
    let font = FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .find_map(read_font);
    if font.is_none() {
        warn!("No TrueType font found; chart labels will be omitted");
    }
    font
}

fn read_font(path: &Path) -> Option<FontVec> {
    let bytes = std::fs::read(path).ok()?;
    match FontVec::try_from_vec(bytes) {
        Ok(font) => {
            debug!("Using chart font {}", path.display());
            Some(font)
        }
        Err(e) => {
            debug!("{}: {}", path.display(), e);
            None
        }
    }
}

/// Render the chart whose data is present, or `None` to skip it.
fn draw(
    kind: ChartKind,
    matrix: &OccurrenceMatrix,
    options: &ChartOptions,
    font: Option<&FontVec>,
) -> Option<RgbImage> {
    let has_counts = matrix.totals().iter().any(|t| t.total > 0);
    match kind {
        ChartKind::Timeline => {
            let timeline = data::timeline(matrix, options.fps);
            (!timeline.points.is_empty()).then(|| render::timeline(&timeline, font))
        }
        ChartKind::MarketShare => {
            let slices = data::market_share(matrix);
            (!slices.is_empty()).then(|| render::market_share(&slices, font))
        }
        ChartKind::Heatmap => {
            if !has_counts {
                return None;
            }
            let heatmap = data::heatmap(matrix, options.fps, options.heatmap_window_secs);
            (!heatmap.windows.is_empty()).then(|| render::heatmap(&heatmap, font))
        }
        ChartKind::Frequency => {
            has_counts.then(|| render::frequency(&data::frequency(matrix), font))
        }
        ChartKind::Peaks => {
            let series = data::peak_series(matrix, options.fps);
            (!series.is_empty()).then(|| render::peaks(&series, font))
        }
        ChartKind::CoOccurrence => Some(render::co_occurrence(
            &data::co_occurrence(matrix, options.fps),
            font,
        )),
    }
}

/// Write every chart with data into `plots_dir`.
///
/// A skipped chart also has any stale image from an earlier run removed, so
/// the plots directory only ever reflects the current matrix. Returns the
/// charts written, in report order.
pub fn generate_charts(
    matrix: &OccurrenceMatrix,
    plots_dir: &Path,
    options: &ChartOptions,
) -> Result<Vec<ChartKind>, ChartError> {
    let font = load_font(options.font_path.as_deref());
    let mut written = Vec::new();

    for kind in ChartKind::ALL {
        let path = plots_dir.join(kind.file_name());
        match draw(kind, matrix, options, font.as_ref()) {
            Some(image) => {
                let mut bytes = Vec::new();
                image
                    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                    .map_err(|source| ChartError::Encode {
                        chart: kind.file_name(),
                        source,
                    })?;
                write_atomic(&path, &bytes)?;
                debug!("Wrote {}", path.display());
                written.push(kind);
            }
            None => {
                debug!("Skipping {}: no data", kind.file_name());
                if path.exists() {
                    std::fs::remove_file(&path).map_err(|source| StoreError::Io {
                        path: path.clone(),
                        source,
                    })?;
                }
            }
        }
    }

    info!("Generated {} of {} charts", written.len(), ChartKind::ALL.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OccurrenceRow;
    use tempfile::tempdir;

    fn options() -> ChartOptions {
        ChartOptions {
            fps: 1.0,
            heatmap_window_secs: 30,
            font_path: None,
        }
    }

    fn matrix(rows: &[(&str, &[u32])]) -> OccurrenceMatrix {
        OccurrenceMatrix::new(
            vec!["Coinbase".into(), "Tissot".into()],
            rows.iter()
                .enumerate()
                .map(|(pos, (frame, counts))| OccurrenceRow::new(*frame, pos, counts.to_vec()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_generates_all_charts() {
        let dir = tempdir().unwrap();
        let m = matrix(&[
            ("frame_0000_result", &[1, 0]),
            ("frame_0001_result", &[2, 1]),
            ("frame_0002_result", &[0, 0]),
        ]);
        let written = generate_charts(&m, dir.path(), &options()).unwrap();
        assert_eq!(written, ChartKind::ALL.to_vec());
        for kind in ChartKind::ALL {
            let bytes = std::fs::read(dir.path().join(kind.file_name())).unwrap();
            assert_eq!(&bytes[1..4], b"PNG");
        }
    }

    #[test]
    fn test_sentinel_only_gets_placeholder() {
        let dir = tempdir().unwrap();
        let m = OccurrenceMatrix::sentinel(vec!["Coinbase".into()]);
        let written = generate_charts(&m, dir.path(), &options()).unwrap();
        assert_eq!(written, vec![ChartKind::CoOccurrence]);
        assert!(!dir.path().join(ChartKind::MarketShare.file_name()).exists());
    }

    #[test]
    fn test_stale_chart_is_removed() {
        let dir = tempdir().unwrap();
        let stale = dir.path().join(ChartKind::MarketShare.file_name());
        std::fs::write(&stale, b"old").unwrap();

        let m = matrix(&[("frame_0000_result", &[0, 0])]);
        generate_charts(&m, dir.path(), &options()).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_charts_are_reproducible() {
        let dir = tempdir().unwrap();
        let m = matrix(&[("frame_0000_result", &[3, 1]), ("frame_0005_result", &[1, 0])]);

        generate_charts(&m, dir.path(), &options()).unwrap();
        let first = std::fs::read(dir.path().join(ChartKind::Heatmap.file_name())).unwrap();
        generate_charts(&m, dir.path(), &options()).unwrap();
        let second = std::fs::read(dir.path().join(ChartKind::Heatmap.file_name())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_configured_font_falls_back() {
        // Must not panic whether or not a system font exists
        let _ = load_font(Some(Path::new("/nonexistent/font.ttf")));
    }
}
