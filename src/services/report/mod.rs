//! PDF report compilation.
//!
//! The report is built from the persisted run artifacts only: the occurrence
//! table, the totals table and the match log are required, chart and frame
//! images are included when present.

pub mod layout;
pub mod pdf;
pub mod text;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{find_frame_image, MatchLog};
use crate::storage::{read_match_log, read_occurrence, read_totals, write_atomic, RunContext, StoreError};

use super::stats::{BrandStat, FrameExtreme, RunStatistics};
use super::visual::ChartKind;

use self::layout::{
    Layout, CONTENT_BOTTOM, CONTENT_TOP, CONTENT_WIDTH, HEADER_HEIGHT, MARGIN, PAGE_HEIGHT, PAGE_WIDTH,
};
use self::pdf::{Align, Cell, Color, PdfError, PdfWriter};
use self::text::{wrap, FontStyle};

const PRIMARY: Color = (41, 128, 185);
const SECONDARY: Color = (52, 73, 94);
const ACCENT: Color = (231, 76, 60);
const LIGHT_GRAY: Color = (236, 240, 241);
const WHITE: Color = (255, 255, 255);
const TEXT_DARK: Color = (44, 62, 80);
const TEXT_LIGHT: Color = (127, 140, 141);
const SUBTITLE: Color = (200, 200, 200);

/// Largest side of a frame image embedded in the report, in pixels.
const MAX_FRAME_PIXELS: u32 = 1280;
/// Detected words listed per frame before summarising the rest.
const SNIPPETS_PER_FRAME: usize = 2;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Totals table does not match the occurrence table: {0}")]
    Inconsistent(String),

    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] PdfError),
}

/// Presentation parameters of a report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    /// Frame sampling rate, for frame index -> time.
    pub fps: f64,
    pub match_threshold: f64,
    /// Clip timestamp shown in the header, if any.
    pub timestamp: Option<String>,
    pub generated_on: NaiveDate,
}

/// Compile the run's report and write it to `run.report()`.
pub fn compile_report(run: &RunContext, options: &ReportOptions) -> Result<PathBuf, ReportError> {
    let matrix = read_occurrence(&run.occurrence_table())?;
    let totals = read_totals(&run.totals_table())?;
    let match_log = read_match_log(&run.match_log())?;

    if totals != matrix.totals() {
        return Err(ReportError::Inconsistent(format!(
            "{} totals rows for {} brand columns",
            totals.len(),
            matrix.brands().len()
        )));
    }

    let stats = RunStatistics::compute(&matrix, options.fps);
    let charts: Vec<(ChartKind, PathBuf)> = ChartKind::ALL
        .iter()
        .map(|kind| (*kind, run.chart(kind.file_name())))
        .filter(|(_, path)| path.is_file())
        .collect();
    debug!("{} chart images available", charts.len());

    let mut report = ReportBuilder::new(options);
    report.executive_summary(&stats);
    report.key_metrics(&stats);
    report.methodology();
    report.results_table(&stats);
    report.insights(&stats);
    for (kind, path) in &charts {
        report.chart_page(*kind, path);
    }
    let frames_dir = run.frames_dir();
    for stat in stats.detected() {
        report.brand_page(stat, &match_log, &frames_dir);
    }

    let pages = report.pdf.page_count();
    let bytes = report.pdf.finish()?;
    let path = run.report();
    write_atomic(&path, &bytes)?;
    info!("Report written to {} ({} pages)", path.display(), pages);
    Ok(path)
}

/// Seconds with at most two decimals, as shown in the report.
fn secs_label(secs: f64) -> String {
    format!("{}", (secs * 100.0).round() / 100.0)
}

fn load_image(path: &Path, max_side: Option<u32>) -> Option<RgbImage> {
    match image::open(path) {
        Ok(img) => {
            let img = match max_side {
                Some(max) if img.width() > max || img.height() > max => img.thumbnail(max, max),
                _ => img,
            };
            Some(img.to_rgb8())
        }
        Err(e) => {
            warn!("Skipping image {}: {}", path.display(), e);
            None
        }
    }
}

struct ReportBuilder<'a> {
    pdf: PdfWriter,
    layout: Layout,
    options: &'a ReportOptions,
}

impl<'a> ReportBuilder<'a> {
    fn new(options: &'a ReportOptions) -> Self {
        let mut builder = Self {
            pdf: PdfWriter::new(),
            layout: Layout::new(),
            options,
        };
        builder.sync_pages();
        builder
    }

    /// Open pdf pages until they catch up with the layout cursor.
    fn sync_pages(&mut self) {
        while self.pdf.page_count() < self.layout.page() {
            self.pdf.add_page();
            self.page_decorations();
        }
    }

    fn page_decorations(&mut self) {
        let page = self.pdf.page_count();
        self.pdf.rect(0.0, 0.0, PAGE_WIDTH, HEADER_HEIGHT, Some(PRIMARY), None);
        self.pdf.cell(&Cell {
            x: MARGIN,
            y: 8.0,
            w: CONTENT_WIDTH,
            h: 10.0,
            text: &self.options.title,
            font: FontStyle::Bold,
            size: 16.0,
            color: WHITE,
            align: Align::Center,
            fill: None,
            border: None,
        });

        let mut subtitle = format!("Generated on {}", self.options.generated_on.format("%B %d, %Y"));
        if let Some(ts) = &self.options.timestamp {
            subtitle.push_str(&format!(" | Clip timestamp: {}", ts));
        }
        self.pdf.cell(&Cell {
            x: MARGIN,
            y: 18.0,
            w: CONTENT_WIDTH,
            h: 6.0,
            text: &subtitle,
            font: FontStyle::Regular,
            size: 10.0,
            color: SUBTITLE,
            align: Align::Center,
            fill: None,
            border: None,
        });

        self.pdf.cell(&Cell {
            x: MARGIN,
            y: PAGE_HEIGHT - 15.0,
            w: CONTENT_WIDTH,
            h: 10.0,
            text: &format!("Page {}", page),
            font: FontStyle::Italic,
            size: 8.0,
            color: TEXT_LIGHT,
            align: Align::Center,
            fill: None,
            border: None,
        });
    }

    /// Make room for `height`, opening a new page if needed. Returns true
    /// on a page break.
    fn reserve(&mut self, height: f64) -> bool {
        let broke = self.layout.reserve(height);
        self.sync_pages();
        broke
    }

    fn new_page(&mut self) {
        self.layout.break_page();
        self.sync_pages();
    }

    /// Full-width text cell at the cursor, advancing by its height.
    fn line(&mut self, text: &str, font: FontStyle, size: f64, h: f64, fill: Option<Color>) {
        self.line_at(MARGIN, CONTENT_WIDTH, text, font, size, h, fill);
    }

    /// Text cell at the cursor; breaks the page first when it does not fit.
    #[allow(clippy::too_many_arguments)]
    fn line_at(&mut self, x: f64, w: f64, text: &str, font: FontStyle, size: f64, h: f64, fill: Option<Color>) {
        self.reserve(h);
        let color = if fill.is_some_and(|c| c != LIGHT_GRAY) { WHITE } else { TEXT_DARK };
        self.pdf.cell(&Cell {
            x,
            y: self.layout.y(),
            w,
            h,
            text,
            font,
            size,
            color,
            align: Align::Left,
            fill,
            border: None,
        });
        self.layout.advance(h);
    }

    /// Wrapped text, one `line_height` per line.
    fn paragraph(&mut self, text: &str, x: f64, w: f64, size: f64, line_height: f64) {
        for line in wrap(text, FontStyle::Regular, size, w - 2.0) {
            self.line_at(x, w, &line, FontStyle::Regular, size, line_height, None);
        }
    }

    fn section_header(&mut self, title: &str, color: Color) {
        self.reserve(15.0);
        self.layout.skip(5.0);
        self.line(&format!("  {}", title), FontStyle::Bold, 12.0, 10.0, Some(color));
        self.layout.skip(3.0);
    }

    fn info_box(&mut self, title: &str, content: &str, color: Color) {
        let lines = wrap(content, FontStyle::Regular, 9.0, 178.0);
        let whole = 8.0 + lines.len() as f64 * 5.0 + 5.0;
        self.reserve(whole.min(CONTENT_BOTTOM - CONTENT_TOP));
        self.box_title(title, color);

        for line in lines {
            // The title bar repeats on every page the box spans
            if self.reserve(5.0) {
                self.box_title(title, color);
            }
            self.line_at(MARGIN + 5.0, 180.0, &line, FontStyle::Regular, 9.0, 5.0, None);
        }
        self.layout.skip(2.0);
    }

    fn box_title(&mut self, title: &str, color: Color) {
        self.reserve(8.0 + 5.0);
        let y = self.layout.y();
        self.pdf.rect(MARGIN, y, CONTENT_WIDTH, 8.0, Some(color), Some(SECONDARY));
        self.pdf.cell(&Cell {
            x: MARGIN,
            y,
            w: CONTENT_WIDTH,
            h: 8.0,
            text: &format!("  {}", title),
            font: FontStyle::Bold,
            size: 10.0,
            color: if color == LIGHT_GRAY { TEXT_DARK } else { WHITE },
            align: Align::Left,
            fill: None,
            border: None,
        });
        self.layout.advance(8.0);
    }

    fn table_header(&mut self, headers: &[&str], widths: &[f64]) {
        let mut x = MARGIN;
        let y = self.layout.y();
        for (header, w) in headers.iter().zip(widths) {
            self.pdf.cell(&Cell {
                x,
                y,
                w: *w,
                h: 8.0,
                text: header,
                font: FontStyle::Bold,
                size: 10.0,
                color: WHITE,
                align: Align::Center,
                fill: Some(SECONDARY),
                border: Some(SECONDARY),
            });
            x += w;
        }
        self.layout.advance(8.0);
    }

    /// Header row plus zebra-striped body; the header repeats after a page break.
    fn table(&mut self, headers: &[&str], rows: &[Vec<String>], widths: &[f64]) {
        let needed = 8.0 + rows.len() as f64 * 7.0 + 5.0;
        self.reserve(needed.min(CONTENT_BOTTOM - CONTENT_TOP));
        self.table_header(headers, widths);

        for (i, row) in rows.iter().enumerate() {
            if self.layout.reserve(7.0) {
                self.sync_pages();
                self.table_header(headers, widths);
            }
            let fill = if i % 2 == 0 { LIGHT_GRAY } else { WHITE };
            let y = self.layout.y();
            let mut x = MARGIN;
            for (j, (value, w)) in row.iter().zip(widths).enumerate() {
                self.pdf.cell(&Cell {
                    x,
                    y,
                    w: *w,
                    h: 7.0,
                    text: value,
                    font: FontStyle::Regular,
                    size: 9.0,
                    color: TEXT_DARK,
                    align: if j > 0 { Align::Right } else { Align::Left },
                    fill: Some(fill),
                    border: Some(SECONDARY),
                });
                x += w;
            }
            self.layout.advance(7.0);
        }
        self.layout.skip(5.0);
    }

    fn executive_summary(&mut self, stats: &RunStatistics) {
        self.section_header("EXECUTIVE SUMMARY", SECONDARY);
        let (brand, score) = stats
            .top()
            .map(|s| (s.brand.as_str(), s.total))
            .unwrap_or(("N/A", 0));
        let summary = format!(
            "This automated analysis covers broadcast footage.\nTop brand: {} (score: {}).",
            brand, score
        );
        self.paragraph(&summary, MARGIN, CONTENT_WIDTH, 11.0, 6.0);
        self.layout.skip(5.0);
    }

    fn key_metrics(&mut self, stats: &RunStatistics) {
        let top = stats
            .top()
            .map(|s| format!("{} (Score: {})", s.brand, s.total))
            .unwrap_or_else(|| "N/A".to_string());
        let metrics = format!(
            "Total Brands Analyzed: {}\nTop Performing Brand: {}\nAverage Visibility Score: {:.2}\nAnalysis Duration: {} seconds ({} frames at {} fps)",
            stats.ranked.len(),
            top,
            stats.mean_total,
            secs_label(stats.duration_secs),
            stats.frames_analysed,
            self.options.fps
        );
        self.info_box("KEY METRICS", &metrics, ACCENT);
    }

    fn methodology(&mut self) {
        let text = format!(
            "This report uses optical character recognition and fuzzy matching to analyze frame-level brand visibility in broadcast footage.\n\
             Frames are extracted at {} FPS and processed with OCR, then every recognized word is compared against known brand variants (similarity of at least {}%).",
            self.options.fps, self.options.match_threshold
        );
        self.info_box("METHODOLOGY", &text, LIGHT_GRAY);
    }

    fn results_table(&mut self, stats: &RunStatistics) {
        self.new_page();
        self.section_header("BRAND VISIBILITY RESULTS", SECONDARY);
        let rows: Vec<Vec<String>> = stats
            .ranked
            .iter()
            .map(|s| {
                vec![
                    s.brand.clone(),
                    s.total.to_string(),
                    format!("#{}", s.rank),
                    format!("{:.1}%", s.share),
                ]
            })
            .collect();
        let width = (CONTENT_WIDTH / 4.0).floor();
        self.table(&["Brand", "Total", "Rank", "Share %"], &rows, &[width; 4]);
    }

    fn insights(&mut self, stats: &RunStatistics) {
        let mut by_column: Vec<&BrandStat> = stats.ranked.iter().collect();
        by_column.sort_by_key(|s| s.column);

        let mut insights = Vec::new();
        for stat in &by_column {
            if let Some(peak) = &stat.peak {
                insights.push(format!(
                    "• {} reached peak visibility at {}s",
                    stat.brand,
                    secs_label(peak.time_secs)
                ));
            }
        }
        for stat in &by_column {
            if stat.appearance_rate > 0.0 {
                insights.push(format!(
                    "• {} appears in {:.1}% of analyzed frames",
                    stat.brand, stat.appearance_rate
                ));
            }
        }
        if stats.co_occurrence_frames > 0 {
            insights.push(format!(
                "• Multiple brands appear together in {:.1}% of frames",
                stats.co_occurrence_rate
            ));
        }

        let text = if insights.is_empty() {
            "No significant patterns detected in the current dataset.".to_string()
        } else {
            insights.join("\n")
        };
        self.section_header("KEY INSIGHTS", ACCENT);
        self.info_box("AUTOMATED INSIGHTS", &text, LIGHT_GRAY);
    }

    fn chart_page(&mut self, kind: ChartKind, path: &Path) {
        let Some(image) = load_image(path, None) else {
            return;
        };
        self.new_page();
        self.section_header(kind.title(), SECONDARY);
        self.paragraph(kind.description(), MARGIN, CONTENT_WIDTH, 10.0, 5.0);
        self.layout.skip(5.0);

        let max_w = 170.0;
        let max_h = 180.0_f64.min(CONTENT_BOTTOM - self.layout.y() - 20.0).max(20.0);
        let aspect = f64::from(image.height()) / f64::from(image.width().max(1));
        let (mut w, mut h) = (max_w, max_w * aspect);
        if h > max_h {
            h = max_h;
            w = h / aspect;
        }
        let x = (PAGE_WIDTH - w) / 2.0;
        self.pdf.image(image, x, self.layout.y(), w, h);
        self.layout.advance(h);
        self.layout.skip(10.0);
    }

    fn brand_page(&mut self, stat: &BrandStat, match_log: &MatchLog, frames_dir: &Path) {
        self.new_page();
        self.section_header(&format!("{} - DETAILED ANALYSIS", stat.brand.to_uppercase()), SECONDARY);

        let describe = |extreme: &Option<FrameExtreme>| match extreme {
            Some(e) => (
                format!("{} ({}s)", e.frame, secs_label(e.time_secs)),
                e.count.to_string(),
            ),
            None => ("N/A".to_string(), "0".to_string()),
        };
        let (peak_frame, peak_count) = describe(&stat.peak);
        let (low_frame, low_count) = describe(&stat.lowest);
        self.table(
            &["Metric", "Frame (Time)", "Detection Count"],
            &[
                vec!["Peak Frame".to_string(), peak_frame, peak_count],
                vec!["Lowest Frame".to_string(), low_frame, low_count],
            ],
            &[50.0, 90.0, 50.0],
        );

        for (label, extreme) in [("PEAK VISIBILITY", &stat.peak), ("LOWEST VISIBILITY", &stat.lowest)] {
            let Some(frame) = extreme else {
                continue;
            };
            if !self.layout.fits(100.0) {
                break;
            }
            self.layout.skip(3.0);
            self.line(
                &format!("  {} FRAME ANALYSIS", label),
                FontStyle::Bold,
                10.0,
                8.0,
                Some(LIGHT_GRAY),
            );
            self.layout.skip(2.0);

            let image = find_frame_image(&frame.frame, frames_dir)
                .and_then(|path| load_image(&path, Some(MAX_FRAME_PIXELS)));
            if let Some(image) = image {
                let h = 60.0_f64.min(CONTENT_BOTTOM - self.layout.y() - 30.0);
                let w = (h * 1.5).min(170.0);
                if h > 0.0 && self.layout.y() + h < CONTENT_BOTTOM - 10.0 {
                    self.pdf.image(image, 20.0, self.layout.y(), w, h);
                    self.layout.advance(h);
                    self.layout.skip(5.0);
                }
            }

            let words = match_log.words_for(&frame.frame, &stat.brand);
            if !words.is_empty() && self.layout.y() < CONTENT_BOTTOM - 20.0 {
                self.line("Detected Text:", FontStyle::Bold, 9.0, 5.0, None);
                for word in words.iter().take(SNIPPETS_PER_FRAME) {
                    let snippet: String = word.chars().take(80).collect();
                    self.reserve(4.0);
                    self.pdf.cell(&Cell {
                        x: MARGIN,
                        y: self.layout.y(),
                        w: 5.0,
                        h: 4.0,
                        text: "-",
                        font: FontStyle::Regular,
                        size: 8.0,
                        color: TEXT_DARK,
                        align: Align::Left,
                        fill: None,
                        border: None,
                    });
                    self.line_at(MARGIN + 5.0, CONTENT_WIDTH - 5.0, &snippet, FontStyle::Regular, 8.0, 4.0, None);
                }
                if words.len() > SNIPPETS_PER_FRAME {
                    self.line(
                        &format!("... and {} more", words.len() - SNIPPETS_PER_FRAME),
                        FontStyle::Italic,
                        8.0,
                        4.0,
                        None,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchRecord, OccurrenceMatrix, OccurrenceRow};
    use crate::storage::{write_match_log, write_occurrence, write_totals};
    use lopdf::Document;
    use tempfile::tempdir;

    fn options() -> ReportOptions {
        ReportOptions {
            title: "BROADCAST BRAND VISIBILITY REPORT".into(),
            fps: 1.0,
            match_threshold: 80.0,
            timestamp: Some("Q4 08:12".into()),
            generated_on: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        }
    }

    fn record(brand: &str, word: &str) -> MatchRecord {
        MatchRecord {
            brand: brand.into(),
            word: word.into(),
            matched_variant: word.into(),
            score: 100.0,
        }
    }

    fn seed(run: &RunContext, matrix: &OccurrenceMatrix, log: &MatchLog) {
        run.ensure_dirs().unwrap();
        write_occurrence(&run.occurrence_table(), matrix).unwrap();
        write_totals(&run.totals_table(), &matrix.totals()).unwrap();
        write_match_log(&run.match_log(), log).unwrap();
    }

    fn sample() -> (OccurrenceMatrix, MatchLog) {
        let matrix = OccurrenceMatrix::new(
            vec!["Coinbase".into(), "Tissot".into(), "Kia".into()],
            vec![
                OccurrenceRow::new("frame_0000_result", 0, vec![3, 0, 0]),
                OccurrenceRow::new("frame_0001_result", 1, vec![1, 1, 0]),
            ],
        )
        .unwrap();
        let mut log = MatchLog::new();
        for word in ["coinbase", "coinbas", "coinbase"] {
            log.push("frame_0000_result", record("Coinbase", word));
        }
        log.push("frame_0001_result", record("Coinbase", "coinbase"));
        log.push("frame_0001_result", record("Tissot", "tissot"));
        (matrix, log)
    }

    fn page_count(path: &Path) -> usize {
        Document::load(path).unwrap().get_pages().len()
    }

    #[test]
    fn test_report_without_charts() {
        let dir = tempdir().unwrap();
        let run = RunContext::for_dir(dir.path());
        let (matrix, log) = sample();
        seed(&run, &matrix, &log);

        let path = compile_report(&run, &options()).unwrap();
        assert_eq!(path, run.report());
        // summary, results, one detail page per detected brand
        assert_eq!(page_count(&path), 4);
    }

    #[test]
    fn test_report_includes_charts_and_frames() {
        let dir = tempdir().unwrap();
        let run = RunContext::for_dir(dir.path());
        let (matrix, log) = sample();
        seed(&run, &matrix, &log);

        let chart = RgbImage::from_pixel(40, 20, image::Rgb([10, 20, 30]));
        chart.save(run.chart(ChartKind::Timeline.file_name())).unwrap();
        chart.save(run.chart(ChartKind::Frequency.file_name())).unwrap();
        chart.save(run.frames_dir().join("frame_0000.png")).unwrap();

        let path = compile_report(&run, &options()).unwrap();
        assert_eq!(page_count(&path), 6);
    }

    #[test]
    fn test_unreadable_chart_is_skipped() {
        let dir = tempdir().unwrap();
        let run = RunContext::for_dir(dir.path());
        let (matrix, log) = sample();
        seed(&run, &matrix, &log);
        std::fs::write(run.chart(ChartKind::Peaks.file_name()), b"not a png").unwrap();

        let path = compile_report(&run, &options()).unwrap();
        assert_eq!(page_count(&path), 4);
    }

    #[test]
    fn test_sentinel_report_has_no_detail_pages() {
        let dir = tempdir().unwrap();
        let run = RunContext::for_dir(dir.path());
        let matrix = OccurrenceMatrix::sentinel(vec!["Coinbase".into(), "Kia".into()]);
        seed(&run, &matrix, &MatchLog::new());

        let path = compile_report(&run, &options()).unwrap();
        assert_eq!(page_count(&path), 2);
    }

    #[test]
    fn test_missing_tables_abort() {
        let dir = tempdir().unwrap();
        let run = RunContext::for_dir(dir.path());
        let (matrix, _) = sample();
        run.ensure_dirs().unwrap();
        write_occurrence(&run.occurrence_table(), &matrix).unwrap();
        write_totals(&run.totals_table(), &matrix.totals()).unwrap();

        let err = compile_report(&run, &options()).unwrap_err();
        assert!(matches!(err, ReportError::Store(StoreError::Missing(_))));
        assert!(!run.report().exists());
    }

    #[test]
    fn test_inconsistent_totals_abort() {
        let dir = tempdir().unwrap();
        let run = RunContext::for_dir(dir.path());
        let (matrix, log) = sample();
        seed(&run, &matrix, &log);
        write_totals(&run.totals_table(), &matrix.totals()[..1]).unwrap();

        let err = compile_report(&run, &options()).unwrap_err();
        assert!(matches!(err, ReportError::Inconsistent(_)));
    }

    #[test]
    fn test_long_insights_box_flows_across_pages() {
        let brands: Vec<String> = (0..40).map(|i| format!("Brand {:02}", i)).collect();
        let rows = vec![OccurrenceRow::new("frame_0000_result", 0, vec![1; 40])];
        let matrix = OccurrenceMatrix::new(brands, rows).unwrap();
        let stats = RunStatistics::compute(&matrix, 1.0);

        let options = options();
        let mut report = ReportBuilder::new(&options);
        report.insights(&stats);

        assert!(report.layout.y() <= CONTENT_BOTTOM, "cursor at {}", report.layout.y());
        assert!(report.layout.page() > 1);
        assert_eq!(report.pdf.page_count(), report.layout.page());
    }

    #[test]
    fn test_long_paragraph_breaks_pages() {
        let options = options();
        let mut report = ReportBuilder::new(&options);
        let text = vec!["A line of methodology text."; 80].join("\n");
        report.paragraph(&text, MARGIN, CONTENT_WIDTH, 10.0, 5.0);

        assert!(report.layout.y() <= CONTENT_BOTTOM);
        assert_eq!(report.layout.page(), 2);
    }

    #[test]
    fn test_pdf_errors_convert() {
        let err: ReportError = PdfError::Write(std::io::Error::other("disk full")).into();
        assert!(matches!(err, ReportError::Pdf(PdfError::Write(_))));
        assert_eq!(err.to_string(), "PDF encoding failed: Failed to serialise document: disk full");
    }

    #[test]
    fn test_secs_label() {
        assert_eq!(secs_label(12.0), "12");
        assert_eq!(secs_label(2.5), "2.5");
        assert_eq!(secs_label(1.0 / 3.0), "0.33");
    }
}
