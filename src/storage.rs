//! On-disk layout of a run and persistence of its tables.
//!
//! Every artifact of a run lives under one directory keyed by
//! `(model, video id)`:
//!
//! ```text
//! {data_dir}/{model}/{video_id}/
//!   frames/frame_0000.jpg ...
//!   ocr_output/merged_texts.txt
//!   brand_analysis.csv
//!   brand_totals.csv
//!   brand_match_log.json
//!   plots/*.png
//!   pipeline.log
//!   brand_report.pdf
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::models::{MatchLog, MatrixError, OccurrenceMatrix, OccurrenceRow, TotalsRow};

pub const FRAMES_DIR: &str = "frames";
pub const OCR_DIR: &str = "ocr_output";
pub const PLOTS_DIR: &str = "plots";
pub const MERGED_TEXTS_FILE: &str = "merged_texts.txt";
pub const OCCURRENCE_FILE: &str = "brand_analysis.csv";
pub const TOTALS_FILE: &str = "brand_totals.csv";
pub const MATCH_LOG_FILE: &str = "brand_match_log.json";
pub const RUN_LOG_FILE: &str = "pipeline.log";
pub const REPORT_FILE: &str = "brand_report.pdf";

const FRAME_COLUMN: &str = "Frame";
const BRAND_COLUMN: &str = "Brand";
const TOTAL_COLUMN: &str = "Total Score";

/// Errors reading or writing run artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing artifact: {0}")]
    Missing(PathBuf),

    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {message}")]
    Schema { path: PathBuf, message: String },

    #[error("{path}: {source}")]
    Matrix {
        path: PathBuf,
        #[source]
        source: MatrixError,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    fn schema(path: &Path, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Replace characters that are unsafe in a path component.
pub fn sanitize_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches('.');
    if trimmed.is_empty() {
        "default".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Locations of every artifact belonging to one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    root: PathBuf,
}

impl RunContext {
    /// Run directory for a `(model, video id)` pair under `data_dir`.
    pub fn new(data_dir: &Path, model: &str, video_id: &str) -> Self {
        Self {
            root: data_dir
                .join(sanitize_component(model))
                .join(sanitize_component(video_id)),
        }
    }

    /// Use an existing directory as the run directory.
    pub fn for_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join(FRAMES_DIR)
    }

    pub fn ocr_dir(&self) -> PathBuf {
        self.root.join(OCR_DIR)
    }

    pub fn merged_texts(&self) -> PathBuf {
        self.ocr_dir().join(MERGED_TEXTS_FILE)
    }

    pub fn occurrence_table(&self) -> PathBuf {
        self.root.join(OCCURRENCE_FILE)
    }

    pub fn totals_table(&self) -> PathBuf {
        self.root.join(TOTALS_FILE)
    }

    pub fn match_log(&self) -> PathBuf {
        self.root.join(MATCH_LOG_FILE)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.root.join(PLOTS_DIR)
    }

    pub fn chart(&self, file_name: &str) -> PathBuf {
        self.plots_dir().join(file_name)
    }

    pub fn run_log(&self) -> PathBuf {
        self.root.join(RUN_LOG_FILE)
    }

    pub fn report(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    /// Whether the merged text artifact exists (acquisition and OCR can be skipped).
    pub fn has_cached_text(&self) -> bool {
        self.merged_texts().is_file()
    }

    /// Create the run directory structure. Idempotent.
    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        for dir in [self.root.clone(), self.frames_dir(), self.ocr_dir(), self.plots_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }
        Ok(())
    }
}

/// Append-only per-run log with a monotonically increasing step counter.
///
/// Each line reads `[YYYY-mm-dd HH:MM:SS] [step N] message` and is echoed
/// through `tracing`.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    step: u32,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            step: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written so far.
    pub fn steps(&self) -> u32 {
        self.step
    }

    /// Append one line, advancing the step counter.
    pub fn log(&mut self, message: &str) -> Result<(), StoreError> {
        self.step += 1;
        let line = format!(
            "[{}] [step {}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.step,
            message
        );
        info!("{}", line);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        writeln!(file, "{}", line).map_err(|e| StoreError::io(&self.path, e))
    }
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so readers never observe a partial artifact.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

fn require(path: &Path) -> Result<(), StoreError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StoreError::Missing(path.to_path_buf()))
    }
}

fn csv_bytes<F>(path: &Path, fill: F) -> Result<Vec<u8>, StoreError>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> Result<(), csv::Error>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    fill(&mut writer).map_err(|e| StoreError::csv(path, e))?;
    writer
        .into_inner()
        .map_err(|e| StoreError::io(path, e.into_error()))
}

/// Persist the occurrence matrix: `Frame` + one column per brand.
pub fn write_occurrence(path: &Path, matrix: &OccurrenceMatrix) -> Result<(), StoreError> {
    let bytes = csv_bytes(path, |w| {
        let mut header = vec![FRAME_COLUMN];
        header.extend(matrix.brands().iter().map(String::as_str));
        w.write_record(&header)?;
        for row in matrix.rows() {
            let mut record = vec![row.frame.clone()];
            record.extend(row.counts.iter().map(u32::to_string));
            w.write_record(&record)?;
        }
        Ok(())
    })?;
    write_atomic(path, &bytes)
}

/// Load and validate an occurrence matrix.
pub fn read_occurrence(path: &Path) -> Result<OccurrenceMatrix, StoreError> {
    require(path)?;
    let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| StoreError::csv(path, e))?
        .clone();

    if headers.get(0) != Some(FRAME_COLUMN) {
        return Err(StoreError::schema(
            path,
            format!("first column must be '{}'", FRAME_COLUMN),
        ));
    }
    let brands: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut rows = Vec::new();
    for (position, record) in reader.records().enumerate() {
        let record = record.map_err(|e| StoreError::csv(path, e))?;
        let frame = record.get(0).unwrap_or_default().to_string();
        let counts = record
            .iter()
            .skip(1)
            .map(|cell| {
                cell.trim().parse::<u32>().map_err(|_| {
                    StoreError::schema(path, format!("row {}: invalid count '{}'", frame, cell))
                })
            })
            .collect::<Result<Vec<u32>, StoreError>>()?;
        rows.push(OccurrenceRow::new(frame, position, counts));
    }

    OccurrenceMatrix::new(brands, rows).map_err(|source| StoreError::Matrix {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist per-brand totals: `Brand`, `Total Score`, in column order.
pub fn write_totals(path: &Path, totals: &[TotalsRow]) -> Result<(), StoreError> {
    let bytes = csv_bytes(path, |w| {
        w.write_record([BRAND_COLUMN, TOTAL_COLUMN])?;
        for row in totals {
            w.write_record([row.brand.as_str(), &row.total.to_string()])?;
        }
        Ok(())
    })?;
    write_atomic(path, &bytes)
}

/// Load and validate per-brand totals.
pub fn read_totals(path: &Path) -> Result<Vec<TotalsRow>, StoreError> {
    require(path)?;
    let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| StoreError::csv(path, e))?
        .clone();
    if headers.len() != 2
        || headers.get(0) != Some(BRAND_COLUMN)
        || headers.get(1) != Some(TOTAL_COLUMN)
    {
        return Err(StoreError::schema(
            path,
            format!("expected columns '{}', '{}'", BRAND_COLUMN, TOTAL_COLUMN),
        ));
    }

    let mut totals = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| StoreError::csv(path, e))?;
        let brand = record.get(0).unwrap_or_default().to_string();
        let cell = record.get(1).unwrap_or_default();
        let total = cell.trim().parse::<u64>().map_err(|_| {
            StoreError::schema(path, format!("brand {}: invalid total '{}'", brand, cell))
        })?;
        totals.push(TotalsRow { brand, total });
    }
    Ok(totals)
}

/// Persist the match log as pretty-printed JSON.
pub fn write_match_log(path: &Path, log: &MatchLog) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(log).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, json.as_bytes())
}

pub fn read_match_log(path: &Path) -> Result<MatchLog, StoreError> {
    require(path)?;
    let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
