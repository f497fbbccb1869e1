//! Stage orchestration for one brand-visibility request.
//!
//! Stages run strictly in order: acquire, count, statistics, visualize,
//! report, deliver. Acquisition is skipped when the run directory already
//! holds the merged OCR text. The first failing stage aborts the run and is
//! reported as a single [`PipelineOutcome::Error`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Settings;
use crate::models::BrandKeywordTable;
use crate::ocr::FrameTextStore;
use crate::storage::{write_match_log, write_occurrence, write_totals, RunContext, RunLog, StoreError};

use super::acquire::{AcquireRequest, FrameTextProducer};
use super::count::count_brands;
use super::delivery::{ReportDelivery, REPORT_SUBJECT};
use super::report::{compile_report, ReportOptions};
use super::stats::RunStatistics;
use super::visual::{generate_charts, ChartOptions};
use super::youtube;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Acquire,
    Count,
    Statistics,
    Visualize,
    Report,
    Deliver,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Acquire,
        Stage::Count,
        Stage::Statistics,
        Stage::Visualize,
        Stage::Report,
        Stage::Deliver,
    ];

    /// 1-based position in the run.
    pub fn number(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).map_or(0, |p| p + 1)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Count => "count",
            Stage::Statistics => "statistics",
            Stage::Visualize => "visualize",
            Stage::Report => "report",
            Stage::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before any stage ran.
    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },
}

impl PipelineError {
    fn at(stage: Stage, err: impl fmt::Display) -> Self {
        Self::Stage {
            stage,
            message: err.to_string(),
        }
    }

    /// The failing stage, if any stage ran.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Invalid(_) => None,
            PipelineError::Stage { stage, .. } => Some(*stage),
        }
    }
}

/// Structured result handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineOutcome {
    Success { report: PathBuf },
    Error { message: String },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }
}

impl From<Result<PathBuf, PipelineError>> for PipelineOutcome {
    fn from(result: Result<PathBuf, PipelineError>) -> Self {
        match result {
            Ok(report) => PipelineOutcome::Success { report },
            Err(e) => PipelineOutcome::Error {
                message: e.to_string(),
            },
        }
    }
}

/// One brand-visibility request.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// YouTube URL of the broadcast.
    pub source_url: String,
    /// Requested brands; names missing from the keyword table are dropped.
    pub brands: Vec<String>,
    /// OCR model selector, forwarded to the acquisition collaborator.
    pub model: String,
    /// Report recipient.
    pub email: String,
    /// Optional clip timestamp shown in the report header.
    pub timestamp: Option<String>,
}

/// Progress events, for front ends that render them.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageStarted { stage: Stage },
    /// Acquisition skipped: the merged text already exists.
    CacheHit { path: PathBuf },
    StageCompleted { stage: Stage, detail: String },
    StageFailed { stage: Stage, error: String },
}

/// Runs requests against injected collaborators.
pub struct Pipeline {
    settings: Settings,
    table: BrandKeywordTable,
    producer: Arc<dyn FrameTextProducer>,
    delivery: Arc<dyn ReportDelivery>,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

/// A run that passed validation.
struct Validated {
    run: RunContext,
    table: BrandKeywordTable,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        table: BrandKeywordTable,
        producer: Arc<dyn FrameTextProducer>,
        delivery: Arc<dyn ReportDelivery>,
    ) -> Self {
        Self {
            settings,
            table,
            producer,
            delivery,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(event).await;
        }
    }

    /// Run a request to completion and fold the result into an outcome.
    pub async fn run(&self, request: &PipelineRequest) -> PipelineOutcome {
        self.execute(request).await.into()
    }

    fn validate(&self, request: &PipelineRequest) -> Result<Validated, PipelineError> {
        let video_id = youtube::video_id(&request.source_url).ok_or_else(|| {
            PipelineError::Invalid(format!(
                "unable to extract a video id from '{}'",
                request.source_url
            ))
        })?;
        let table = self.select_brands(&request.brands)?;
        if request.model.trim().is_empty() {
            return Err(PipelineError::Invalid("model selector is empty".to_string()));
        }
        request
            .email
            .parse::<lettre::Address>()
            .map_err(|e| PipelineError::Invalid(format!("bad email '{}': {}", request.email, e)))?;

        Ok(Validated {
            run: RunContext::new(&self.settings.data_dir, &request.model, &video_id),
            table,
        })
    }

    fn select_brands(&self, brands: &[String]) -> Result<BrandKeywordTable, PipelineError> {
        let table = self.table.select(brands);
        if table.is_empty() {
            return Err(PipelineError::Invalid(format!(
                "none of the requested brands are known: {}",
                brands.join(", ")
            )));
        }
        Ok(table)
    }

    /// Full pipeline: validation, then every stage.
    pub async fn execute(&self, request: &PipelineRequest) -> Result<PathBuf, PipelineError> {
        let Validated { run, table } = self.validate(request)?;
        run.ensure_dirs().map_err(|e| PipelineError::at(Stage::Acquire, e))?;
        let mut log = RunLog::new(run.run_log());
        note(&mut log, "Task received. Checking cache...");

        let result = self.stages(request, &run, &table, &mut log).await;
        match &result {
            Ok(_) => note(&mut log, "Pipeline completed successfully."),
            Err(e) => note(&mut log, &format!("Pipeline failed: {}", e)),
        }
        result
    }

    async fn stages(
        &self,
        request: &PipelineRequest,
        run: &RunContext,
        table: &BrandKeywordTable,
        log: &mut RunLog,
    ) -> Result<PathBuf, PipelineError> {
        if run.has_cached_text() {
            note(log, "Cached OCR results found. Skipping download and OCR.");
            self.emit(PipelineEvent::CacheHit {
                path: run.merged_texts(),
            })
            .await;
        } else {
            let stage = Stage::Acquire;
            self.start(stage, log, &format!("Downloading and extracting frames from URL: {}", request.source_url))
                .await;
            let summary = self
                .producer
                .produce(&AcquireRequest {
                    source_url: &request.source_url,
                    model: &request.model,
                    sampling_fps: self.settings.sampling_fps,
                    run,
                })
                .await
                .map_err(|e| PipelineError::at(stage, e));
            let summary = self.checked(stage, summary).await?;
            if !run.has_cached_text() {
                let missing = PipelineError::at(stage, StoreError::Missing(run.merged_texts()));
                return self.checked(stage, Err(missing)).await;
            }
            self.done(
                stage,
                format!("{} frames sampled, {} recognized", summary.frames, summary.recognized),
            )
            .await;
        }

        let report = self.analyze(run, table, request.timestamp.clone(), log).await?;

        let stage = Stage::Deliver;
        self.start(stage, log, "Sending report via email...").await;
        let delivered = self
            .delivery
            .deliver(&request.email, &report, REPORT_SUBJECT)
            .await
            .map_err(|e| PipelineError::at(stage, e));
        self.checked(stage, delivered).await?;
        self.done(stage, format!("sent to {}", request.email)).await;

        Ok(report)
    }

    /// Count, statistics, charts and report for an existing run directory.
    ///
    /// Nothing is acquired or delivered; the merged OCR text must exist.
    pub async fn analyze_dir(
        &self,
        run: &RunContext,
        brands: &[String],
        timestamp: Option<String>,
    ) -> Result<PathBuf, PipelineError> {
        let table = self.select_brands(brands)?;
        if !run.has_cached_text() {
            return Err(PipelineError::Invalid(format!(
                "no OCR text at {}",
                run.merged_texts().display()
            )));
        }
        run.ensure_dirs().map_err(|e| PipelineError::at(Stage::Count, e))?;
        let mut log = RunLog::new(run.run_log());
        note(&mut log, "Re-analysis of existing OCR results requested.");
        let result = self.analyze(run, &table, timestamp, &mut log).await;
        if let Err(e) = &result {
            note(&mut log, &format!("Analysis failed: {}", e));
        }
        result
    }

    async fn analyze(
        &self,
        run: &RunContext,
        table: &BrandKeywordTable,
        timestamp: Option<String>,
        log: &mut RunLog,
    ) -> Result<PathBuf, PipelineError> {
        let fps = self.settings.sampling_fps;

        let stage = Stage::Count;
        self.start(stage, log, "Counting brand keywords...").await;
        let counted = FrameTextStore::load(&run.merged_texts())
            .map_err(|e| PipelineError::at(stage, format!("{}: {}", run.merged_texts().display(), e)))
            .and_then(|store| {
                count_brands(&store, table, self.settings.match_threshold)
                    .map_err(|e| PipelineError::at(stage, e))
            });
        let count = self.checked(stage, counted).await?;
        self.done(
            stage,
            format!("{} frames x {} brands", count.matrix.rows().len(), count.matrix.brands().len()),
        )
        .await;

        let stage = Stage::Statistics;
        self.start(stage, log, "Computing statistics and saving tables...").await;
        let persisted = write_occurrence(&run.occurrence_table(), &count.matrix)
            .and_then(|_| write_totals(&run.totals_table(), &count.matrix.totals()))
            .and_then(|_| write_match_log(&run.match_log(), &count.match_log))
            .map_err(|e| PipelineError::at(stage, e));
        self.checked(stage, persisted).await?;
        let stats = RunStatistics::compute(&count.matrix, fps);
        let detail = match stats.top() {
            Some(top) if top.total > 0 => format!("top brand {} ({})", top.brand, top.total),
            _ => "no detections".to_string(),
        };
        self.done(stage, detail).await;

        let stage = Stage::Visualize;
        self.start(stage, log, "Generating visualizations...").await;
        let options = ChartOptions {
            fps,
            heatmap_window_secs: self.settings.heatmap_window_secs,
            font_path: self.settings.chart_font.clone(),
        };
        let matrix = count.matrix;
        let plots_dir = run.plots_dir();
        let charts = tokio::task::spawn_blocking(move || generate_charts(&matrix, &plots_dir, &options))
            .await
            .map_err(|e| PipelineError::at(stage, e))
            .and_then(|r| r.map_err(|e| PipelineError::at(stage, e)));
        let charts = self.checked(stage, charts).await?;
        self.done(stage, format!("{} charts", charts.len())).await;

        let stage = Stage::Report;
        self.start(stage, log, "Generating PDF report...").await;
        let options = ReportOptions {
            title: self.settings.report_title.clone(),
            fps,
            match_threshold: self.settings.match_threshold,
            timestamp,
            generated_on: Local::now().date_naive(),
        };
        let report_run = run.clone();
        let report = tokio::task::spawn_blocking(move || compile_report(&report_run, &options))
            .await
            .map_err(|e| PipelineError::at(stage, e))
            .and_then(|r| r.map_err(|e| PipelineError::at(stage, e)));
        let report = self.checked(stage, report).await?;
        self.done(stage, report.display().to_string()).await;

        Ok(report)
    }

    async fn start(&self, stage: Stage, log: &mut RunLog, message: &str) {
        note(log, &format!("[{}/{}] {}", stage.number(), Stage::ALL.len(), message));
        self.emit(PipelineEvent::StageStarted { stage }).await;
    }

    async fn done(&self, stage: Stage, detail: String) {
        info!("{} stage done: {}", stage, detail);
        self.emit(PipelineEvent::StageCompleted { stage, detail }).await;
    }

    /// Pass a stage result through, announcing failures.
    async fn checked<T>(&self, stage: Stage, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        if let Err(e) = &result {
            self.emit(PipelineEvent::StageFailed {
                stage,
                error: e.to_string(),
            })
            .await;
        }
        result
    }
}

/// Write a run-log line; a failing log never fails the run.
fn note(log: &mut RunLog, message: &str) {
    if let Err(e) = log.log(message) {
        warn!("Could not write run log {}: {}", log.path().display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json_shape() {
        let ok = PipelineOutcome::Success {
            report: PathBuf::from("/runs/x/brand_report.pdf"),
        };
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"status":"success","report":"/runs/x/brand_report.pdf"}"#
        );

        let err: PipelineOutcome = Err(PipelineError::at(Stage::Count, "bad table")).into();
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"status":"error","message":"count stage failed: bad table"}"#
        );
        assert!(!err.is_success());
    }

    #[test]
    fn test_stage_numbers() {
        assert_eq!(Stage::Acquire.number(), 1);
        assert_eq!(Stage::Deliver.number(), 6);
        assert_eq!(Stage::Visualize.to_string(), "visualize");
    }

    #[test]
    fn test_error_stage() {
        assert_eq!(PipelineError::Invalid("x".into()).stage(), None);
        assert_eq!(PipelineError::at(Stage::Report, "x").stage(), Some(Stage::Report));
    }
}
