//! End-to-end runs of the pipeline against in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;

use brandscope::config::Settings;
use brandscope::models::{BrandKeywordTable, SENTINEL_FRAME};
use brandscope::ocr::render_merged_texts;
use brandscope::services::{
    AcquireError, AcquireRequest, AcquireSummary, DeliveryError, FrameTextProducer, Pipeline,
    PipelineEvent, PipelineOutcome, PipelineRequest, ReportDelivery, RunStatistics, Stage,
    REPORT_SUBJECT,
};
use brandscope::storage::{read_match_log, read_occurrence, read_totals, RunContext};

const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
const VIDEO_ID: &str = "dQw4w9WgXcQ";
const MODEL: &str = "tesseract";

/// Writes a fixed merged text artifact plus one image per frame.
struct FakeProducer {
    frames: Vec<(String, Vec<String>)>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeProducer {
    fn new(frames: &[&[&str]]) -> Self {
        Self {
            frames: frames
                .iter()
                .enumerate()
                .map(|(i, lines)| {
                    (
                        format!("frame_{:04}_result", i),
                        lines.iter().map(|l| l.to_string()).collect(),
                    )
                })
                .collect(),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            frames: Vec::new(),
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameTextProducer for FakeProducer {
    async fn produce(&self, request: &AcquireRequest<'_>) -> Result<AcquireSummary, AcquireError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AcquireError::Download("video unavailable".to_string()));
        }

        let frames_dir = request.run.frames_dir();
        std::fs::create_dir_all(&frames_dir).unwrap();
        for (i, _) in self.frames.iter().enumerate() {
            let image = RgbImage::from_pixel(64, 36, Rgb([20, 90, 160]));
            image.save(frames_dir.join(format!("frame_{:04}.png", i))).unwrap();
        }

        let merged = render_merged_texts(
            self.frames
                .iter()
                .map(|(label, lines)| (label.as_str(), lines.as_slice())),
        );
        std::fs::write(request.run.merged_texts(), merged).unwrap();

        Ok(AcquireSummary {
            frames: self.frames.len(),
            recognized: self.frames.len(),
        })
    }
}

/// Records every delivery instead of sending it.
#[derive(Default)]
struct RecordingDelivery {
    sent: Mutex<Vec<(String, PathBuf, String)>>,
}

impl RecordingDelivery {
    fn sent(&self) -> Vec<(String, PathBuf, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportDelivery for RecordingDelivery {
    async fn deliver(&self, recipient: &str, report: &Path, subject: &str) -> Result<(), DeliveryError> {
        if !report.is_file() {
            return Err(DeliveryError::MissingReport(report.to_path_buf()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), report.to_path_buf(), subject.to_string()));
        Ok(())
    }
}

struct Harness {
    dir: TempDir,
    producer: Arc<FakeProducer>,
    delivery: Arc<RecordingDelivery>,
    pipeline: Pipeline,
}

impl Harness {
    fn new(producer: FakeProducer) -> Self {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        let producer = Arc::new(producer);
        let delivery = Arc::new(RecordingDelivery::default());
        let pipeline = Pipeline::new(
            settings,
            BrandKeywordTable::broadcast_default(),
            producer.clone(),
            delivery.clone(),
        );
        Self {
            dir,
            producer,
            delivery,
            pipeline,
        }
    }

    fn run_context(&self) -> RunContext {
        RunContext::new(self.dir.path(), MODEL, VIDEO_ID)
    }
}

fn request(brands: &[&str]) -> PipelineRequest {
    PipelineRequest {
        source_url: URL.to_string(),
        brands: brands.iter().map(|b| b.to_string()).collect(),
        model: MODEL.to_string(),
        email: "client@example.com".to_string(),
        timestamp: Some("Q3 08:12".to_string()),
    }
}

const BRANDS: [&str; 3] = ["Coinbase", "Tissot", "Michelob Ultra"];

#[tokio::test]
async fn test_end_to_end_counts_and_ranks() {
    let h = Harness::new(FakeProducer::new(&[
        &["Coinbase on court"],
        &["no text"],
        &["tissot ultra"],
    ]));

    let outcome = h.pipeline.run(&request(&BRANDS)).await;
    let run = h.run_context();
    assert_eq!(
        outcome,
        PipelineOutcome::Success {
            report: run.report()
        }
    );

    let matrix = read_occurrence(&run.occurrence_table()).unwrap();
    assert_eq!(matrix.rows().len(), 3);
    assert_eq!(matrix.brands(), ["Coinbase", "Tissot", "Michelob Ultra"]);

    let totals = read_totals(&run.totals_table()).unwrap();
    let values: Vec<u64> = totals.iter().map(|t| t.total).collect();
    assert_eq!(values, vec![1, 1, 1]);

    let stats = RunStatistics::compute(&matrix, 1.0);
    let ranked: Vec<(&str, usize)> = stats
        .ranked
        .iter()
        .map(|s| (s.brand.as_str(), s.rank))
        .collect();
    assert_eq!(
        ranked,
        vec![("Coinbase", 1), ("Tissot", 2), ("Michelob Ultra", 3)]
    );

    let log = read_match_log(&run.match_log()).unwrap();
    assert_eq!(log.words_for("frame_0000_result", "Coinbase"), vec!["coinbase"]);
    assert!(log.frame("frame_0001_result").is_empty());

    let pdf = std::fs::read(run.report()).unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let sent = h.delivery.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "client@example.com");
    assert_eq!(sent[0].1, run.report());
    assert_eq!(sent[0].2, REPORT_SUBJECT);

    let run_log = std::fs::read_to_string(run.run_log()).unwrap();
    assert!(run_log.contains("Pipeline completed successfully."));
}

#[tokio::test]
async fn test_rerun_uses_cache_and_is_idempotent() {
    let h = Harness::new(FakeProducer::new(&[
        &["Coinbase on court"],
        &["tissot ultra"],
    ]));
    let run = h.run_context();

    assert!(h.pipeline.run(&request(&BRANDS)).await.is_success());
    let occurrence = std::fs::read(run.occurrence_table()).unwrap();
    let totals = std::fs::read(run.totals_table()).unwrap();
    let matches = std::fs::read(run.match_log()).unwrap();

    assert!(h.pipeline.run(&request(&BRANDS)).await.is_success());
    assert_eq!(h.producer.calls(), 1);
    assert_eq!(std::fs::read(run.occurrence_table()).unwrap(), occurrence);
    assert_eq!(std::fs::read(run.totals_table()).unwrap(), totals);
    assert_eq!(std::fs::read(run.match_log()).unwrap(), matches);

    let run_log = std::fs::read_to_string(run.run_log()).unwrap();
    assert!(run_log.contains("Cached OCR results found. Skipping download and OCR."));
}

#[tokio::test]
async fn test_no_text_yields_sentinel_and_still_reports() {
    let h = Harness::new(FakeProducer::new(&[&[], &[]]));

    let outcome = h.pipeline.run(&request(&BRANDS)).await;
    assert!(outcome.is_success());

    let run = h.run_context();
    let matrix = read_occurrence(&run.occurrence_table()).unwrap();
    assert!(matrix.is_sentinel());
    assert_eq!(matrix.rows()[0].frame, SENTINEL_FRAME);

    let totals = read_totals(&run.totals_table()).unwrap();
    assert_eq!(totals.iter().map(|t| t.total).sum::<u64>(), 0);
    assert!(read_match_log(&run.match_log()).unwrap().is_empty());
    assert!(run.report().is_file());
}

#[tokio::test]
async fn test_co_occurrence_frame() {
    let h = Harness::new(FakeProducer::new(&[
        &["coinbase", "tissot"],
        &["coinbase"],
    ]));

    assert!(h.pipeline.run(&request(&BRANDS)).await.is_success());

    let matrix = read_occurrence(&h.run_context().occurrence_table()).unwrap();
    let active: Vec<usize> = matrix.rows().iter().map(|r| r.active_brands()).collect();
    assert_eq!(active, vec![2, 1]);

    let stats = RunStatistics::compute(&matrix, 1.0);
    assert_eq!(stats.co_occurrence_frames, 1);
}

#[tokio::test]
async fn test_invalid_requests_fail_before_any_stage() {
    let h = Harness::new(FakeProducer::new(&[&["coinbase"]]));

    let mut bad_url = request(&BRANDS);
    bad_url.source_url = "https://example.com/video".to_string();
    let mut no_brands = request(&["Acme"]);
    no_brands.brands.push("Globex".to_string());
    let mut bad_email = request(&BRANDS);
    bad_email.email = "not an address".to_string();

    for req in [bad_url, no_brands, bad_email] {
        match h.pipeline.run(&req).await {
            PipelineOutcome::Error { message } => {
                assert!(message.starts_with("Invalid request"), "{}", message)
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    assert_eq!(h.producer.calls(), 0);
    assert!(h.delivery.sent().is_empty());
    assert!(!h.run_context().root().exists());
}

#[tokio::test]
async fn test_acquisition_failure_aborts_run() {
    let h = Harness::new(FakeProducer::failing());
    let (tx, mut rx) = mpsc::channel(32);
    let Harness {
        dir,
        producer,
        delivery,
        pipeline,
    } = h;
    let pipeline = pipeline.with_events(tx);

    let outcome = pipeline.run(&request(&BRANDS)).await;
    drop(pipeline);

    match &outcome {
        PipelineOutcome::Error { message } => {
            assert!(message.contains("acquire stage failed"), "{}", message);
            assert!(message.contains("video unavailable"), "{}", message);
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(producer.calls(), 1);
    assert!(delivery.sent().is_empty());

    let mut failed = None;
    while let Some(event) = rx.recv().await {
        if let PipelineEvent::StageFailed { stage, .. } = event {
            failed = Some(stage);
        }
    }
    assert_eq!(failed, Some(Stage::Acquire));

    let run = RunContext::new(dir.path(), MODEL, VIDEO_ID);
    assert!(!run.occurrence_table().exists());
    let run_log = std::fs::read_to_string(run.run_log()).unwrap();
    assert!(run_log.contains("Pipeline failed:"));
}

#[tokio::test]
async fn test_events_follow_stage_order() {
    let h = Harness::new(FakeProducer::new(&[&["coinbase"]]));
    let (tx, mut rx) = mpsc::channel(64);
    let pipeline = h.pipeline.with_events(tx);

    assert!(pipeline.run(&request(&BRANDS)).await.is_success());
    drop(pipeline);

    let mut completed = Vec::new();
    while let Some(event) = rx.recv().await {
        if let PipelineEvent::StageCompleted { stage, .. } = event {
            completed.push(stage);
        }
    }
    assert_eq!(completed, Stage::ALL.to_vec());
}

#[tokio::test]
async fn test_analyze_existing_run_directory() {
    let h = Harness::new(FakeProducer::new(&[]));
    let run = RunContext::for_dir(h.dir.path().join("existing"));
    run.ensure_dirs().unwrap();
    std::fs::write(
        run.merged_texts(),
        "=== frame_0000_result ===\nGOOGLE\n\n=== frame_0001_result ===\nkia espn\n",
    )
    .unwrap();

    let report = h
        .pipeline
        .analyze_dir(&run, &["Google".to_string(), "Kia".to_string()], None)
        .await
        .unwrap();
    assert_eq!(report, run.report());

    let totals = read_totals(&run.totals_table()).unwrap();
    let values: Vec<(String, u64)> = totals.into_iter().map(|t| (t.brand, t.total)).collect();
    assert_eq!(
        values,
        vec![("Google".to_string(), 1), ("Kia".to_string(), 1)]
    );
    assert_eq!(h.producer.calls(), 0);
    assert!(h.delivery.sent().is_empty());
}

#[tokio::test]
async fn test_analyze_requires_merged_text() {
    let h = Harness::new(FakeProducer::new(&[]));
    let run = RunContext::for_dir(h.dir.path().join("empty"));
    let err = h
        .pipeline
        .analyze_dir(&run, &["Google".to_string()], None)
        .await
        .unwrap_err();
    assert!(err.stage().is_none());
}
