//! Shared helper functions for CLI commands.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::services::{OutboxDelivery, PipelineEvent, ReportDelivery, SmtpDelivery, Stage};

/// SMTP when configured, the outbox directory otherwise.
pub fn delivery_for(settings: &Settings, force_outbox: bool) -> Arc<dyn ReportDelivery> {
    match &settings.smtp {
        Some(smtp) if !force_outbox => Arc::new(SmtpDelivery::new(smtp.clone())),
        _ => Arc::new(OutboxDelivery::new(settings.outbox_dir.clone())),
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Acquire => "Downloading video and running OCR",
        Stage::Count => "Counting brand keywords",
        Stage::Statistics => "Computing statistics",
        Stage::Visualize => "Generating charts",
        Stage::Report => "Compiling PDF report",
        Stage::Deliver => "Delivering report",
    }
}

/// Render pipeline events on stderr until the sender is dropped.
pub fn spawn_progress(mut event_rx: mpsc::Receiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut spinner: Option<ProgressBar> = None;
        let total = Stage::ALL.len();

        while let Some(event) = event_rx.recv().await {
            match event {
                PipelineEvent::StageStarted { stage } => {
                    let pb = ProgressBar::new_spinner();
                    if let Ok(s) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                        pb.set_style(s);
                    }
                    pb.set_message(format!("[{}/{}] {}...", stage.number(), total, stage_label(stage)));
                    pb.enable_steady_tick(Duration::from_millis(100));
                    spinner = Some(pb);
                }
                PipelineEvent::CacheHit { path } => {
                    eprintln!(
                        "{} Using cached OCR text: {}",
                        style("→").cyan(),
                        path.display()
                    );
                }
                PipelineEvent::StageCompleted { stage, detail } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    eprintln!(
                        "{} [{}/{}] {}: {}",
                        style("✓").green(),
                        stage.number(),
                        total,
                        stage_label(stage),
                        detail
                    );
                }
                PipelineEvent::StageFailed { stage, error } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    eprintln!(
                        "{} [{}/{}] {} failed: {}",
                        style("✗").red(),
                        stage.number(),
                        total,
                        stage_label(stage),
                        error
                    );
                }
            }
        }

        if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
    })
}
