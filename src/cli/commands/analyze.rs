//! Re-analysis of an existing run directory.

use std::path::Path;
use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;

use crate::cli::helpers::{delivery_for, spawn_progress};
use crate::config::{Config, Settings};
use crate::services::{Pipeline, YoutubeOcrProducer};
use crate::storage::RunContext;

/// Count, chart and report on `dir` without acquiring or delivering.
pub async fn cmd_analyze(
    settings: &Settings,
    config: &Config,
    dir: &Path,
    brands: &[String],
    timestamp: Option<String>,
) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Run directory not found: {}", dir.display());
    }

    let table = config.brand_table()?;
    let producer = Arc::new(YoutubeOcrProducer::new(settings.max_frames));
    let (event_tx, event_rx) = mpsc::channel(32);
    let progress = spawn_progress(event_rx);

    let pipeline = Pipeline::new(settings.clone(), table, producer, delivery_for(settings, true))
        .with_events(event_tx);
    let run = RunContext::for_dir(dir);
    let result = pipeline.analyze_dir(&run, brands, timestamp).await;
    drop(pipeline);
    let _ = progress.await;

    let report = result?;
    println!(
        "{} Report written to {}",
        style("✓").green(),
        report.display()
    );
    Ok(())
}
