//! Full pipeline command.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::cli::helpers::{delivery_for, spawn_progress};
use crate::config::{Config, Settings};
use crate::services::{Pipeline, PipelineRequest, YoutubeOcrProducer};

pub struct RunArgs {
    pub url: String,
    pub brands: Vec<String>,
    pub model: String,
    pub email: String,
    pub timestamp: Option<String>,
    pub outbox: bool,
}

/// Run every stage and print the JSON outcome to stdout.
pub async fn cmd_run(settings: &Settings, config: &Config, args: RunArgs) -> anyhow::Result<()> {
    let table = config.brand_table()?;
    let producer = Arc::new(YoutubeOcrProducer::new(settings.max_frames));
    let delivery = delivery_for(settings, args.outbox);

    let (event_tx, event_rx) = mpsc::channel(32);
    let progress = spawn_progress(event_rx);

    let pipeline = Pipeline::new(settings.clone(), table, producer, delivery).with_events(event_tx);
    let request = PipelineRequest {
        source_url: args.url,
        brands: args.brands,
        model: args.model,
        email: args.email,
        timestamp: args.timestamp,
    };
    let outcome = pipeline.run(&request).await;

    // Closing the channel lets the renderer finish
    drop(pipeline);
    let _ = progress.await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
