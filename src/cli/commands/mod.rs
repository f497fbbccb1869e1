//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod brands;
mod check;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "brandscope")]
#[command(about = "Brand visibility analysis for broadcast video")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on a YouTube video and deliver the report
    Run {
        /// YouTube URL of the broadcast
        #[arg(short, long)]
        url: String,
        /// Brands to count (repeat or comma-separate)
        #[arg(short, long = "brand", required = true, value_delimiter = ',')]
        brands: Vec<String>,
        /// OCR model: "tesseract", "tesseract:<lang>" or a PaddleOCR model family
        #[arg(short, long, default_value = "tesseract")]
        model: String,
        /// Report recipient
        #[arg(short, long)]
        email: String,
        /// Clip timestamp shown in the report header
        #[arg(short, long)]
        timestamp: Option<String>,
        /// Copy the report into the outbox directory instead of sending it
        #[arg(long)]
        outbox: bool,
    },

    /// Re-run counting, charts and the report on an existing run directory
    Analyze {
        /// Run directory holding merged_texts.txt
        #[arg(long)]
        dir: PathBuf,
        /// Brands to count (repeat or comma-separate)
        #[arg(short, long = "brand", required = true, value_delimiter = ',')]
        brands: Vec<String>,
        /// Clip timestamp shown in the report header
        #[arg(short, long)]
        timestamp: Option<String>,
    },

    /// List the active brand keyword table
    Brands,

    /// Check external tools and delivery settings
    Check,
}

/// Parse arguments, load configuration and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data,
    };
    let (settings, config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Run {
            url,
            brands,
            model,
            email,
            timestamp,
            outbox,
        } => {
            let args = run::RunArgs {
                url,
                brands,
                model,
                email,
                timestamp,
                outbox,
            };
            run::cmd_run(&settings, &config, args).await
        }
        Commands::Analyze {
            dir,
            brands,
            timestamp,
        } => analyze::cmd_analyze(&settings, &config, &dir, &brands, timestamp).await,
        Commands::Brands => brands::cmd_brands(&config),
        Commands::Check => check::cmd_check(&settings),
    }
}
