//! Environment check.

use console::style;

use crate::config::Settings;
use crate::ocr::check_binary;

/// External tools the stock acquisition path shells out to.
const TOOLS: [(&str, &str); 4] = [
    ("yt-dlp", "video download"),
    ("ffmpeg", "frame sampling"),
    ("tesseract", "OCR (tesseract models)"),
    ("paddleocr", "OCR (PaddleOCR models)"),
];

/// Report tool availability and where output goes.
pub fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let mut missing = 0;
    for (tool, purpose) in TOOLS {
        if check_binary(tool) {
            println!("{} {} ({})", style("✓").green(), tool, purpose);
        } else {
            missing += 1;
            println!("{} {} not found ({})", style("✗").red(), tool, purpose);
        }
    }

    println!(
        "{} Data directory: {}",
        style("→").cyan(),
        settings.data_dir.display()
    );
    match &settings.smtp {
        Some(smtp) => println!(
            "{} SMTP: {}:{} as {}",
            style("→").cyan(),
            smtp.host,
            smtp.port,
            smtp.from
        ),
        None => println!(
            "{} SMTP not configured; reports go to {}",
            style("!").yellow(),
            settings.outbox_dir.display()
        ),
    }

    if missing > 0 {
        println!(
            "{} {} tool(s) missing; only one OCR engine is needed",
            style("!").yellow(),
            missing
        );
    }
    Ok(())
}
