//! brandscope - brand visibility analysis for broadcast video.
//!
//! Samples frames from a YouTube broadcast, recognizes on-screen text,
//! fuzzy-counts brand keywords per frame and turns the counts into
//! statistics, charts and a paginated PDF report that is then delivered.

pub mod cli;
pub mod config;
pub mod models;
pub mod ocr;
pub mod services;
pub mod storage;
