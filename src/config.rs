//! Configuration management for brandscope using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{BrandEntry, BrandKeywordTable, BrandTableError};

/// Frames sampled per second of video.
pub const DEFAULT_SAMPLING_FPS: f64 = 1.0;

/// Minimum similarity (0-100) for a token to count as a brand match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 80.0;

/// Width of one heat map time window in seconds.
pub const DEFAULT_HEATMAP_WINDOW_SECS: u32 = 30;

/// Frames sent to OCR per run (0 = unlimited).
pub const DEFAULT_MAX_FRAMES: usize = 50;

pub const DEFAULT_SMTP_PORT: u16 = 587;

pub const DEFAULT_REPORT_TITLE: &str = "BROADCAST BRAND VISIBILITY REPORT";

/// Default outbox subdirectory name.
const OUTBOX_SUBDIR: &str = "outbox";

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid brand table: {0}")]
    Brands(#[from] BrandTableError),
}

/// Resolved SMTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory; run directories live below it.
    pub data_dir: PathBuf,
    /// Directory reports are copied to when SMTP is not configured.
    pub outbox_dir: PathBuf,
    pub sampling_fps: f64,
    pub match_threshold: f64,
    pub heatmap_window_secs: u32,
    /// Frames sent to OCR per run (0 = unlimited).
    pub max_frames: usize,
    /// TrueType font used for chart labels.
    pub chart_font: Option<PathBuf>,
    /// Title printed in the report header band.
    pub report_title: String,
    /// SMTP transport, if configured.
    pub smtp: Option<SmtpSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/brandscope/ for user data
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brandscope");

        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            outbox_dir: data_dir.join(OUTBOX_SUBDIR),
            data_dir,
            sampling_fps: DEFAULT_SAMPLING_FPS,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            heatmap_window_secs: DEFAULT_HEATMAP_WINDOW_SECS,
            max_frames: DEFAULT_MAX_FRAMES,
            chart_font: None,
            report_title: DEFAULT_REPORT_TITLE.to_string(),
            smtp: None,
        }
    }

    /// Check values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sampling_fps.is_finite() && self.sampling_fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sampling_fps must be positive, got {}",
                self.sampling_fps
            )));
        }
        if !(0.0..=100.0).contains(&self.match_threshold) {
            return Err(ConfigError::Invalid(format!(
                "match_threshold must be within 0-100, got {}",
                self.match_threshold
            )));
        }
        if self.heatmap_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "heatmap_window_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// SMTP section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

impl SmtpConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Apply SMTP_* environment variables on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(host) = env_var("SMTP_HOST") {
            self.host = Some(host);
        }
        if let Some(port) = env_var("SMTP_PORT").and_then(|p| p.parse().ok()) {
            self.port = Some(port);
        }
        if let Some(user) = env_var("SMTP_USER") {
            self.username = Some(user);
        }
        if let Some(password) = env_var("SMTP_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(from) = env_var("SMTP_FROM") {
            self.from = Some(from);
        }
        self
    }

    /// Resolve into transport settings. `None` when no host is set.
    pub fn resolve(&self) -> Option<SmtpSettings> {
        let host = self.host.clone()?;
        let from = self
            .from
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| format!("brandscope@{}", host));
        Some(SmtpSettings {
            port: self.port.unwrap_or(DEFAULT_SMTP_PORT),
            username: self.username.clone(),
            password: self.password.clone(),
            from,
            host,
        })
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Outbox directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_window_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frames: Option<usize>,
    /// Path to a TTF font for chart labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_title: Option<String>,
    /// Brand keyword table. Replaces the built-in table when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brands: Vec<BrandEntry>,
    #[serde(default, skip_serializing_if = "SmtpConfig::is_default")]
    pub smtp: SmtpConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers brandscope config files in standard locations.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load("brandscope").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}; using defaults", e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => {
                // No config file found, use defaults with env overrides
                Self::default_with_env()
            }
        }
    }

    /// Create a default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self {
            smtp: SmtpConfig::default().with_env_overrides(),
            ..Self::default()
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        config.smtp = config.smtp.with_env_overrides();
        Ok(config)
    }

    /// Parse config text, picking the format from the file extension.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            _ => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.outbox_dir = settings.data_dir.join(OUTBOX_SUBDIR);
        }
        if let Some(ref outbox) = self.outbox_dir {
            settings.outbox_dir = self.resolve_path(outbox, base_dir);
        }
        if let Some(fps) = self.sampling_fps {
            settings.sampling_fps = fps;
        }
        if let Some(threshold) = self.match_threshold {
            settings.match_threshold = threshold;
        }
        if let Some(window) = self.heatmap_window_secs {
            settings.heatmap_window_secs = window;
        }
        if let Some(max_frames) = self.max_frames {
            settings.max_frames = max_frames;
        }
        if let Some(ref font) = self.chart_font {
            settings.chart_font = Some(self.resolve_path(font, base_dir));
        }
        if let Some(ref title) = self.report_title {
            settings.report_title = title.clone();
        }
        settings.smtp = self.smtp.resolve();
    }

    /// The active brand keyword table.
    pub fn brand_table(&self) -> Result<BrandKeywordTable, BrandTableError> {
        if self.brands.is_empty() {
            Ok(BrandKeywordTable::broadcast_default())
        } else {
            BrandKeywordTable::new(self.brands.clone())
        }
    }
}

/// Options controlling where configuration comes from.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file (bypasses discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory override.
    pub data_dir: Option<PathBuf>,
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    // Priority 1: Explicit --config flag, Priority 2: auto-discover via prefer
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    // --data override takes precedence for data_dir
    if let Some(data_dir) = options.data_dir {
        if config.outbox_dir.is_none() {
            settings.outbox_dir = data_dir.join(OUTBOX_SUBDIR);
        }
        settings.data_dir = data_dir;
    }

    settings.validate()?;
    // Fail early on a malformed brand table rather than at the first run.
    config.brand_table()?;

    tracing::debug!("Using data directory: {}", settings.data_dir.display());
    Ok((settings, config))
}
