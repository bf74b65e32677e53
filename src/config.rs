//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lakbay.toml` files. CLI flags and environment variables take
//! precedence over file values.

use crate::analysis::GapPolicy;
use crate::cli::Args;
use crate::dashboard::AnalyticsSettings;
use crate::models::Period;
use crate::store::DEFAULT_ROW_CAP;
use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".lakbay.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Row store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// CSV export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Row store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project URL of the hosted backend (without `/rest/v1`).
    #[serde(default)]
    pub url: String,

    /// Public (anon) API key.
    #[serde(default)]
    pub anon_key: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum rows fetched per query. Older rows beyond the cap are not
    /// aggregated.
    #[serde(default = "default_row_cap")]
    pub row_cap: usize,

    /// Read events from a JSON snapshot instead of the remote store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_seconds: default_timeout(),
            row_cap: default_row_cap(),
            snapshot: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_row_cap() -> usize {
    DEFAULT_ROW_CAP
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Entries per ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Trailing months covered by trend charts.
    #[serde(default = "default_trend_months")]
    pub trend_months: u32,

    /// UTC offset of the display calendar, as `+HH:MM`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Emit zero-valued months between the first and last trend bucket.
    #[serde(default)]
    pub fill_month_gaps: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            trend_months: default_trend_months(),
            utc_offset: default_utc_offset(),
            fill_month_gaps: false,
        }
    }
}

fn default_top_n() -> usize {
    5
}

fn default_trend_months() -> u32 {
    6
}

fn default_utc_offset() -> String {
    "+08:00".to_string()
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory exported files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default export period.
    #[serde(default)]
    pub period: Period,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            period: Period::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

/// Parse a `+HH:MM` / `-HH:MM` UTC offset.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    value
        .trim()
        .parse::<FixedOffset>()
        .with_context(|| format!("Invalid UTC offset '{}', expected +HH:MM", value))
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values the CLI (or its environment variables) actually provides
    /// override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.url {
            self.store.url = url.clone();
        }
        if let Some(ref key) = args.key {
            self.store.anon_key = key.clone();
        }
        if let Some(timeout) = args.timeout {
            self.store.timeout_seconds = timeout;
        }
        if let Some(row_cap) = args.row_cap {
            self.store.row_cap = row_cap;
        }
        if let Some(ref snapshot) = args.snapshot {
            self.store.snapshot = Some(snapshot.clone());
        }
        if let Some(ref offset) = args.utc_offset {
            self.analytics.utc_offset = offset.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Aggregation settings derived from the `[analytics]` section.
    pub fn analytics_settings(&self) -> Result<AnalyticsSettings> {
        Ok(AnalyticsSettings {
            display_offset: parse_utc_offset(&self.analytics.utc_offset)?,
            gap_policy: if self.analytics.fill_month_gaps {
                GapPolicy::ZeroFill
            } else {
                GapPolicy::Omit
            },
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
