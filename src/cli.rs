//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Category, MonthKey, Period};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lakbay Analytics - dashboard aggregates for Lakbay CamSur
///
/// Computes destination rankings, category breakdowns, and monthly
/// trends from destination view and visit events, and exports them
/// as CSV or Markdown/JSON reports.
///
/// Examples:
///   lakbay-analytics overview
///   lakbay-analytics top-viewed --top 10 --category nature
///   lakbay-analytics --snapshot fixtures/sample_snapshot.json trends --months 12
///   lakbay-analytics export --period week --out-dir ./exports
///   lakbay-analytics init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lakbay.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Read events from a JSON snapshot instead of the remote store
    #[arg(long, value_name = "FILE", global = true)]
    pub snapshot: Option<PathBuf>,

    /// Project URL of the hosted row store
    #[arg(long, value_name = "URL", env = "SUPABASE_URL", global = true)]
    pub url: Option<String>,

    /// Public (anon) API key for the row store
    #[arg(
        long,
        value_name = "KEY",
        env = "SUPABASE_ANON_KEY",
        hide_env_values = true,
        global = true
    )]
    pub key: Option<String>,

    /// Maximum rows fetched per query
    #[arg(long, value_name = "ROWS", global = true)]
    pub row_cap: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// UTC offset used for month bucketing and labels (e.g. +08:00)
    #[arg(long, value_name = "OFFSET", global = true, allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

/// Analytics operations.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show totals and every dashboard section
    Overview,

    /// Rank destinations by view count
    TopViewed(RankingArgs),

    /// Rank destinations by visit count
    TopVisited(RankingArgs),

    /// Rank destinations by confirmed visit count
    TopConfirmed(RankingArgs),

    /// Per-category views, visits, and destination counts
    Categories,

    /// Monthly views and visits
    Trends {
        /// Number of trailing months to include
        #[arg(long, value_name = "COUNT")]
        months: Option<u32>,

        /// Emit zero-valued months between active months
        #[arg(long)]
        fill_gaps: bool,
    },

    /// Export views, visits, and the interaction log as CSV files
    Export {
        /// Time window to export
        #[arg(long, value_name = "PERIOD")]
        period: Option<Period>,

        /// Directory to write the CSV files to
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Write a full dashboard report to a file
    Report {
        /// Output file path for the report
        #[arg(short, long, default_value = "lakbay_report.md", value_name = "FILE")]
        output: PathBuf,

        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Entries per ranking
        #[arg(long, value_name = "COUNT")]
        top: Option<usize>,

        /// Number of trailing months to include in trends
        #[arg(long, value_name = "COUNT")]
        months: Option<u32>,
    },

    /// Generate a default .lakbay.toml configuration file
    InitConfig,
}

/// Shared options of the ranking commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RankingArgs {
    /// Number of destinations to list
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Restrict to one category (code or label)
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<Category>,

    /// Restrict to one calendar month (YYYY-MM)
    #[arg(long, value_name = "YYYY-MM")]
    pub month: Option<MonthKey>,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.command, Command::InitConfig) {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Store URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.row_cap == Some(0) {
            return Err("Row cap must be at least 1".to_string());
        }

        if let Some(ref snapshot) = self.snapshot {
            if !snapshot.is_file() {
                return Err(format!("Snapshot file does not exist: {}", snapshot.display()));
            }
        }

        match &self.command {
            Command::TopViewed(ranking)
            | Command::TopVisited(ranking)
            | Command::TopConfirmed(ranking) => {
                if ranking.top == Some(0) {
                    return Err("--top must be at least 1".to_string());
                }
            }
            Command::Trends { months, .. } | Command::Report { months, .. } => {
                if *months == Some(0) {
                    return Err("--months must be at least 1".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            command,
            config: None,
            snapshot: None,
            url: Some("https://example.supabase.co".to_string()),
            key: Some("anon".to_string()),
            row_cap: None,
            timeout: None,
            utc_offset: None,
            verbose: false,
            quiet: false,
            json: false,
        }
    }

    #[test]
    fn test_parse_ranking_command() {
        let args = Args::parse_from([
            "lakbay-analytics",
            "top-viewed",
            "-n",
            "3",
            "--category",
            "Food & Dining",
            "--month",
            "2024-03",
        ]);

        match args.command {
            Command::TopViewed(ranking) => {
                assert_eq!(ranking.top, Some(3));
                assert_eq!(ranking.category, Some(Category::Food));
                assert_eq!(ranking.month, MonthKey::new(2024, 3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_period() {
        let args = Args::parse_from(["lakbay-analytics", "export", "--period", "week"]);
        match args.command {
            Command::Export { period, out_dir } => {
                assert_eq!(period, Some(Period::Week));
                assert!(out_dir.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_offset() {
        let args = Args::parse_from(["lakbay-analytics", "--utc-offset", "-05:00", "trends"]);
        assert_eq!(args.utc_offset.as_deref(), Some("-05:00"));
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args(Command::Overview);
        args.url = Some("example.supabase.co".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Overview);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_values() {
        let args = make_args(Command::TopVisited(RankingArgs {
            top: Some(0),
            ..RankingArgs::default()
        }));
        assert!(args.validate().is_err());

        let args = make_args(Command::Trends {
            months: Some(0),
            fill_gaps: false,
        });
        assert!(args.validate().is_err());

        let mut args = make_args(Command::Categories);
        args.row_cap = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_skips_init_config() {
        let mut args = make_args(Command::InitConfig);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::Overview);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
