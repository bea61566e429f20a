//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

use crate::analysis::TimeRange;
use crate::models::{Metric, Provider, WeekStart};

/// Tokenboard - AI coding-assistant usage dashboard
///
/// Merges daily token/cost exports from Claude Code, Codex, OpenCode, Qwen
/// and Gemini, then reports totals, trends, an activity heatmap and the
/// model mix for a trailing time window.
///
/// Examples:
///   tokenboard --input usage.json
///   tokenboard --input exports/ --range 1m --metric cost
///   tokenboard --input usage.json --providers claude,codex --format json -o dash.json
///   tokenboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Usage export file, or a directory of exports
    ///
    /// Falls back to [data].input in .tokenboard.toml.
    #[arg(short, long, value_name = "PATH", env = "TOKENBOARD_INPUT")]
    pub input: Option<PathBuf>,

    /// Trailing time window (7d, 1m, 3m, 6m, 1y, all)
    #[arg(short, long, value_name = "RANGE")]
    pub range: Option<TimeRange>,

    /// Providers to include (comma-separated)
    ///
    /// Example: --providers claude,codex
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',')]
    pub providers: Option<Vec<Provider>>,

    /// Metric for the trend line and heatmap
    #[arg(short, long, value_name = "METRIC")]
    pub metric: Option<Metric>,

    /// Output file path for the report (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Models listed before the rest are grouped as "Other" (0 = no grouping)
    #[arg(long, value_name = "COUNT")]
    pub top_models: Option<usize>,

    /// First day of the week in the heatmap
    #[arg(long, value_name = "DAY")]
    pub week_start: Option<WeekStart>,

    /// Moving-average window in days
    #[arg(long, value_name = "DAYS")]
    pub moving_average: Option<usize>,

    /// Rows in the daily breakdown table
    #[arg(long, value_name = "COUNT")]
    pub daily_rows: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tokenboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .tokenboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
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
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(window) = self.moving_average {
            if window == 0 {
                return Err("Moving-average window must be at least 1 day".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input does not exist: {}", input.display()));
            }
        }

        if let Some(ref config) = self.config {
            if !config.is_file() {
                return Err(format!("Config file not found: {}", config.display()));
            }
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
