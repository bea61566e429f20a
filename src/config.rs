//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tokenboard.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::TimeRange;
use crate::models::{Metric, Provider, WeekStart};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".tokenboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output path; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Where usage exports come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Export file or directory of exports.
    #[serde(default = "default_input")]
    pub input: String,

    /// Providers to include; empty means all.
    #[serde(default)]
    pub providers: Vec<Provider>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            providers: Vec::new(),
        }
    }
}

fn default_input() -> String {
    "usage.json".to_string()
}

/// Dashboard/report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Trailing window to show.
    #[serde(default)]
    pub range: TimeRange,

    /// Metric for the trend line and heatmap.
    #[serde(default)]
    pub metric: Metric,

    /// Models shown before grouping the rest as "Other"; 0 disables grouping.
    #[serde(default = "default_top_models")]
    pub top_models: usize,

    /// First weekday of heatmap columns.
    #[serde(default)]
    pub week_start: WeekStart,

    /// Days in the moving-average window.
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,

    /// Rows in the Markdown daily breakdown table.
    #[serde(default = "default_daily_rows")]
    pub daily_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            range: TimeRange::default(),
            metric: Metric::default(),
            top_models: default_top_models(),
            week_start: WeekStart::default(),
            moving_average_window: default_moving_average_window(),
            daily_rows: default_daily_rows(),
        }
    }
}

fn default_top_models() -> usize {
    8
}

fn default_moving_average_window() -> usize {
    7
}

fn default_daily_rows() -> usize {
    31
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
    /// CLI arguments take precedence over config file settings; only values
    /// given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.data.input = input.display().to_string();
        }
        if let Some(ref providers) = args.providers {
            self.data.providers = providers.clone();
        }

        if let Some(range) = args.range {
            self.report.range = range;
        }
        if let Some(metric) = args.metric {
            self.report.metric = metric;
        }
        if let Some(top) = args.top_models {
            self.report.top_models = top;
        }
        if let Some(week_start) = args.week_start {
            self.report.week_start = week_start;
        }
        if let Some(window) = args.moving_average {
            self.report.moving_average_window = window;
        }
        if let Some(rows) = args.daily_rows {
            self.report.daily_rows = rows;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
    }

    /// Input path as a `PathBuf`.
    pub fn input_path(&self) -> PathBuf {
        PathBuf::from(&self.data.input)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
