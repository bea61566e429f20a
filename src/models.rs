//! Data models for the usage dashboard.
//!
//! This module contains the core data structures shared by the loader,
//! the aggregation pipeline, and the report generators.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use crate::analysis::range::TimeRange;

/// AI coding-assistant provider a usage record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    Codex,
    OpenCode,
    Qwen,
    Gemini,
}

impl Provider {
    /// Every supported provider, in display order.
    pub const ALL: [Provider; 5] = [
        Provider::Claude,
        Provider::Codex,
        Provider::OpenCode,
        Provider::Qwen,
        Provider::Gemini,
    ];

    /// Key used for this provider in export documents.
    pub fn key(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Codex => "codex",
            Provider::OpenCode => "opencode",
            Provider::Qwen => "qwen",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Claude => write!(f, "Claude Code"),
            Provider::Codex => write!(f, "Codex"),
            Provider::OpenCode => write!(f, "OpenCode"),
            Provider::Qwen => write!(f, "Qwen"),
            Provider::Gemini => write!(f, "Gemini"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "claude-code" | "claude_code" | "claudecode" => Ok(Provider::Claude),
            "codex" => Ok(Provider::Codex),
            "opencode" | "open-code" => Ok(Provider::OpenCode),
            "qwen" | "qwen-code" => Ok(Provider::Qwen),
            "gemini" | "gemini-cli" => Ok(Provider::Gemini),
            other => {
                let known: Vec<&str> = Provider::ALL.iter().map(|p| p.key()).collect();
                Err(format!(
                    "Unknown provider '{}' (expected one of: {})",
                    other,
                    known.join(", ")
                ))
            }
        }
    }
}

/// Which value a chart is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Total tokens per day
    #[default]
    Tokens,
    /// Cost in USD per day
    Cost,
}

impl Metric {
    /// Extract this metric from a merged day.
    pub fn value(&self, day: &MergedDay) -> f64 {
        match self {
            Metric::Tokens => day.total_tokens as f64,
            Metric::Cost => day.cost,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Tokens => write!(f, "tokens"),
            Metric::Cost => write!(f, "cost"),
        }
    }
}

/// First day of the week in calendar grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    /// Returns the first day of the week containing `date`.
    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        let offset = match self {
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
            WeekStart::Monday => date.weekday().num_days_from_monday(),
        };
        date.checked_sub_days(Days::new(u64::from(offset)))
            .unwrap_or(date)
    }

    /// Short weekday labels in grid row order.
    pub fn weekday_labels(&self) -> [&'static str; 7] {
        match self {
            WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
            WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        }
    }
}

/// Token counts split by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCounts {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

impl TokenCounts {
    /// Sum of all four components.
    pub fn total(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_creation_tokens)
            .saturating_add(self.cache_read_tokens)
    }
}

impl AddAssign for TokenCounts {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.cache_creation_tokens = self
            .cache_creation_tokens
            .saturating_add(other.cache_creation_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(other.cache_read_tokens);
    }
}

/// Usage attributed to a single model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    pub model: String,
    pub tokens: TokenCounts,
    pub cost: f64,
}

/// One provider's usage on one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub tokens: TokenCounts,
    /// Reported total; never below the sum of `tokens`' components.
    pub total_tokens: u64,
    pub cost: f64,
    pub models: Vec<String>,
    pub breakdowns: Vec<ModelUsage>,
}

impl DailyRecord {
    /// Creates an empty record for the given date.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            tokens: TokenCounts::default(),
            total_tokens: 0,
            cost: 0.0,
            models: Vec::new(),
            breakdowns: Vec::new(),
        }
    }
}

/// A provider's share of a merged day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDay {
    pub tokens: TokenCounts,
    pub total_tokens: u64,
    pub cost: f64,
    pub models: Vec<String>,
    pub breakdowns: Vec<ModelUsage>,
}

impl ProviderDay {
    /// Fold a daily record into this provider day.
    pub fn absorb(&mut self, record: &DailyRecord) {
        self.tokens += record.tokens;
        self.total_tokens = self.total_tokens.saturating_add(record.total_tokens);
        self.cost += record.cost;
        union_models(&mut self.models, &record.models);
        merge_breakdowns(&mut self.breakdowns, &record.breakdowns);
    }
}

/// One calendar date of the merged multi-provider series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDay {
    pub date: NaiveDate,
    pub tokens: TokenCounts,
    pub total_tokens: u64,
    pub cost: f64,
    pub models: Vec<String>,
    pub breakdowns: Vec<ModelUsage>,
    pub providers: BTreeMap<Provider, ProviderDay>,
}

impl MergedDay {
    /// A day with no usage.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            tokens: TokenCounts::default(),
            total_tokens: 0,
            cost: 0.0,
            models: Vec::new(),
            breakdowns: Vec::new(),
            providers: BTreeMap::new(),
        }
    }

    /// Builds the day's combined figures from its per-provider parts.
    pub fn from_providers(date: NaiveDate, providers: BTreeMap<Provider, ProviderDay>) -> Self {
        let mut day = Self::empty(date);

        for part in providers.values() {
            day.tokens += part.tokens;
            day.total_tokens = day.total_tokens.saturating_add(part.total_tokens);
            day.cost += part.cost;
            union_models(&mut day.models, &part.models);
            merge_breakdowns(&mut day.breakdowns, &part.breakdowns);
        }

        day.providers = providers;
        day
    }

    /// Whether anything was consumed on this day.
    pub fn is_active(&self) -> bool {
        self.total_tokens > 0 || self.cost > 0.0
    }
}

/// Adds names from `incoming` to `target`, keeping it sorted and unique.
pub fn union_models(target: &mut Vec<String>, incoming: &[String]) {
    for model in incoming {
        if let Err(pos) = target.binary_search(model) {
            target.insert(pos, model.clone());
        }
    }
}

/// Sums `incoming` breakdowns into `target` by model name, sorted by name.
pub fn merge_breakdowns(target: &mut Vec<ModelUsage>, incoming: &[ModelUsage]) {
    for usage in incoming {
        match target.binary_search_by(|u| u.model.cmp(&usage.model)) {
            Ok(pos) => {
                target[pos].tokens += usage.tokens;
                target[pos].cost += usage.cost;
            }
            Err(pos) => target.insert(pos, usage.clone()),
        }
    }
}

/// Totals over a slice of the merged series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub tokens: TokenCounts,
    pub total_tokens: u64,
    pub cost: f64,
    pub active_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub avg_cost_per_day: f64,
    pub avg_tokens_per_day: f64,
    pub longest_streak: usize,
    pub current_streak: usize,
}

/// Per-provider totals over a slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTotals {
    pub provider: Provider,
    pub tokens: TokenCounts,
    pub total_tokens: u64,
    pub cost: f64,
    pub active_days: usize,
    /// Share of total cost, in percent.
    pub cost_share: f64,
    /// Share of total tokens, in percent.
    pub token_share: f64,
}

/// Direction of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "📈 Rising"),
            TrendDirection::Down => write!(f, "📉 Falling"),
            TrendDirection::Flat => write!(f, "➡️ Flat"),
        }
    }
}

/// Actual and fitted value on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub actual: f64,
    pub fitted: f64,
}

/// Least-squares line through a daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendLine {
    pub metric: Metric,
    /// Change per calendar day.
    pub slope: f64,
    /// Fitted value on the first date.
    pub intercept: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
    pub points: Vec<TrendPoint>,
}

impl TrendLine {
    /// Fitted value `days` after the last point, floored at zero.
    pub fn projection(&self, days: u64) -> f64 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        let x = (last.date - first.date).num_days() as f64 + days as f64;
        (self.slope * x + self.intercept).max(0.0)
    }
}

/// A single value on a date (smoothing series).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One day of the activity heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub value: f64,
    /// Intensity bucket, 0 (none) to 4 (max).
    pub level: u8,
}

/// One column of the heatmap grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapWeek {
    pub start: NaiveDate,
    /// Seven slots from the week start; `None` is outside the data range.
    pub days: Vec<Option<HeatmapCell>>,
}

/// Weekly-bucketed calendar grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    pub metric: Metric,
    pub week_start: WeekStart,
    pub max_value: f64,
    pub weeks: Vec<HeatmapWeek>,
}

/// A model's slice of the usage pie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelShare {
    pub model: String,
    pub total_tokens: u64,
    pub cost: f64,
    /// Number of days the model appeared on.
    pub days: usize,
    pub percentage: f64,
}

/// Metadata about a dashboard build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetadata {
    /// Input file or directory.
    pub source: String,
    /// Timestamp recorded by the exporter, if any.
    pub exported_at: Option<String>,
    pub built_at: DateTime<Utc>,
    pub range: TimeRange,
    pub metric: Metric,
    /// Provider filter; empty means all.
    pub providers: Vec<Provider>,
    /// Days in the merged series before range filtering.
    pub days_loaded: usize,
}

/// Everything the usage dashboard shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    pub totals: UsageTotals,
    pub providers: Vec<ProviderTotals>,
    pub trend: Option<TrendLine>,
    pub moving_average: Vec<SeriesPoint>,
    pub heatmap: Heatmap,
    pub models: Vec<ModelShare>,
    pub daily: Vec<MergedDay>,
}
