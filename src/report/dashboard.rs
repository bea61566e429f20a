//! Dashboard assembly.
//!
//! Runs the aggregation pipeline over a merged series and collects every
//! chart-ready shape into a single [`Dashboard`].

use chrono::Utc;
use tracing::{debug, info};

use crate::analysis::{self, TimeRange};
use crate::config::ReportConfig;
use crate::models::{Dashboard, DashboardMetadata, MergedDay, Metric, Provider, WeekStart};

/// Knobs for building a dashboard.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub range: TimeRange,
    pub metric: Metric,
    /// Empty means all providers.
    pub providers: Vec<Provider>,
    pub top_models: usize,
    pub week_start: WeekStart,
    pub moving_average_window: usize,
    /// Input path, for the metadata block.
    pub source: String,
    pub exported_at: Option<String>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self::from_report_config(&ReportConfig::default(), Vec::new())
    }
}

impl DashboardOptions {
    /// Options from the `[report]` config table.
    pub fn from_report_config(report: &ReportConfig, providers: Vec<Provider>) -> Self {
        Self {
            range: report.range,
            metric: report.metric,
            providers,
            top_models: report.top_models,
            week_start: report.week_start,
            moving_average_window: report.moving_average_window,
            source: String::new(),
            exported_at: None,
        }
    }
}

/// Build the dashboard for a merged series.
pub fn build_dashboard(series: &[MergedDay], options: &DashboardOptions) -> Dashboard {
    let selected = analysis::filter_providers(series, &options.providers);
    let daily = analysis::filter_range(&selected, options.range);

    info!(
        "{}: {} of {} days selected",
        options.range.label(),
        daily.len(),
        series.len()
    );

    let totals = analysis::compute_totals(&daily);
    let providers = analysis::provider_totals(&daily);
    let trend = analysis::linear_trend(&daily, options.metric);
    let moving_average =
        analysis::moving_average(&daily, options.metric, options.moving_average_window);
    let heatmap = analysis::build_heatmap(&daily, options.metric, options.week_start);
    let models = analysis::model_distribution(&daily, options.top_models);

    debug!(
        "Dashboard: {} providers, {} models, {} heatmap weeks",
        providers.len(),
        models.len(),
        heatmap.weeks.len()
    );

    Dashboard {
        metadata: DashboardMetadata {
            source: options.source.clone(),
            exported_at: options.exported_at.clone(),
            built_at: Utc::now(),
            range: options.range,
            metric: options.metric,
            providers: options.providers.clone(),
            days_loaded: series.len(),
        },
        totals,
        providers,
        trend,
        moving_average,
        heatmap,
        models,
        daily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::merge_daily;
    use crate::models::{DailyRecord, TokenCounts};
    use chrono::NaiveDate;

    fn record(day: &str, input: u64, cost: f64) -> DailyRecord {
        let mut r = DailyRecord::new(NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap());
        r.tokens = TokenCounts {
            input_tokens: input,
            ..Default::default()
        };
        r.total_tokens = input;
        r.cost = cost;
        r
    }

    fn sample_series() -> Vec<MergedDay> {
        merge_daily(&[
            (
                Provider::Claude,
                vec![
                    record("2025-01-01", 100, 1.0),
                    record("2025-05-20", 200, 2.0),
                    record("2025-05-30", 300, 3.0),
                ],
            ),
            (Provider::Gemini, vec![record("2025-05-31", 50, 0.0)]),
        ])
    }

    #[test]
    fn test_build_dashboard_week() {
        let options = DashboardOptions {
            range: TimeRange::Week,
            ..Default::default()
        };
        let dashboard = build_dashboard(&sample_series(), &options);

        assert_eq!(dashboard.metadata.days_loaded, 4);
        assert_eq!(dashboard.daily.len(), 2);
        assert_eq!(dashboard.totals.total_tokens, 350);
        assert_eq!(dashboard.providers.len(), 2);
        assert!(dashboard.trend.is_some());
        assert_eq!(dashboard.moving_average.len(), 2);
        assert!(!dashboard.heatmap.weeks.is_empty());
    }

    #[test]
    fn test_build_dashboard_provider_filter() {
        let options = DashboardOptions {
            range: TimeRange::All,
            providers: vec![Provider::Gemini],
            ..Default::default()
        };
        let dashboard = build_dashboard(&sample_series(), &options);

        assert_eq!(dashboard.daily.len(), 1);
        assert_eq!(dashboard.totals.cost, 0.0);
        assert!(dashboard.trend.is_none());
        assert_eq!(dashboard.providers[0].provider, Provider::Gemini);
    }

    #[test]
    fn test_build_dashboard_empty() {
        let dashboard = build_dashboard(&[], &DashboardOptions::default());
        assert!(dashboard.daily.is_empty());
        assert!(dashboard.trend.is_none());
        assert!(dashboard.models.is_empty());
        assert!(dashboard.heatmap.weeks.is_empty());
    }
}
