//! Markdown and JSON report generation.
//!
//! This module renders a [`Dashboard`] as a Markdown document or pretty
//! JSON for downstream charting.

use crate::models::{
    Dashboard, DashboardMetadata, Heatmap, MergedDay, Metric, ModelShare, ProviderTotals,
    TrendLine, UsageTotals,
};
use anyhow::Result;

/// Glyphs for heatmap intensity levels 0..=4.
const HEATMAP_GLYPHS: [char; 5] = ['·', '░', '▒', '▓', '█'];

/// Generate a complete Markdown report.
pub fn generate_markdown_report(dashboard: &Dashboard, daily_rows: usize) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# AI Usage Dashboard\n\n");

    output.push_str(&generate_metadata_section(&dashboard.metadata));

    if dashboard.daily.is_empty() {
        output.push_str("No usage recorded in the selected range.\n\n");
        output.push_str(&generate_footer());
        return output;
    }

    output.push_str(&generate_summary_section(&dashboard.totals));
    output.push_str(&generate_providers_section(&dashboard.providers));
    output.push_str(&generate_trend_section(dashboard.trend.as_ref()));
    output.push_str(&generate_models_section(&dashboard.models));
    output.push_str(&generate_heatmap_section(&dashboard.heatmap));
    output.push_str(&generate_daily_section(&dashboard.daily, daily_rows));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    if let Some(ref exported) = metadata.exported_at {
        section.push_str(&format!("- **Exported At:** {}\n", exported));
    }
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.built_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Range:** {} (`{}`)\n",
        metadata.range.label(),
        metadata.range
    ));
    section.push_str(&format!("- **Metric:** {}\n", metadata.metric));
    if !metadata.providers.is_empty() {
        let names: Vec<String> = metadata.providers.iter().map(|p| p.to_string()).collect();
        section.push_str(&format!("- **Providers:** {}\n", names.join(", ")));
    }
    section.push_str(&format!("- **Days Loaded:** {}\n", metadata.days_loaded));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(totals: &UsageTotals) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Total Tokens | Cost | Active Days | Avg Cost/Day | Longest Streak | Current Streak |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | **{}** | {} | {} | {} | {} |\n\n",
        format_tokens(totals.total_tokens),
        format_cost(totals.cost),
        totals.active_days,
        format_cost(totals.avg_cost_per_day),
        totals.longest_streak,
        totals.current_streak,
    ));

    section.push_str("### Token Breakdown\n\n");
    section.push_str("| Input | Output | Cache Write | Cache Read |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        format_tokens(totals.tokens.input_tokens),
        format_tokens(totals.tokens.output_tokens),
        format_tokens(totals.tokens.cache_creation_tokens),
        format_tokens(totals.tokens.cache_read_tokens),
    ));

    if let (Some(first), Some(last)) = (totals.first_date, totals.last_date) {
        section.push_str(&format!("*Period: {} to {}*\n\n", first, last));
    }

    section
}

/// Generate the per-provider section.
fn generate_providers_section(providers: &[ProviderTotals]) -> String {
    if providers.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Providers\n\n");
    section.push_str("| Provider | Tokens | Cost | Active Days | Cost Share | Token Share |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");

    for p in providers {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.2}% | {:.2}% |\n",
            p.provider,
            format_tokens(p.total_tokens),
            format_cost(p.cost),
            p.active_days,
            p.cost_share,
            p.token_share,
        ));
    }
    section.push('\n');

    section
}

/// Generate the trend section.
fn generate_trend_section(trend: Option<&TrendLine>) -> String {
    let mut section = String::new();

    section.push_str("## Trend\n\n");

    let Some(trend) = trend else {
        section.push_str("Not enough data for a trend line (need at least two days).\n\n");
        return section;
    };

    section.push_str(&format!("- **Direction:** {}\n", trend.direction));
    section.push_str(&format!(
        "- **Slope:** {} per day\n",
        format_metric(trend.metric, trend.slope)
    ));
    section.push_str(&format!("- **Fit (R²):** {:.3}\n", trend.r_squared));
    section.push_str(&format!(
        "- **Projected in 30 days:** {} per day\n\n",
        format_metric(trend.metric, trend.projection(30))
    ));

    section
}

/// Generate the model distribution section.
fn generate_models_section(models: &[ModelShare]) -> String {
    if models.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Models\n\n");
    section.push_str("| Model | Tokens | Cost | Days | Share |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");

    for m in models {
        section.push_str(&format!(
            "| `{}` | {} | {} | {} | {:.2}% |\n",
            m.model,
            format_tokens(m.total_tokens),
            format_cost(m.cost),
            m.days,
            m.percentage,
        ));
    }
    section.push('\n');

    section
}

/// Generate the activity heatmap as a text grid.
fn generate_heatmap_section(heatmap: &Heatmap) -> String {
    if heatmap.weeks.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Activity\n\n```\n");

    for (row, label) in heatmap.week_start.weekday_labels().iter().enumerate() {
        section.push_str(label);
        section.push(' ');
        for week in &heatmap.weeks {
            let glyph = match week.days.get(row) {
                Some(Some(cell)) => HEATMAP_GLYPHS[usize::from(cell.level.min(4))],
                _ => ' ',
            };
            section.push(glyph);
        }
        section.push('\n');
    }

    section.push_str("```\n\n");
    section.push_str(&format!(
        "*Less {} More · peak {}*\n\n",
        HEATMAP_GLYPHS.iter().collect::<String>(),
        format_metric(heatmap.metric, heatmap.max_value)
    ));

    section
}

/// Generate the daily breakdown table, most recent first.
fn generate_daily_section(daily: &[MergedDay], rows: usize) -> String {
    if rows == 0 {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Daily Breakdown\n\n");
    section.push_str("| Date | Tokens | Cost | Providers | Models |\n");
    section.push_str("|:---|:---:|:---:|:---|:---|\n");

    for day in daily.iter().rev().take(rows) {
        let providers: Vec<String> = day.providers.keys().map(|p| p.to_string()).collect();
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            day.date,
            format_tokens(day.total_tokens),
            format_cost(day.cost),
            providers.join(", "),
            day.models.join(", "),
        ));
    }

    let omitted = daily.len().saturating_sub(rows);
    if omitted > 0 {
        section.push_str(&format!(
            "\n*{} earlier {} omitted.*\n",
            omitted,
            if omitted == 1 { "day" } else { "days" }
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by tokenboard*\n");

    footer
}

/// Compact token count: 950, 12.3K, 4.56M, 1.20B.
pub fn format_tokens(tokens: u64) -> String {
    let t = tokens as f64;
    if t >= 1e9 {
        format!("{:.2}B", t / 1e9)
    } else if t >= 1e6 {
        format!("{:.2}M", t / 1e6)
    } else if t >= 1e3 {
        format!("{:.1}K", t / 1e3)
    } else {
        tokens.to_string()
    }
}

/// Dollar amount with two decimals.
pub fn format_cost(cost: f64) -> String {
    if cost < 0.0 {
        format!("-${:.2}", -cost)
    } else {
        format!("${:.2}", cost)
    }
}

fn format_metric(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Cost => format_cost(value),
        Metric::Tokens if value < 0.0 => format!("-{}", format_tokens((-value).round() as u64)),
        Metric::Tokens => format_tokens(value.round() as u64),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{merge_daily, TimeRange};
    use crate::models::{DailyRecord, ModelUsage, Provider, TokenCounts};
    use crate::report::{build_dashboard, DashboardOptions};
    use chrono::NaiveDate;

    fn record(day: &str, input: u64, cost: f64, model: &str) -> DailyRecord {
        let tokens = TokenCounts {
            input_tokens: input,
            ..Default::default()
        };
        let mut r = DailyRecord::new(NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap());
        r.tokens = tokens;
        r.total_tokens = input;
        r.cost = cost;
        r.models = vec![model.to_string()];
        r.breakdowns = vec![ModelUsage {
            model: model.to_string(),
            tokens,
            cost,
        }];
        r
    }

    fn create_test_dashboard() -> Dashboard {
        let series = merge_daily(&[
            (
                Provider::Claude,
                vec![
                    record("2025-05-28", 12_000, 1.5, "claude-sonnet-4"),
                    record("2025-05-30", 2_500_000, 4.25, "claude-opus-4"),
                ],
            ),
            (
                Provider::Codex,
                vec![record("2025-05-30", 800, 0.2, "gpt-5-codex")],
            ),
        ]);
        let options = DashboardOptions {
            range: TimeRange::All,
            source: "usage.json".to_string(),
            ..Default::default()
        };
        build_dashboard(&series, &options)
    }

    #[test]
    fn test_generate_markdown_report() {
        let dashboard = create_test_dashboard();
        let markdown = generate_markdown_report(&dashboard, 31);

        assert!(markdown.contains("# AI Usage Dashboard"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Providers"));
        assert!(markdown.contains("Claude Code"));
        assert!(markdown.contains("## Trend"));
        assert!(markdown.contains("`claude-opus-4`"));
        assert!(markdown.contains("## Activity"));
        assert!(markdown.contains("| 2025-05-30 |"));
    }

    #[test]
    fn test_daily_rows_limit() {
        let dashboard = create_test_dashboard();
        let markdown = generate_markdown_report(&dashboard, 1);

        assert!(markdown.contains("| 2025-05-30 |"));
        assert!(!markdown.contains("| 2025-05-28 |"));
        assert!(markdown.contains("*1 earlier day omitted.*"));

        let no_table = generate_markdown_report(&dashboard, 0);
        assert!(!no_table.contains("## Daily Breakdown"));
    }

    #[test]
    fn test_empty_dashboard_report() {
        let dashboard = build_dashboard(&[], &DashboardOptions::default());
        let markdown = generate_markdown_report(&dashboard, 31);

        assert!(markdown.contains("No usage recorded"));
        assert!(!markdown.contains("## Summary"));
    }

    #[test]
    fn test_heatmap_grid_rows() {
        let dashboard = create_test_dashboard();
        let section = generate_heatmap_section(&dashboard.heatmap);

        assert!(section.contains("Sun "));
        assert!(section.contains("Sat "));
        // 2025-05-30 is the peak day (Friday).
        assert!(section.contains("Fri █"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_tokens(950), "950");
        assert_eq!(format_tokens(12_345), "12.3K");
        assert_eq!(format_tokens(4_560_000), "4.56M");
        assert_eq!(format_tokens(1_200_000_000), "1.20B");
        assert_eq!(format_cost(3.456), "$3.46");
        assert_eq!(format_cost(-0.5), "-$0.50");
        assert_eq!(format_metric(Metric::Tokens, -1500.0), "-1.5K");
    }

    #[test]
    fn test_generate_json_report() {
        let dashboard = create_test_dashboard();
        let json = generate_json_report(&dashboard).unwrap();

        assert!(json.contains("\"totals\""));
        assert!(json.contains("\"heatmap\""));
        assert!(json.contains("\"range\": \"all\""));
        assert!(json.contains("\"claude\""));
    }
}
