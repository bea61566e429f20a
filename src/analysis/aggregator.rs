//! Daily-series merging and totals.
//!
//! This module combines per-provider daily records into one calendar-indexed
//! series and reduces slices of that series into summary statistics.

use crate::models::{
    DailyRecord, MergedDay, Provider, ProviderDay, ProviderTotals, TokenCounts, UsageTotals,
};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

/// Merge provider series into one date-sorted series.
///
/// Records sharing a date (across providers, or repeated within one
/// provider) are summed; model lists are unioned.
pub fn merge_daily(sources: &[(Provider, Vec<DailyRecord>)]) -> Vec<MergedDay> {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<Provider, ProviderDay>> = BTreeMap::new();

    for (provider, records) in sources {
        debug!("Merging {} records from {}", records.len(), provider);
        for record in records {
            by_date
                .entry(record.date)
                .or_default()
                .entry(*provider)
                .or_default()
                .absorb(record);
        }
    }

    by_date
        .into_iter()
        .map(|(date, providers)| MergedDay::from_providers(date, providers))
        .collect()
}

/// Restrict a merged series to a subset of providers.
///
/// An empty subset keeps everything. Days left without any provider are
/// dropped.
pub fn filter_providers(series: &[MergedDay], providers: &[Provider]) -> Vec<MergedDay> {
    if providers.is_empty() {
        return series.to_vec();
    }

    series
        .iter()
        .filter_map(|day| {
            let kept: BTreeMap<Provider, ProviderDay> = day
                .providers
                .iter()
                .filter(|(p, _)| providers.contains(p))
                .map(|(p, part)| (*p, part.clone()))
                .collect();

            if kept.is_empty() {
                None
            } else {
                Some(MergedDay::from_providers(day.date, kept))
            }
        })
        .collect()
}

/// Re-sum token and cost fields over a slice.
pub fn compute_totals(slice: &[MergedDay]) -> UsageTotals {
    let mut totals = UsageTotals::default();

    for day in slice {
        totals.tokens += day.tokens;
        totals.total_tokens = totals.total_tokens.saturating_add(day.total_tokens);
        totals.cost += day.cost;
        if day.is_active() {
            totals.active_days += 1;
        }
    }

    totals.first_date = slice.iter().map(|d| d.date).min();
    totals.last_date = slice.iter().map(|d| d.date).max();

    if totals.active_days > 0 {
        totals.avg_cost_per_day = totals.cost / totals.active_days as f64;
        totals.avg_tokens_per_day = totals.total_tokens as f64 / totals.active_days as f64;
    }

    let (longest, current) = streaks(slice);
    totals.longest_streak = longest;
    totals.current_streak = current;

    totals
}

/// Longest run of consecutive active days, and the run ending on the
/// slice's last date.
fn streaks(slice: &[MergedDay]) -> (usize, usize) {
    let mut active: Vec<NaiveDate> = slice
        .iter()
        .filter(|d| d.is_active())
        .map(|d| d.date)
        .collect();
    active.sort();
    active.dedup();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for date in &active {
        run = match previous {
            Some(prev) if prev.checked_add_days(Days::new(1)) == Some(*date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*date);
    }

    let last_date = slice.iter().map(|d| d.date).max();
    let current = if previous.is_some() && previous == last_date {
        run
    } else {
        0
    };

    (longest, current)
}

/// Per-provider totals over a slice, most expensive first.
pub fn provider_totals(slice: &[MergedDay]) -> Vec<ProviderTotals> {
    let mut acc: BTreeMap<Provider, (TokenCounts, u64, f64, usize)> = BTreeMap::new();

    for day in slice {
        for (provider, part) in &day.providers {
            let entry = acc.entry(*provider).or_default();
            entry.0 += part.tokens;
            entry.1 = entry.1.saturating_add(part.total_tokens);
            entry.2 += part.cost;
            if part.total_tokens > 0 || part.cost > 0.0 {
                entry.3 += 1;
            }
        }
    }

    let total_cost: f64 = acc.values().map(|v| v.2).sum();
    let total_tokens: u64 = acc.values().fold(0u64, |sum, v| sum.saturating_add(v.1));

    let mut list: Vec<ProviderTotals> = acc
        .into_iter()
        .map(|(provider, (tokens, provider_tokens, cost, active_days))| ProviderTotals {
            provider,
            tokens,
            total_tokens: provider_tokens,
            cost,
            active_days,
            cost_share: share(cost, total_cost),
            token_share: share(provider_tokens as f64, total_tokens as f64),
        })
        .collect();

    list.sort_by(|a, b| {
        b.cost
            .partial_cmp(&a.cost)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.total_tokens.cmp(&a.total_tokens))
    });

    list
}

/// Percentage of `part` in `whole`, rounded to two decimals.
pub fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        ((part / whole) * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// Dense series from the first to the last date, gaps filled with empty days.
pub fn fill_calendar(slice: &[MergedDay]) -> Vec<MergedDay> {
    let (Some(first), Some(last)) = (
        slice.iter().map(|d| d.date).min(),
        slice.iter().map(|d| d.date).max(),
    ) else {
        return Vec::new();
    };

    let by_date: BTreeMap<NaiveDate, &MergedDay> = slice.iter().map(|d| (d.date, d)).collect();

    first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| match by_date.get(&date) {
            Some(day) => (*day).clone(),
            None => MergedDay::empty(date),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelUsage;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn create_test_record(day: &str, input: u64, output: u64, cost: f64, models: &[&str]) -> DailyRecord {
        let tokens = TokenCounts {
            input_tokens: input,
            output_tokens: output,
            ..Default::default()
        };
        DailyRecord {
            date: date(day),
            tokens,
            total_tokens: tokens.total(),
            cost,
            models: models.iter().map(|m| m.to_string()).collect(),
            breakdowns: models
                .iter()
                .map(|m| ModelUsage {
                    model: m.to_string(),
                    tokens,
                    cost,
                })
                .collect(),
        }
    }

    fn sample_sources() -> Vec<(Provider, Vec<DailyRecord>)> {
        vec![
            (
                Provider::Claude,
                vec![
                    create_test_record("2025-05-01", 100, 50, 1.0, &["sonnet"]),
                    create_test_record("2025-05-03", 200, 100, 2.0, &["opus"]),
                ],
            ),
            (
                Provider::Codex,
                vec![create_test_record("2025-05-01", 10, 5, 0.5, &["gpt-5"])],
            ),
        ]
    }

    #[test]
    fn test_merge_sums_same_date_across_providers() {
        let merged = merge_daily(&sample_sources());

        assert_eq!(merged.len(), 2);
        let first = &merged[0];
        assert_eq!(first.date, date("2025-05-01"));
        assert_eq!(first.tokens.input_tokens, 110);
        assert_eq!(first.total_tokens, 165);
        assert!((first.cost - 1.5).abs() < 1e-9);
        assert_eq!(first.models, vec!["gpt-5", "sonnet"]);
        assert_eq!(first.providers.len(), 2);
        assert_eq!(first.providers[&Provider::Codex].total_tokens, 15);
    }

    #[test]
    fn test_merge_duplicate_dates_within_provider() {
        let sources = vec![(
            Provider::Gemini,
            vec![
                create_test_record("2025-05-02", 1, 1, 0.0, &["flash"]),
                create_test_record("2025-05-02", 2, 2, 0.0, &["pro"]),
            ],
        )];
        let merged = merge_daily(&sources);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total_tokens, 6);
        assert_eq!(merged[0].models, vec!["flash", "pro"]);
        assert_eq!(merged[0].breakdowns.len(), 2);
    }

    #[test]
    fn test_merge_output_is_date_sorted() {
        let sources = vec![(
            Provider::Qwen,
            vec![
                create_test_record("2025-05-09", 1, 0, 0.0, &[]),
                create_test_record("2025-05-01", 1, 0, 0.0, &[]),
            ],
        )];
        let merged = merge_daily(&sources);
        assert!(merged[0].date < merged[1].date);
    }

    #[test]
    fn test_filter_providers() {
        let merged = merge_daily(&sample_sources());

        let codex_only = filter_providers(&merged, &[Provider::Codex]);
        assert_eq!(codex_only.len(), 1);
        assert_eq!(codex_only[0].total_tokens, 15);
        assert_eq!(codex_only[0].models, vec!["gpt-5"]);

        assert_eq!(filter_providers(&merged, &[]).len(), 2);
        assert!(filter_providers(&merged, &[Provider::OpenCode]).is_empty());
    }

    #[test]
    fn test_compute_totals() {
        let merged = merge_daily(&sample_sources());
        let totals = compute_totals(&merged);

        assert_eq!(totals.total_tokens, 465);
        assert!((totals.cost - 3.5).abs() < 1e-9);
        assert_eq!(totals.active_days, 2);
        assert_eq!(totals.first_date, Some(date("2025-05-01")));
        assert_eq!(totals.last_date, Some(date("2025-05-03")));
        assert!((totals.avg_cost_per_day - 1.75).abs() < 1e-9);
        assert_eq!(totals.longest_streak, 1);
        assert_eq!(totals.current_streak, 1);
    }

    #[test]
    fn test_compute_totals_empty() {
        let totals = compute_totals(&[]);
        assert_eq!(totals, UsageTotals::default());
    }

    #[test]
    fn test_streaks() {
        let sources = vec![(
            Provider::Claude,
            ["2025-05-01", "2025-05-02", "2025-05-03", "2025-05-05", "2025-05-06"]
                .iter()
                .map(|d| create_test_record(d, 1, 1, 0.1, &[]))
                .collect(),
        )];
        let merged = merge_daily(&sources);
        let totals = compute_totals(&merged);

        assert_eq!(totals.longest_streak, 3);
        assert_eq!(totals.current_streak, 2);
    }

    #[test]
    fn test_current_streak_broken_by_idle_last_day() {
        let mut merged = merge_daily(&[(
            Provider::Claude,
            vec![create_test_record("2025-05-01", 1, 1, 0.1, &[])],
        )]);
        merged.push(MergedDay::empty(date("2025-05-02")));

        let totals = compute_totals(&merged);
        assert_eq!(totals.longest_streak, 1);
        assert_eq!(totals.current_streak, 0);
        assert_eq!(totals.active_days, 1);
    }

    #[test]
    fn test_provider_totals() {
        let merged = merge_daily(&sample_sources());
        let totals = provider_totals(&merged);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].provider, Provider::Claude);
        assert_eq!(totals[0].active_days, 2);
        assert!((totals[0].cost_share - 85.71).abs() < 1e-9);
        assert!((totals[1].cost_share - 14.29).abs() < 1e-9);
    }

    #[test]
    fn test_provider_totals_zero_cost() {
        let merged = merge_daily(&[(
            Provider::Gemini,
            vec![create_test_record("2025-05-01", 10, 10, 0.0, &[])],
        )]);
        let totals = provider_totals(&merged);
        assert_eq!(totals[0].cost_share, 0.0);
        assert_eq!(totals[0].token_share, 100.0);
    }

    #[test]
    fn test_provider_totals_saturate() {
        let merged = merge_daily(&[
            (
                Provider::Claude,
                vec![create_test_record("2025-05-01", u64::MAX, 0, 1.0, &[])],
            ),
            (
                Provider::Codex,
                vec![create_test_record("2025-05-02", u64::MAX, 0, 1.0, &[])],
            ),
        ]);
        let totals = provider_totals(&merged);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].total_tokens, u64::MAX);
        assert_eq!(totals[0].token_share, 100.0);
    }

    #[test]
    fn test_fill_calendar() {
        let merged = merge_daily(&sample_sources());
        let dense = fill_calendar(&merged);

        assert_eq!(dense.len(), 3);
        assert_eq!(dense[1].date, date("2025-05-02"));
        assert!(!dense[1].is_active());
        assert_eq!(dense[2].total_tokens, 300);
        assert!(fill_calendar(&[]).is_empty());
    }
}
