//! Model-usage distribution.

use crate::analysis::aggregator::share;
use crate::models::{MergedDay, ModelShare};
use std::collections::{BTreeMap, BTreeSet};

/// Label for the grouped tail of the distribution.
pub const OTHER_LABEL: &str = "Other";

#[derive(Default)]
struct ModelAccumulator {
    tokens: u64,
    cost: f64,
    days: usize,
}

/// Per-model totals with pie-chart percentages.
///
/// Percentages are by tokens when any model has token data, otherwise by
/// days used. With `top_n > 0`, models beyond the first `top_n` are folded
/// into a single "Other" entry.
pub fn model_distribution(slice: &[MergedDay], top_n: usize) -> Vec<ModelShare> {
    let mut acc: BTreeMap<String, ModelAccumulator> = BTreeMap::new();

    for day in slice {
        let mut seen: BTreeSet<&str> = day.models.iter().map(String::as_str).collect();

        for usage in &day.breakdowns {
            let entry = acc.entry(usage.model.clone()).or_default();
            entry.tokens = entry.tokens.saturating_add(usage.tokens.total());
            entry.cost += usage.cost;
            seen.insert(usage.model.as_str());
        }

        for model in seen {
            acc.entry(model.to_string()).or_default().days += 1;
        }
    }

    let mut models: Vec<(String, ModelAccumulator)> = acc.into_iter().collect();
    models.sort_by(|a, b| {
        b.1.tokens
            .cmp(&a.1.tokens)
            .then_with(|| b.1.days.cmp(&a.1.days))
            .then_with(|| a.0.cmp(&b.0))
    });

    if top_n > 0 && models.len() > top_n {
        let tail = models.split_off(top_n);
        let mut other = ModelAccumulator::default();
        for (_, m) in tail {
            other.tokens = other.tokens.saturating_add(m.tokens);
            other.cost += m.cost;
            other.days += m.days;
        }
        models.push((OTHER_LABEL.to_string(), other));
    }

    let by_tokens = models.iter().any(|(_, m)| m.tokens > 0);
    let whole: f64 = if by_tokens {
        models.iter().map(|(_, m)| m.tokens as f64).sum()
    } else {
        models.iter().map(|(_, m)| m.days as f64).sum()
    };

    models
        .into_iter()
        .map(|(model, m)| {
            let part = if by_tokens {
                m.tokens as f64
            } else {
                m.days as f64
            };
            ModelShare {
                model,
                total_tokens: m.tokens,
                cost: m.cost,
                days: m.days,
                percentage: share(part, whole),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelUsage, TokenCounts};
    use chrono::NaiveDate;

    fn day(s: &str, models: &[&str], breakdowns: &[(&str, u64, f64)]) -> MergedDay {
        let mut d = MergedDay::empty(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());
        d.models = models.iter().map(|m| m.to_string()).collect();
        d.breakdowns = breakdowns
            .iter()
            .map(|(model, tokens, cost)| ModelUsage {
                model: model.to_string(),
                tokens: TokenCounts {
                    output_tokens: *tokens,
                    ..Default::default()
                },
                cost: *cost,
            })
            .collect();
        d
    }

    #[test]
    fn test_distribution_by_tokens() {
        let slice = vec![
            day("2025-01-01", &["opus", "sonnet"], &[("opus", 300, 3.0), ("sonnet", 100, 0.5)]),
            day("2025-01-02", &["sonnet"], &[("sonnet", 600, 1.5)]),
        ];
        let dist = model_distribution(&slice, 0);

        assert_eq!(dist.len(), 2);
        assert_eq!(dist[0].model, "sonnet");
        assert_eq!(dist[0].total_tokens, 700);
        assert_eq!(dist[0].days, 2);
        assert_eq!(dist[0].percentage, 70.0);
        assert_eq!(dist[1].model, "opus");
        assert_eq!(dist[1].percentage, 30.0);
        assert!((dist[1].cost - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_falls_back_to_days_without_breakdowns() {
        let slice = vec![
            day("2025-01-01", &["gemini-2.5-pro"], &[]),
            day("2025-01-02", &["gemini-2.5-pro", "gemini-2.5-flash"], &[]),
            day("2025-01-03", &["gemini-2.5-pro"], &[]),
        ];
        let dist = model_distribution(&slice, 0);

        assert_eq!(dist[0].model, "gemini-2.5-pro");
        assert_eq!(dist[0].days, 3);
        assert_eq!(dist[0].percentage, 75.0);
        assert_eq!(dist[1].percentage, 25.0);
    }

    #[test]
    fn test_top_n_groups_other() {
        let slice = vec![day(
            "2025-01-01",
            &[],
            &[("a", 50, 0.0), ("b", 30, 0.0), ("c", 15, 0.0), ("d", 5, 0.0)],
        )];
        let dist = model_distribution(&slice, 2);

        assert_eq!(dist.len(), 3);
        assert_eq!(dist[2].model, OTHER_LABEL);
        assert_eq!(dist[2].total_tokens, 20);
        assert_eq!(dist[2].days, 2);
        assert_eq!(dist[2].percentage, 20.0);
        let sum: f64 = dist.iter().map(|m| m.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_n_not_applied_when_short() {
        let slice = vec![day("2025-01-01", &[], &[("a", 1, 0.0)])];
        let dist = model_distribution(&slice, 5);
        assert_eq!(dist.len(), 1);
        assert_eq!(dist[0].percentage, 100.0);
    }

    #[test]
    fn test_empty() {
        assert!(model_distribution(&[], 3).is_empty());
    }
}
