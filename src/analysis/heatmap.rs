//! Calendar heatmap bucketing.
//!
//! Produces a GitHub-style grid: one column per week, one row per weekday.

use crate::models::{Heatmap, HeatmapCell, HeatmapWeek, MergedDay, Metric, WeekStart};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Number of non-zero intensity levels.
const LEVELS: f64 = 4.0;

/// Build a weekly calendar grid for a slice.
///
/// Slots before the first date or after the last date are `None`; days in
/// range without usage are zero-valued cells.
pub fn build_heatmap(slice: &[MergedDay], metric: Metric, week_start: WeekStart) -> Heatmap {
    let mut values: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for day in slice {
        *values.entry(day.date).or_default() += metric.value(day);
    }

    let max_value = values.values().copied().fold(0.0_f64, f64::max);

    let mut heatmap = Heatmap {
        metric,
        week_start,
        max_value,
        weeks: Vec::new(),
    };

    let (Some(first), Some(last)) = (
        values.keys().next().copied(),
        values.keys().next_back().copied(),
    ) else {
        return heatmap;
    };

    let last_week = week_start.start_of_week(last);
    let mut week = week_start.start_of_week(first);

    while week <= last_week {
        let days = (0..7u64)
            .map(|offset| {
                let date = week.checked_add_days(Days::new(offset))?;
                if date < first || date > last {
                    return None;
                }
                let value = values.get(&date).copied().unwrap_or(0.0);
                Some(HeatmapCell {
                    date,
                    value,
                    level: intensity_level(value, max_value),
                })
            })
            .collect();

        heatmap.weeks.push(HeatmapWeek { start: week, days });

        match week.checked_add_days(Days::new(7)) {
            Some(next) => week = next,
            None => break,
        }
    }

    heatmap
}

/// Bucket a value into 0..=4 relative to the maximum.
pub fn intensity_level(value: f64, max: f64) -> u8 {
    if value <= 0.0 || max <= 0.0 {
        return 0;
    }
    ((LEVELS * value / max).ceil() as u8).clamp(1, 4)
}
