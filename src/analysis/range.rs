//! Trailing time-window filtering.
//!
//! Windows are anchored on the latest date present in the series, not on
//! today's date, so a stale export still shows its last week of activity.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::MergedDay;

/// Trailing window selectable on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    #[value(name = "7d")]
    Week,
    #[serde(rename = "1m")]
    #[value(name = "1m")]
    Month,
    #[default]
    #[serde(rename = "3m")]
    #[value(name = "3m")]
    Quarter,
    #[serde(rename = "6m")]
    #[value(name = "6m")]
    HalfYear,
    #[serde(rename = "1y")]
    #[value(name = "1y")]
    Year,
    #[serde(rename = "all")]
    #[value(name = "all")]
    All,
}

impl TimeRange {
    /// Exclusive lower bound for a window ending on `anchor`.
    ///
    /// Returns `None` when every date qualifies.
    pub fn cutoff(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeRange::Week => anchor.checked_sub_days(Days::new(7)),
            TimeRange::Month => anchor.checked_sub_months(Months::new(1)),
            TimeRange::Quarter => anchor.checked_sub_months(Months::new(3)),
            TimeRange::HalfYear => anchor.checked_sub_months(Months::new(6)),
            TimeRange::Year => anchor.checked_sub_months(Months::new(12)),
            TimeRange::All => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::Week => "Last 7 days",
            TimeRange::Month => "Last month",
            TimeRange::Quarter => "Last 3 months",
            TimeRange::HalfYear => "Last 6 months",
            TimeRange::Year => "Last year",
            TimeRange::All => "All time",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            TimeRange::Week => "7d",
            TimeRange::Month => "1m",
            TimeRange::Quarter => "3m",
            TimeRange::HalfYear => "6m",
            TimeRange::Year => "1y",
            TimeRange::All => "all",
        };
        write!(f, "{}", key)
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "7d" => Ok(TimeRange::Week),
            "1m" => Ok(TimeRange::Month),
            "3m" => Ok(TimeRange::Quarter),
            "6m" => Ok(TimeRange::HalfYear),
            "1y" | "12m" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            other => Err(format!(
                "Unknown time range '{}' (expected 7d, 1m, 3m, 6m, 1y or all)",
                other
            )),
        }
    }
}

/// Slice a merged series to the trailing window ending at its latest date.
pub fn filter_range(series: &[MergedDay], range: TimeRange) -> Vec<MergedDay> {
    let Some(anchor) = series.iter().map(|d| d.date).max() else {
        return Vec::new();
    };

    let mut slice: Vec<MergedDay> = match range.cutoff(anchor) {
        Some(cutoff) => series.iter().filter(|d| d.date > cutoff).cloned().collect(),
        None => series.to_vec(),
    };

    slice.sort_by_key(|d| d.date);
    slice
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(dates: &[&str]) -> Vec<MergedDay> {
        dates.iter().map(|d| MergedDay::empty(date(d))).collect()
    }

    fn dates_of(slice: &[MergedDay]) -> Vec<String> {
        slice.iter().map(|d| d.date.to_string()).collect()
    }

    #[test]
    fn test_parse_and_display() {
        for key in ["7d", "1m", "3m", "6m", "1y", "all"] {
            let range: TimeRange = key.parse().unwrap();
            assert_eq!(range.to_string(), key);
        }
        assert_eq!("ALL".parse::<TimeRange>(), Ok(TimeRange::All));
        assert!("2w".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_week_is_seven_days_inclusive() {
        let s = series(&[
            "2025-05-24",
            "2025-05-25",
            "2025-05-26",
            "2025-05-31",
        ]);
        let slice = filter_range(&s, TimeRange::Week);
        assert_eq!(dates_of(&slice), vec!["2025-05-25", "2025-05-26", "2025-05-31"]);
    }

    #[test]
    fn test_anchor_is_latest_date_not_today() {
        let s = series(&["2020-01-01", "2020-01-05"]);
        let slice = filter_range(&s, TimeRange::Week);
        assert_eq!(slice.len(), 2);
    }

    #[test]
    fn test_month_clamps_to_month_end() {
        let s = series(&["2025-02-28", "2025-03-01", "2025-03-31"]);
        let slice = filter_range(&s, TimeRange::Month);
        // 2025-03-31 minus one month clamps to 2025-02-28, which is excluded.
        assert_eq!(dates_of(&slice), vec!["2025-03-01", "2025-03-31"]);
    }

    #[test]
    fn test_year_and_all() {
        let s = series(&["2023-06-01", "2024-06-01", "2024-06-02", "2025-06-01"]);
        assert_eq!(
            dates_of(&filter_range(&s, TimeRange::Year)),
            vec!["2024-06-02", "2025-06-01"]
        );
        assert_eq!(filter_range(&s, TimeRange::All).len(), 4);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let s = series(&["2025-05-31", "2025-05-29", "2025-05-30"]);
        let slice = filter_range(&s, TimeRange::All);
        assert_eq!(dates_of(&slice), vec!["2025-05-29", "2025-05-30", "2025-05-31"]);
    }

    #[test]
    fn test_empty_series() {
        assert!(filter_range(&[], TimeRange::Quarter).is_empty());
    }
}
