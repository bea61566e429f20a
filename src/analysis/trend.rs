//! Linear-regression trend lines and smoothing.

use crate::analysis::aggregator::fill_calendar;
use crate::models::{MergedDay, Metric, SeriesPoint, TrendDirection, TrendLine, TrendPoint};

/// Slopes smaller than this fraction of the mean daily value count as flat.
const FLAT_SLOPE_RATIO: f64 = 0.01;

/// Fit `y = slope * x + intercept` through a daily slice.
///
/// `x` is the number of calendar days since the first date, so missing days
/// stretch the line rather than compressing it. Returns `None` for fewer
/// than two points.
pub fn linear_trend(slice: &[MergedDay], metric: Metric) -> Option<TrendLine> {
    if slice.len() < 2 {
        return None;
    }

    let mut days: Vec<&MergedDay> = slice.iter().collect();
    days.sort_by_key(|d| d.date);
    let first = days[0].date;

    let points: Vec<(f64, f64)> = days
        .iter()
        .map(|d| ((d.date - first).num_days() as f64, metric.value(d)))
        .collect();

    let (slope, intercept, r_squared) = linear_regression(&points);

    let n = points.len() as f64;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let direction = if slope.abs() <= FLAT_SLOPE_RATIO * mean_y.abs() {
        TrendDirection::Flat
    } else if slope > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    let trend_points = days
        .iter()
        .zip(&points)
        .map(|(day, (x, y))| TrendPoint {
            date: day.date,
            actual: *y,
            fitted: slope * x + intercept,
        })
        .collect();

    Some(TrendLine {
        metric,
        slope,
        intercept,
        r_squared,
        direction,
        points: trend_points,
    })
}

/// Least squares over `(x, y)` points.
///
/// Returns `(slope, intercept, r_squared)`. When every x is equal the line
/// is flat at the mean.
fn linear_regression(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.0).sum();
    let sum_y: f64 = points.iter().map(|p| p.1).sum();
    let sum_xx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = points.iter().map(|p| p.0 * p.1).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    let (slope, intercept) = if denominator.abs() < f64::EPSILON {
        (0.0, sum_y / n)
    } else {
        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        (slope, (sum_y - slope * sum_x) / n)
    };

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (slope * p.0 + intercept)).powi(2))
        .sum();

    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    } else {
        0.0
    };

    (slope, intercept, r_squared)
}

/// Trailing mean over the gap-filled calendar.
///
/// The first `window - 1` points average whatever days are available.
pub fn moving_average(slice: &[MergedDay], metric: Metric, window: usize) -> Vec<SeriesPoint> {
    if window == 0 {
        return Vec::new();
    }

    let dense = fill_calendar(slice);
    let values: Vec<f64> = dense.iter().map(|d| metric.value(d)).collect();

    dense
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let start = (i + 1).saturating_sub(window);
            let span = &values[start..=i];
            SeriesPoint {
                date: day.date,
                value: span.iter().sum::<f64>() / span.len() as f64,
            }
        })
        .collect()
}
