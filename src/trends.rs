//! Trend classification
//!
//! Verdicts are recomputed on every call from the window-filtered series; no
//! state is kept between calls.

use crate::aggregation::MetricSnapshot;
use crate::models::{MetricKind, PerformanceTrendPoint, TimeRange, TimeSeriesPoint, TrendVerdict};
use chrono::{Duration, NaiveDate};

/// Number of most recent points compared by the percent-change rule
const TREND_WINDOW: usize = 3;

/// Percent change needed to call a direction
const DEFAULT_THRESHOLD_PCT: f64 = 5.0;
const ELEVATION_THRESHOLD_PCT: f64 = 10.0;

/// Pace standard deviation bands (min/km)
const CONSISTENT_PACE_STDDEV: f64 = 0.5;
const ERRATIC_PACE_STDDEV: f64 = 1.5;
const MIN_PACE_POINTS: usize = 3;

/// ---------------------------------------------------------------------------
/// Window Filter
/// ---------------------------------------------------------------------------

/// First calendar day of the window. `today` counts as one of its days.
pub fn window_start(range: TimeRange, today: NaiveDate) -> NaiveDate {
  today - Duration::days(range.days() - 1)
}

/// Points from the last `range.days()` calendar days, sorted ascending by
/// timestamp. The sort is stable so same-instant points keep source order.
pub fn filter_window(points: &[TimeSeriesPoint], range: TimeRange, today: NaiveDate) -> Vec<TimeSeriesPoint> {
  let cutoff = window_start(range, today);
  let mut filtered: Vec<TimeSeriesPoint> = points.iter().filter(|p| p.day() >= cutoff).copied().collect();
  filtered.sort_by_key(|p| p.timestamp);
  filtered
}

pub fn filter_trend_window(
  points: &[PerformanceTrendPoint],
  range: TimeRange,
  today: NaiveDate,
) -> Vec<PerformanceTrendPoint> {
  let cutoff = window_start(range, today);
  points.iter().filter(|p| p.day >= cutoff).copied().collect()
}

/// ---------------------------------------------------------------------------
/// Classification
/// ---------------------------------------------------------------------------

/// Classify an already-filtered series for one metric.
///
/// `Performance` is classified from the joined trend series instead; passing
/// it here treats the values as performance indices.
pub fn classify(series: &[TimeSeriesPoint], kind: MetricKind) -> TrendVerdict {
  let values: Vec<f64> = series.iter().map(|p| p.value).collect();
  classify_values(&values, kind)
}

pub fn classify_trend_points(points: &[PerformanceTrendPoint]) -> TrendVerdict {
  let values: Vec<f64> = points.iter().map(|p| p.performance_index).collect();
  classify_values(&values, MetricKind::Performance)
}

fn classify_values(values: &[f64], kind: MetricKind) -> TrendVerdict {
  match kind {
    MetricKind::PaceDistribution => classify_consistency(values),
    MetricKind::Elevation => classify_change(values, ELEVATION_THRESHOLD_PCT, false),
    // Falling pace means running faster
    MetricKind::Pace => classify_change(values, DEFAULT_THRESHOLD_PCT, true),
    MetricKind::Speed | MetricKind::Distance | MetricKind::Performance => {
      classify_change(values, DEFAULT_THRESHOLD_PCT, false)
    }
  }
}

/// Window the snapshot and classify in one step
pub fn classify_snapshot(
  snapshot: &MetricSnapshot,
  kind: MetricKind,
  range: TimeRange,
  today: NaiveDate,
) -> TrendVerdict {
  match kind {
    MetricKind::Performance => classify_trend_points(&filter_trend_window(&snapshot.trend, range, today)),
    _ => classify(&filter_window(series_for(snapshot, kind), range, today), kind),
  }
}

/// Raw series backing a point-based metric
pub fn series_for(snapshot: &MetricSnapshot, kind: MetricKind) -> &[TimeSeriesPoint] {
  match kind {
    MetricKind::Speed => &snapshot.speed,
    MetricKind::Distance => &snapshot.distance,
    MetricKind::Elevation => &snapshot.elevation,
    MetricKind::Pace | MetricKind::PaceDistribution => &snapshot.pace,
    // Performance lives in the trend series
    MetricKind::Performance => &[],
  }
}

fn classify_change(values: &[f64], threshold_pct: f64, lower_is_better: bool) -> TrendVerdict {
  let recent = &values[values.len().saturating_sub(TREND_WINDOW)..];
  let (first, last) = match (recent.first(), recent.last()) {
    (Some(first), Some(last)) if recent.len() >= 2 => (*first, *last),
    _ => return TrendVerdict::InsufficientData,
  };

  let mut pct = percent_change(first, last);
  if lower_is_better {
    pct = -pct;
  }

  if pct > threshold_pct {
    TrendVerdict::Improvement
  } else if pct < -threshold_pct {
    TrendVerdict::Decline
  } else {
    TrendVerdict::Constant
  }
}

/// Relative change in percent; zero when the baseline is zero
pub fn percent_change(first: f64, last: f64) -> f64 {
  if first == 0.0 {
    return 0.0;
  }
  let pct = (last - first) / first * 100.0;
  if pct.is_finite() {
    pct
  } else {
    0.0
  }
}

fn classify_consistency(values: &[f64]) -> TrendVerdict {
  if values.len() < MIN_PACE_POINTS {
    return TrendVerdict::InsufficientData;
  }

  match population_std_dev(values) {
    sd if sd < CONSISTENT_PACE_STDDEV => TrendVerdict::Improvement,
    sd if sd > ERRATIC_PACE_STDDEV => TrendVerdict::Decline,
    _ => TrendVerdict::Constant,
  }
}

pub fn population_std_dev(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let n = values.len() as f64;
  let mean = values.iter().sum::<f64>() / n;
  let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
  variance.sqrt()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
