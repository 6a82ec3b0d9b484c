//! Metric aggregation
//!
//! Turns the raw activity list into per-metric daily series and the joined
//! performance trend series. Everything here is a pure function of its input:
//! recomputing from the same records gives identical output.

use crate::models::{ActivityRecord, PerformanceTrendPoint, TimeSeriesPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Weights of the performance index
const SPEED_WEIGHT: f64 = 0.4;
const DISTANCE_WEIGHT: f64 = 0.6;

/// Picks `(value, distance)` for one metric out of a record
pub type MetricSelector = fn(&ActivityRecord) -> Option<(f64, f64)>;

/// ---------------------------------------------------------------------------
/// Series Construction
/// ---------------------------------------------------------------------------

/// One point per record that yields a value, in input order.
/// Same-day activities are kept as separate points.
pub fn build_series(records: &[ActivityRecord], selector: MetricSelector) -> Vec<TimeSeriesPoint> {
  records
    .iter()
    .filter_map(|record| {
      selector(record).map(|(value, distance)| TimeSeriesPoint {
        timestamp: record.started_at,
        value,
        distance,
      })
    })
    .collect()
}

/// Join speed, distance and elevation on calendar day.
///
/// Only days present in all three series produce a point. Multiple points on
/// one day collapse to the last one in source order. The emitted `distance` is
/// the distance series' `value` field. Sorted ascending by day.
pub fn build_trend_series(
  speed: &[TimeSeriesPoint],
  distance: &[TimeSeriesPoint],
  elevation: &[TimeSeriesPoint],
) -> Vec<PerformanceTrendPoint> {
  let speed_by_day = values_by_day(speed);
  let elevation_by_day = values_by_day(elevation);

  // BTreeMap keyed by day: last write wins and iteration is already sorted
  let distance_by_day: BTreeMap<NaiveDate, f64> =
    distance.iter().map(|p| (p.day(), p.value)).collect();

  distance_by_day
    .into_iter()
    .filter_map(|(day, distance)| {
      let speed = *speed_by_day.get(&day)?;
      let elevation = *elevation_by_day.get(&day)?;
      Some(PerformanceTrendPoint {
        day,
        speed,
        distance,
        elevation,
        performance_index: performance_index(speed, distance),
      })
    })
    .collect()
}

pub fn performance_index(speed: f64, distance: f64) -> f64 {
  SPEED_WEIGHT * speed + DISTANCE_WEIGHT * distance
}

fn values_by_day(series: &[TimeSeriesPoint]) -> HashMap<NaiveDate, f64> {
  series.iter().map(|p| (p.day(), p.value)).collect()
}

/// ---------------------------------------------------------------------------
/// Snapshot
/// ---------------------------------------------------------------------------

/// Every derived series for one activity snapshot.
///
/// Replaced wholesale on each recompute; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
  pub speed: Vec<TimeSeriesPoint>,
  pub distance: Vec<TimeSeriesPoint>,
  pub elevation: Vec<TimeSeriesPoint>,
  pub pace: Vec<TimeSeriesPoint>,
  pub trend: Vec<PerformanceTrendPoint>,
  /// Records that parsed, whatever metrics they contribute to
  pub parsed: usize,
  /// Raw records rejected at parse time
  pub rejected: usize,
}

impl MetricSnapshot {
  /// Parse raw activities and derive every series
  pub fn compute(raw: &[Value]) -> Self {
    let mut records = Vec::with_capacity(raw.len());
    let mut rejected = 0;

    for (index, value) in raw.iter().enumerate() {
      match ActivityRecord::from_raw(value) {
        Ok(record) => records.push(record),
        Err(e) => {
          rejected += 1;
          tracing::debug!(index, error = %e, "Skipping activity record");
        }
      }
    }

    Self {
      rejected,
      ..Self::from_records(&records)
    }
  }

  pub fn from_records(records: &[ActivityRecord]) -> Self {
    let speed = build_series(records, ActivityRecord::speed_kmh);
    let distance = build_series(records, ActivityRecord::distance_point);
    let elevation = build_series(records, ActivityRecord::elevation_m);
    let pace = build_series(records, ActivityRecord::pace_min_per_km);
    let trend = build_trend_series(&speed, &distance, &elevation);

    Self {
      speed,
      distance,
      elevation,
      pace,
      trend,
      parsed: records.len(),
      rejected: 0,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.speed.is_empty()
      && self.distance.is_empty()
      && self.elevation.is_empty()
      && self.pace.is_empty()
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
