use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One activity's contribution to a metric series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
  pub timestamp: DateTime<Utc>,
  pub value: f64,
  /// Distance in km of the contributing activity
  pub distance: f64,
}

impl TimeSeriesPoint {
  /// Calendar day of the point (time of day discarded)
  pub fn day(&self) -> NaiveDate {
    self.timestamp.date_naive()
  }
}

/// Speed, distance and elevation joined on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTrendPoint {
  pub day: NaiveDate,
  pub speed: f64,
  pub distance: f64,
  pub elevation: f64,
  pub performance_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
  Speed,
  Distance,
  Elevation,
  /// Pace trend in min/km (lower is better)
  Pace,
  /// Consistency of pacing across the window
  PaceDistribution,
  /// Weighted index from the joined trend series
  Performance,
}

impl MetricKind {
  pub const ALL: [MetricKind; 6] = [
    MetricKind::Speed,
    MetricKind::Distance,
    MetricKind::Elevation,
    MetricKind::Pace,
    MetricKind::PaceDistribution,
    MetricKind::Performance,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      MetricKind::Speed => "speed",
      MetricKind::Distance => "distance",
      MetricKind::Elevation => "elevation",
      MetricKind::Pace => "pace",
      MetricKind::PaceDistribution => "pace_distribution",
      MetricKind::Performance => "performance",
    }
  }

  pub fn unit(&self) -> &'static str {
    match self {
      MetricKind::Speed => "km/h",
      MetricKind::Distance => "km",
      MetricKind::Elevation => "m",
      MetricKind::Pace | MetricKind::PaceDistribution => "min/km",
      MetricKind::Performance => "pts",
    }
  }
}

impl fmt::Display for MetricKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MetricKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    MetricKind::ALL
      .into_iter()
      .find(|k| k.as_str() == s.trim().to_lowercase())
      .ok_or_else(|| format!("Unknown metric: {}", s))
  }
}

/// Selected chart window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
  Week,
  #[default]
  Month,
  Year,
}

impl TimeRange {
  pub fn days(&self) -> i64 {
    match self {
      TimeRange::Week => 7,
      TimeRange::Month => 30,
      TimeRange::Year => 365,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      TimeRange::Week => "week",
      TimeRange::Month => "month",
      TimeRange::Year => "year",
    }
  }
}

impl FromStr for TimeRange {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "week" | "7" => Ok(TimeRange::Week),
      "month" | "30" => Ok(TimeRange::Month),
      "year" | "365" => Ok(TimeRange::Year),
      other => Err(format!("Unknown time range: {}", other)),
    }
  }
}
