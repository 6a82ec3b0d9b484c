use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activity summary as consumed by the aggregator.
///
/// Built from the loosely-typed JSON the activity source hands over. Only the
/// start timestamp is mandatory; each numeric field is optional so a record
/// missing one of them still contributes to the metrics that do not need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
  pub started_at: DateTime<Utc>,
  /// Average speed in m/s
  pub average_speed: Option<f64>,
  /// Distance in meters
  pub distance: Option<f64>,
  /// Total elevation gain in meters
  pub elevation_gain: Option<f64>,
  pub activity_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
  #[error("Activity record is not a JSON object")]
  NotAnObject,

  #[error("Missing field: {0}")]
  MissingField(&'static str),

  #[error("Invalid timestamp: {0}")]
  InvalidTimestamp(String),
}

impl ActivityRecord {
  /// Parse a raw activity (Strava activity summary keys)
  pub fn from_raw(raw: &Value) -> Result<Self, RecordError> {
    let obj = raw.as_object().ok_or(RecordError::NotAnObject)?;

    let start = obj
      .get("start_date")
      .and_then(Value::as_str)
      .ok_or(RecordError::MissingField("start_date"))?;
    let started_at = parse_timestamp(start)?;

    // Wrong-typed numbers count as absent for the metrics that need them
    let number = |key: &str| obj.get(key).and_then(Value::as_f64).filter(|v| v.is_finite());

    let activity_type = obj
      .get("type")
      .or_else(|| obj.get("sport_type"))
      .and_then(Value::as_str)
      .map(String::from);

    Ok(Self {
      started_at,
      average_speed: number("average_speed"),
      distance: number("distance"),
      elevation_gain: number("total_elevation_gain"),
      activity_type,
    })
  }

  /// Speed in km/h paired with distance in km
  pub fn speed_kmh(&self) -> Option<(f64, f64)> {
    Some((self.average_speed? * 3.6, self.distance_km()?))
  }

  /// Distance in km, used as both value and distance
  pub fn distance_point(&self) -> Option<(f64, f64)> {
    let km = self.distance_km()?;
    Some((km, km))
  }

  /// Elevation gain in meters paired with distance in km
  pub fn elevation_m(&self) -> Option<(f64, f64)> {
    Some((self.elevation_gain?, self.distance_km()?))
  }

  /// Pace in min/km paired with distance in km. Undefined for a standing start.
  pub fn pace_min_per_km(&self) -> Option<(f64, f64)> {
    let speed = self.average_speed.filter(|s| *s > 0.0)?;
    let pace = (1000.0 / speed) / 60.0;
    Some((pace, self.distance_km()?))
  }

  fn distance_km(&self) -> Option<f64> {
    self.distance.map(|m| m / 1000.0)
  }
}

/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS` (read as UTC)
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RecordError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }

  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
    .map(|naive| naive.and_utc())
    .map_err(|_| RecordError::InvalidTimestamp(s.to_string()))
}
