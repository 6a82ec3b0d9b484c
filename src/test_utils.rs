//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Test fixtures
//! - Helper assertions

use crate::models::{ActivityRecord, TimeSeriesPoint};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed the activity cache with `count` fixture activities
pub async fn seed_test_activities(pool: &SqlitePool, count: usize) -> Vec<Value> {
  let activities = mock_raw_activities(count);
  crate::db::replace_activities(pool, &activities)
    .await
    .expect("Failed to seed activities");
  activities
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Fixed "today" that all fixtures are dated against
pub fn test_today() -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date")
}

/// Raw Strava-style activities, newest first, one per day ending on `test_today()`.
/// Speed and distance rise steadily towards the newest activity.
pub fn mock_raw_activities(count: usize) -> Vec<Value> {
  mock_raw_activities_ending(test_today(), count)
}

/// Same fixtures dated against an arbitrary last day
pub fn mock_raw_activities_ending(last_day: NaiveDate, count: usize) -> Vec<Value> {
  (0..count)
    .map(|i| {
      let day = last_day - Duration::days(i as i64);
      let started_at = day.and_hms_opt(7, 0, 0).expect("valid time").and_utc();
      json!({
        "id": 1000 + i,
        "name": format!("Run {}", i),
        "type": "Run",
        "start_date": started_at.to_rfc3339(),
        "average_speed": 3.5 - 0.1 * i as f64,
        "distance": 10000.0 - 400.0 * i as f64,
        "total_elevation_gain": 50.0 + 5.0 * i as f64,
      })
    })
    .collect()
}

/// Create a typed activity record for testing
pub fn mock_activity_record(
  started_at: DateTime<Utc>,
  average_speed: Option<f64>,
  distance: Option<f64>,
  elevation_gain: Option<f64>,
) -> ActivityRecord {
  ActivityRecord {
    started_at,
    average_speed,
    distance,
    elevation_gain,
    activity_type: Some("Run".to_string()),
  }
}

/// One point per consecutive day, oldest first, ending on `test_today()`
pub fn series_from_values(values: &[f64]) -> Vec<TimeSeriesPoint> {
  let n = values.len() as i64;
  values
    .iter()
    .enumerate()
    .map(|(i, &value)| point_days_ago(n - 1 - i as i64, value))
    .collect()
}

pub fn point_days_ago(days: i64, value: f64) -> TimeSeriesPoint {
  TimeSeriesPoint {
    timestamp: fixture_datetime_days_ago(days),
    value,
    distance: 5.0,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

pub fn datetime_on(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(year, month, day, hour, 0, 0)
    .single()
    .expect("valid datetime")
}

/// 07:00 UTC on the day N days before `test_today()`
pub fn fixture_datetime_days_ago(days: i64) -> DateTime<Utc> {
  let day = test_today() - Duration::days(days);
  day.and_hms_opt(7, 0, 0).expect("valid time").and_utc()
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('activities', 'sync_state')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_activities_returns_correct_count() {
    let pool = setup_test_db().await;

    let seeded = seed_test_activities(&pool, 5).await;
    assert_eq!(seeded.len(), 5);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activities")
      .fetch_one(&pool)
      .await
      .expect("Failed to count activities");

    assert_eq!(count, 5);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let raw = mock_raw_activities(3);
    assert_eq!(raw.len(), 3);
    for value in &raw {
      assert!(ActivityRecord::from_raw(value).is_ok());
    }

    let series = series_from_values(&[1.0, 2.0, 3.0]);
    assert!(series[0].timestamp < series[2].timestamp);
    assert_eq!(series[2].day(), test_today());
  }
}
