use crate::recommendation::RecommendationService;
use crate::source::{ActivitySource, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub type DbPool = SqlitePool;

/// Application state shared by the presentation commands
pub struct AppState {
  pub db: DbPool,
  pub advisor: RecommendationService,
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
  tracing::info!(url = database_url, "Initializing database");

  // Create connection pool
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(database_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}

/// ---------------------------------------------------------------------------
/// Activity Cache
/// ---------------------------------------------------------------------------

/// Replace the cached snapshot with `activities`, keeping their order
pub async fn replace_activities(db: &DbPool, activities: &[Value]) -> Result<usize, sqlx::Error> {
  let mut tx = db.begin().await?;

  sqlx::query("DELETE FROM activities").execute(&mut *tx).await?;

  for (position, activity) in activities.iter().enumerate() {
    sqlx::query("INSERT INTO activities (position, raw_json) VALUES (?1, ?2)")
      .bind(position as i64)
      .bind(activity.to_string())
      .execute(&mut *tx)
      .await?;
  }

  tx.commit().await?;
  Ok(activities.len())
}

/// Cached activities in stored order. Rows that no longer parse are skipped.
pub async fn load_activities(db: &DbPool) -> Result<Vec<Value>, sqlx::Error> {
  let rows: Vec<(i64, String)> =
    sqlx::query_as("SELECT position, raw_json FROM activities ORDER BY position ASC")
      .fetch_all(db)
      .await?;

  Ok(
    rows
      .into_iter()
      .filter_map(|(position, raw)| match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
          tracing::warn!(position, error = %e, "Skipping unreadable cached activity");
          None
        }
      })
      .collect(),
  )
}

/// Most recent completed sync
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
  pub source: String,
  pub last_sync_at: DateTime<Utc>,
  pub activity_count: i64,
}

/// Record a completed sync for `source`
pub async fn record_sync(db: &DbPool, source: &str, activity_count: usize) -> Result<(), sqlx::Error> {
  sqlx::query(
    r#"
    INSERT INTO sync_state (source, last_sync_at, activity_count)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(source) DO UPDATE SET
      last_sync_at = excluded.last_sync_at,
      activity_count = excluded.activity_count
    "#,
  )
  .bind(source)
  .bind(Utc::now())
  .bind(activity_count as i64)
  .execute(db)
  .await?;

  Ok(())
}

/// The sync that produced the current cache, if any
pub async fn latest_sync(db: &DbPool) -> Result<Option<SyncStatus>, sqlx::Error> {
  let row: Option<(String, DateTime<Utc>, i64)> = sqlx::query_as(
    "SELECT source, last_sync_at, activity_count FROM sync_state
     WHERE last_sync_at IS NOT NULL
     ORDER BY last_sync_at DESC LIMIT 1",
  )
  .fetch_optional(db)
  .await?;

  Ok(row.map(|(source, last_sync_at, activity_count)| SyncStatus {
    source,
    last_sync_at,
    activity_count,
  }))
}

/// Serves the last synced snapshot from SQLite
pub struct CachedActivitySource {
  db: DbPool,
}

impl CachedActivitySource {
  pub fn new(db: DbPool) -> Self {
    Self { db }
  }
}

#[async_trait]
impl ActivitySource for CachedActivitySource {
  fn name(&self) -> &'static str {
    "cache"
  }

  async fn list_recent_activities(&self) -> Result<Vec<Value>, SyncError> {
    Ok(load_activities(&self.db).await?)
  }
}
