use crate::db::{record_sync, replace_activities, AppState};
use crate::source::ActivitySource;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
  pub fetched: usize,
  /// False when the source failed and the previous cache was kept
  pub stored: bool,
}

/// Pull the current activity list from `source` and make it the cached snapshot
pub async fn sync_activities(state: &AppState, source: &dyn ActivitySource) -> Result<SyncResult, String> {
  let activities = match source.list_recent_activities().await {
    Ok(activities) => activities,
    Err(e) => {
      tracing::warn!(source = source.name(), error = %e, "Sync failed, keeping cached activities");
      return Ok(SyncResult {
        fetched: 0,
        stored: false,
      });
    }
  };

  let stored = replace_activities(&state.db, &activities)
    .await
    .map_err(|e| format!("Failed to store activities: {}", e))?;

  record_sync(&state.db, source.name(), stored)
    .await
    .map_err(|e| format!("Failed to record sync: {}", e))?;

  tracing::info!(source = source.name(), fetched = stored, "Sync complete");

  Ok(SyncResult {
    fetched: stored,
    stored: true,
  })
}
