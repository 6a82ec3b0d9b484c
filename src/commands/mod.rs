pub mod dashboard;
pub mod recommendation;
pub mod sync;

pub use dashboard::{classify_trend, get_dashboard, get_filtered_series, get_local_recommendation};
pub use recommendation::get_enhanced_recommendation;
pub use sync::sync_activities;

use crate::aggregation::MetricSnapshot;
use crate::db::{AppState, CachedActivitySource};
use crate::source::load_or_empty;
use chrono::{NaiveDate, Utc};

/// Recompute a fresh snapshot from the cached activities.
/// An unreadable cache counts as no data.
pub(crate) async fn load_snapshot(state: &AppState) -> MetricSnapshot {
  let cache = CachedActivitySource::new(state.db.clone());
  MetricSnapshot::compute(&load_or_empty(&cache).await)
}

/// Windows are anchored on the current UTC day
pub(crate) fn today() -> NaiveDate {
  Utc::now().date_naive()
}
