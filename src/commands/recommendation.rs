use super::{load_snapshot, today};
use crate::db::AppState;
use crate::models::{EnhancedRecommendation, MetricKind, TimeRange};
use crate::requests::RequestOutcome;
use tokio_util::sync::CancellationToken;

/// Enhanced advice for one chart.
///
/// Generator failures come back as a delivered fallback. Only a superseded or
/// cancelled request yields no recommendation.
pub async fn get_enhanced_recommendation(
  state: &AppState,
  metric: MetricKind,
  range: TimeRange,
  cancel: &CancellationToken,
) -> Result<RequestOutcome<EnhancedRecommendation>, String> {
  let snapshot = load_snapshot(state).await;
  Ok(state.advisor.enhanced(&snapshot, metric, range, today(), cancel).await)
}
