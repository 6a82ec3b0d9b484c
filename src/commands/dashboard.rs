use super::{load_snapshot, today};
use crate::aggregation::MetricSnapshot;
use crate::db::{latest_sync, AppState, SyncStatus};
use crate::models::{MetricKind, PerformanceTrendPoint, Recommendation, TimeRange, TimeSeriesPoint, TrendVerdict};
use crate::recommendation::RecommendationService;
use crate::trends::{classify_snapshot, filter_trend_window, filter_window, series_for};
use chrono::NaiveDate;
use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Chart Data
/// ---------------------------------------------------------------------------

/// What a chart plots for one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum SeriesView {
  Points(Vec<TimeSeriesPoint>),
  Trend(Vec<PerformanceTrendPoint>),
}

impl SeriesView {
  pub fn len(&self) -> usize {
    match self {
      SeriesView::Points(points) => points.len(),
      SeriesView::Trend(points) => points.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

pub fn filtered_series(snapshot: &MetricSnapshot, metric: MetricKind, range: TimeRange, today: NaiveDate) -> SeriesView {
  match metric {
    MetricKind::Performance => SeriesView::Trend(filter_trend_window(&snapshot.trend, range, today)),
    _ => SeriesView::Points(filter_window(series_for(snapshot, metric), range, today)),
  }
}

pub async fn get_filtered_series(state: &AppState, metric: MetricKind, range: TimeRange) -> Result<SeriesView, String> {
  let snapshot = load_snapshot(state).await;
  Ok(filtered_series(&snapshot, metric, range, today()))
}

/// ---------------------------------------------------------------------------
/// Verdicts and Local Advice
/// ---------------------------------------------------------------------------

pub async fn classify_trend(state: &AppState, metric: MetricKind, range: TimeRange) -> Result<TrendVerdict, String> {
  let snapshot = load_snapshot(state).await;
  Ok(classify_snapshot(&snapshot, metric, range, today()))
}

pub async fn get_local_recommendation(
  state: &AppState,
  metric: MetricKind,
  range: TimeRange,
) -> Result<Recommendation, String> {
  let snapshot = load_snapshot(state).await;
  Ok(state.advisor.local(&snapshot, metric, range, today()))
}

/// ---------------------------------------------------------------------------
/// Dashboard
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
  pub metric: MetricKind,
  pub unit: &'static str,
  pub points: usize,
  pub verdict: TrendVerdict,
  pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
  pub range: TimeRange,
  pub as_of: NaiveDate,
  /// Activities that parsed, including ones missing some metrics
  pub activities: usize,
  pub rejected: usize,
  /// Unset until the first successful sync
  pub last_sync: Option<SyncStatus>,
  pub metrics: Vec<MetricSummary>,
}

/// Every metric's verdict and template advice for one window
pub fn build_dashboard(
  advisor: &RecommendationService,
  snapshot: &MetricSnapshot,
  range: TimeRange,
  today: NaiveDate,
) -> Dashboard {
  let metrics = MetricKind::ALL
    .into_iter()
    .map(|metric| {
      let recommendation = advisor.local(snapshot, metric, range, today);
      MetricSummary {
        metric,
        unit: metric.unit(),
        points: filtered_series(snapshot, metric, range, today).len(),
        verdict: recommendation.verdict,
        recommendation,
      }
    })
    .collect();

  Dashboard {
    range,
    as_of: today,
    activities: snapshot.parsed,
    rejected: snapshot.rejected,
    last_sync: None,
    metrics,
  }
}

pub async fn get_dashboard(state: &AppState, range: TimeRange) -> Result<Dashboard, String> {
  let snapshot = load_snapshot(state).await;
  let last_sync = latest_sync(&state.db)
    .await
    .map_err(|e| format!("Failed to read sync state: {}", e))?;

  Ok(Dashboard {
    last_sync,
    ..build_dashboard(&state.advisor, &snapshot, range, today())
  })
}
