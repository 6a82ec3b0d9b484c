//! Recommendation assembly
//!
//! The local path is a fixed template table keyed by (verdict, metric). The
//! enhanced path asks a text generator for advice and always falls back to the
//! local path when that fails.

use crate::aggregation::MetricSnapshot;
use crate::config::LlmConfig;
use crate::llm::{AdviceRequest, ClaudeClient, LlmError, TextGenerator};
use crate::models::{
  AdviceSource, EnhancedRecommendation, MetricKind, PerformanceTrendPoint, Recommendation, TimeRange,
  TimeSeriesPoint, TrendVerdict,
};
use crate::requests::{RequestOutcome, RequestRegistry};
use crate::trends::{classify_snapshot, filter_trend_window, filter_window, series_for};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Most recent points included in the prompt
const PROMPT_POINTS: usize = 5;

const COACH_SYSTEM_PROMPT: &str = "You are an experienced endurance running coach. \
You receive a short summary of an athlete's recent activities for one metric and \
the trend computed from them. Reply with two or three plain sentences of concrete, \
encouraging advice. Do not use markdown or lists, and do not repeat the numbers back.";

#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
  #[error("No data available")]
  NoDataAvailable,

  #[error("External service failure: {0}")]
  External(#[from] LlmError),
}

/// ---------------------------------------------------------------------------
/// Template Table
/// ---------------------------------------------------------------------------

/// Local advice for a verdict and metric. Pure lookup.
pub fn recommend(verdict: TrendVerdict, metric: MetricKind) -> Recommendation {
  let (headline, advice) = template(verdict, metric);
  Recommendation {
    verdict,
    metric,
    headline: headline.to_string(),
    advice: advice.to_string(),
  }
}

fn template(verdict: TrendVerdict, metric: MetricKind) -> (&'static str, &'static str) {
  use MetricKind::*;
  use TrendVerdict::*;

  match (metric, verdict) {
    (Speed, Improvement) => (
      "You're getting faster",
      "Your average speed is climbing. Keep most runs easy so the extra speed comes from fitness, not fatigue.",
    ),
    (Speed, Decline) => (
      "Speed is slipping",
      "Your recent runs are slower. Check sleep and recovery, and add one short session of strides this week.",
    ),
    (Speed, Constant) => (
      "Speed is holding steady",
      "Your speed is consistent. A weekly tempo run is a simple way to nudge it upward.",
    ),
    (Distance, Improvement) => (
      "Distance is building",
      "You're covering more ground. Increase weekly volume by no more than about 10% to stay injury-free.",
    ),
    (Distance, Decline) => (
      "Shorter sessions lately",
      "Your runs have been shorter. If that wasn't planned, add ten minutes to one easy run this week.",
    ),
    (Distance, Constant) => (
      "Distance is stable",
      "Your distances are steady. Try extending your longest run of the week gradually.",
    ),
    (Elevation, Improvement) => (
      "More climbing",
      "You're tackling more elevation. Hills build strength; balance them with flat recovery runs.",
    ),
    (Elevation, Decline) => (
      "Less climbing",
      "You've been running flatter routes. Add a hilly loop to keep leg strength up.",
    ),
    (Elevation, Constant) => (
      "Elevation is steady",
      "Your climbing load is consistent. A short set of hill repeats would add variety.",
    ),
    (Pace, Improvement) => (
      "Pace is dropping",
      "You're covering each kilometre faster. Protect the gain with a proper recovery day after hard efforts.",
    ),
    (Pace, Decline) => (
      "Pace is drifting up",
      "Each kilometre is taking longer. Ease off for a few days and let your legs recover.",
    ),
    (Pace, Constant) => (
      "Pace is steady",
      "Your pace is stable. Intervals once a week can help you break through.",
    ),
    (PaceDistribution, Improvement) => (
      "Consistent pacing",
      "Your pace barely varies between runs. That control is a great base for race-day pacing.",
    ),
    (PaceDistribution, Decline) => (
      "Pacing is erratic",
      "Your pace varies a lot between runs. Keep easy days truly easy and save speed for planned sessions.",
    ),
    (PaceDistribution, Constant) => (
      "Pacing is moderately consistent",
      "Your pacing is fairly even. Running by effort or heart rate can tighten it further.",
    ),
    (Performance, Improvement) => (
      "Overall performance is up",
      "Speed and distance are combining well. Stay consistent and plan a rest week soon.",
    ),
    (Performance, Decline) => (
      "Overall performance is down",
      "Your combined speed and distance have dipped. Prioritise recovery before adding load.",
    ),
    (Performance, Constant) => (
      "Overall performance is steady",
      "You're maintaining your level. Change one variable, distance or intensity, to progress.",
    ),
    (_, InsufficientData) => (
      "Not enough data yet",
      "Log a few more activities in this time window to see a trend.",
    ),
  }
}

/// ---------------------------------------------------------------------------
/// Prompt Construction
/// ---------------------------------------------------------------------------

/// The most recent points, newest first, one line each
pub fn build_prompt(series: &[TimeSeriesPoint], metric: MetricKind, verdict: TrendVerdict) -> String {
  let mut recent: Vec<&TimeSeriesPoint> = series.iter().collect();
  recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
  recent.truncate(PROMPT_POINTS);

  let lines: Vec<String> = recent
    .iter()
    .map(|p| {
      format!(
        "- {}: {:.2} {} over {:.2} km",
        p.timestamp.format("%b %d"),
        p.value,
        metric.unit(),
        p.distance
      )
    })
    .collect();

  format!(
    "{}\n\nRecent activities (newest first):\n{}\n\nComputed trend: {}.",
    metric_instruction(metric),
    lines.join("\n"),
    verdict.as_str().replace('_', " ")
  )
}

fn metric_instruction(metric: MetricKind) -> &'static str {
  match metric {
    MetricKind::Speed => "Give advice about the athlete's average running speed (km/h).",
    MetricKind::Distance => "Give advice about how far the athlete runs per session (km).",
    MetricKind::Elevation => "Give advice about the elevation gain of the athlete's runs (meters).",
    MetricKind::Pace => "Give advice about the athlete's running pace (min/km, lower is faster).",
    MetricKind::PaceDistribution => {
      "Give advice about how consistent the athlete's pace is from run to run (min/km)."
    }
    MetricKind::Performance => {
      "Give advice about the athlete's combined performance index (weighted speed and distance)."
    }
  }
}

/// Advice from the text generator. Fails fast on an empty series.
pub async fn recommend_with_external_advice(
  series: &[TimeSeriesPoint],
  metric: MetricKind,
  verdict: TrendVerdict,
  generator: &dyn TextGenerator,
  settings: &AdviceSettings,
) -> Result<Recommendation, AdviceError> {
  if series.is_empty() {
    return Err(AdviceError::NoDataAvailable);
  }

  let request = AdviceRequest {
    system_prompt: COACH_SYSTEM_PROMPT.to_string(),
    user_prompt: build_prompt(series, metric, verdict),
    max_tokens: settings.max_tokens,
    temperature: settings.temperature,
  };

  let advice = tokio::time::timeout(settings.timeout, generator.generate_advice(&request))
    .await
    .map_err(|_| LlmError::NetworkError("advice request timed out".to_string()))??;

  Ok(Recommendation {
    advice,
    ..recommend(verdict, metric)
  })
}

/// Trend points re-expressed as a point series of the performance index
pub fn performance_points(points: &[PerformanceTrendPoint]) -> Vec<TimeSeriesPoint> {
  points
    .iter()
    .filter_map(|p| {
      Some(TimeSeriesPoint {
        timestamp: p.day.and_hms_opt(0, 0, 0)?.and_utc(),
        value: p.performance_index,
        distance: p.distance,
      })
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Service
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AdviceSettings {
  pub max_tokens: u32,
  pub temperature: f32,
  pub timeout: Duration,
}

impl Default for AdviceSettings {
  fn default() -> Self {
    let defaults = LlmConfig::default();
    Self::from(&defaults)
  }
}

impl From<&LlmConfig> for AdviceSettings {
  fn from(config: &LlmConfig) -> Self {
    Self {
      max_tokens: config.max_tokens,
      temperature: config.temperature,
      timeout: Duration::from_secs(config.timeout_secs),
    }
  }
}

/// Local and enhanced recommendations behind one boundary.
///
/// `enhanced` never surfaces a generator failure; it degrades to the template.
pub struct RecommendationService {
  generator: Option<Arc<dyn TextGenerator>>,
  settings: AdviceSettings,
  requests: RequestRegistry<EnhancedRecommendation>,
}

impl RecommendationService {
  pub fn new(generator: Option<Arc<dyn TextGenerator>>, settings: AdviceSettings) -> Self {
    Self {
      generator,
      settings,
      requests: RequestRegistry::new(),
    }
  }

  /// Claude-backed service, or template-only when not configured
  pub fn from_config(config: Option<&LlmConfig>) -> Self {
    let Some(config) = config else {
      tracing::info!("No LLM configured, serving template advice only");
      return Self::new(None, AdviceSettings::default());
    };

    let generator: Option<Arc<dyn TextGenerator>> = match ClaudeClient::new(config) {
      Ok(client) => Some(Arc::new(client)),
      Err(e) => {
        tracing::warn!(error = %e, "LLM client unavailable, serving template advice only");
        None
      }
    };

    Self::new(generator, AdviceSettings::from(config))
  }

  pub fn is_enhanced(&self) -> bool {
    self.generator.is_some()
  }

  /// Window-filtered series for a metric; performance uses the joined trend
  pub fn prompt_series(
    snapshot: &MetricSnapshot,
    metric: MetricKind,
    range: TimeRange,
    today: NaiveDate,
  ) -> Vec<TimeSeriesPoint> {
    match metric {
      MetricKind::Performance => performance_points(&filter_trend_window(&snapshot.trend, range, today)),
      _ => filter_window(series_for(snapshot, metric), range, today),
    }
  }

  pub fn local(
    &self,
    snapshot: &MetricSnapshot,
    metric: MetricKind,
    range: TimeRange,
    today: NaiveDate,
  ) -> Recommendation {
    recommend(classify_snapshot(snapshot, metric, range, today), metric)
  }

  /// Enhanced advice for an already-filtered series; falls back on any failure
  pub async fn enhance(
    &self,
    series: &[TimeSeriesPoint],
    metric: MetricKind,
    verdict: TrendVerdict,
  ) -> EnhancedRecommendation {
    let Some(generator) = self.generator.as_deref() else {
      return fallback(verdict, metric, "advice service not configured".to_string());
    };

    match recommend_with_external_advice(series, metric, verdict, generator, &self.settings).await {
      Ok(recommendation) => EnhancedRecommendation {
        recommendation,
        source: AdviceSource::Enhanced,
      },
      Err(e) => {
        tracing::warn!(metric = %metric, error = %e, "Falling back to template advice");
        fallback(verdict, metric, e.to_string())
      }
    }
  }

  /// Enhanced advice for one chart slot.
  ///
  /// A newer request for the same (metric, window) supersedes this one, and
  /// cancelling `cancel` abandons it; neither publishes a fallback.
  pub async fn enhanced(
    &self,
    snapshot: &MetricSnapshot,
    metric: MetricKind,
    range: TimeRange,
    today: NaiveDate,
    cancel: &CancellationToken,
  ) -> RequestOutcome<EnhancedRecommendation> {
    let verdict = classify_snapshot(snapshot, metric, range, today);
    let series = Self::prompt_series(snapshot, metric, range, today);

    let outcome = self
      .requests
      .run((metric, range), cancel, |_| self.enhance(&series, metric, verdict))
      .await;

    if matches!(outcome, RequestOutcome::Superseded) {
      tracing::warn!(metric = %metric, range = range.as_str(), "Recommendation superseded by newer request");
    }
    outcome
  }

  /// Last enhanced recommendation delivered for a slot
  pub fn latest(&self, metric: MetricKind, range: TimeRange) -> Option<EnhancedRecommendation> {
    self.requests.latest((metric, range))
  }
}

fn fallback(verdict: TrendVerdict, metric: MetricKind, reason: String) -> EnhancedRecommendation {
  EnhancedRecommendation {
    recommendation: recommend(verdict, metric),
    source: AdviceSource::Fallback { reason },
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
