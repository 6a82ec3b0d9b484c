use super::series::MetricKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendVerdict {
  Improvement,
  Decline,
  Constant,
  InsufficientData,
}

impl TrendVerdict {
  pub fn as_str(&self) -> &'static str {
    match self {
      TrendVerdict::Improvement => "improvement",
      TrendVerdict::Decline => "decline",
      TrendVerdict::Constant => "constant",
      TrendVerdict::InsufficientData => "insufficient_data",
    }
  }
}

/// Advice card shown next to a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
  pub verdict: TrendVerdict,
  pub metric: MetricKind,
  pub headline: String,
  pub advice: String,
}

/// Where the advice text came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdviceSource {
  Enhanced,
  /// Template text served because enhancement failed
  Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedRecommendation {
  pub recommendation: Recommendation,
  pub source: AdviceSource,
}

impl EnhancedRecommendation {
  pub fn is_degraded(&self) -> bool {
    matches!(self.source, AdviceSource::Fallback { .. })
  }
}
