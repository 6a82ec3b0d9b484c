pub mod activity;
pub mod recommendation;
pub mod series;

pub use activity::{ActivityRecord, RecordError};
pub use recommendation::{AdviceSource, EnhancedRecommendation, Recommendation, TrendVerdict};
pub use series::{MetricKind, PerformanceTrendPoint, TimeRange, TimeSeriesPoint};
