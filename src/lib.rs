pub mod aggregation;
pub mod commands;
pub mod config;
pub mod db;
pub mod llm;
pub mod logging;
pub mod models;
pub mod recommendation;
pub mod requests;
pub mod source;
pub mod strava;
pub mod trends;

#[cfg(test)]
mod test_utils;

pub use aggregation::MetricSnapshot;
pub use config::AppConfig;
pub use db::AppState;
pub use recommendation::RecommendationService;
pub use requests::RequestOutcome;
