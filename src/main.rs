use serde::Serialize;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use trainer_trends_lib::commands::dashboard::Dashboard;
use trainer_trends_lib::commands::{get_dashboard, get_enhanced_recommendation, sync_activities};
use trainer_trends_lib::logging::{init_logging, LoggingConfig};
use trainer_trends_lib::models::{EnhancedRecommendation, MetricKind};
use trainer_trends_lib::strava::StravaActivitySource;
use trainer_trends_lib::{db, AppConfig, AppState, RecommendationService, RequestOutcome};

#[derive(Serialize)]
struct Report {
  dashboard: Dashboard,
  #[serde(skip_serializing_if = "Option::is_none")]
  enhanced: Option<Vec<EnhancedRecommendation>>,
}

#[tokio::main]
async fn main() -> ExitCode {
  if let Err(e) = init_logging(&LoggingConfig::from_env()) {
    eprintln!("Failed to initialize logging: {}", e);
    return ExitCode::FAILURE;
  }

  match run().await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!(error = %e, "trainer-trends failed");
      ExitCode::FAILURE
    }
  }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
  let config = AppConfig::from_env()?;

  let pool = db::initialize_db(&config.database_url).await?;
  let state = AppState {
    db: pool,
    advisor: RecommendationService::from_config(config.llm.as_ref()),
  };

  match config.strava.clone() {
    Some(strava) => {
      let source = StravaActivitySource::new(strava);
      let result = sync_activities(&state, &source).await?;
      if !result.stored {
        tracing::warn!("Strava sync failed, reporting on cached activities");
      }
    }
    None => tracing::info!("STRAVA_ACCESS_TOKEN not set, reporting on cached activities"),
  }

  let range = config.time_range;
  let dashboard = get_dashboard(&state, range).await?;

  let mut report = Report {
    dashboard,
    enhanced: None,
  };

  if state.advisor.is_enhanced() {
    // Ctrl-C abandons outstanding advice requests
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        signal.cancel();
      }
    });

    let mut enhanced = Vec::new();
    for metric in MetricKind::ALL {
      match get_enhanced_recommendation(&state, metric, range, &shutdown).await? {
        RequestOutcome::Delivered(recommendation) => enhanced.push(recommendation),
        outcome => tracing::info!(metric = %metric, ?outcome, "No enhanced recommendation"),
      }
    }
    report.enhanced = Some(enhanced);
  }

  println!("{}", serde_json::to_string_pretty(&report)?);

  state.db.close().await;
  Ok(())
}
