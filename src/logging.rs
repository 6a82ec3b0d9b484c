use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
  pub log_level: String,
  pub with_target: bool,
}

impl LoggingConfig {
  pub fn from_env() -> Self {
    Self {
      log_level: std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
      with_target: std::env::var("LOG_TARGETS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false),
    }
  }

  pub fn filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    EnvFilter::try_new(&self.log_level)
  }
}

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::registry()
    .with(config.filter()?)
    .with(
      tracing_subscriber::fmt::layer()
        .with_target(config.with_target)
        .with_writer(std::io::stderr),
    )
    .try_init()?;

  tracing::debug!(filter = %config.log_level, "Logging initialized");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_default_filter_when_unset() {
    temp_env::with_vars_unset(["RUST_LOG", "LOG_TARGETS"], || {
      let config = LoggingConfig::from_env();
      assert_eq!(config.log_level, DEFAULT_LOG_FILTER);
      assert!(!config.with_target);
      assert!(config.filter().is_ok());
    });
  }

  #[test]
  #[serial]
  fn test_rust_log_overrides_default() {
    temp_env::with_vars([("RUST_LOG", Some("trainer_trends_lib=debug")), ("LOG_TARGETS", Some("true"))], || {
      let config = LoggingConfig::from_env();
      assert_eq!(config.log_level, "trainer_trends_lib=debug");
      assert!(config.with_target);
    });
  }
}
