//! Environment-driven configuration
//!
//! Secrets are only ever read from the environment (or a local `.env`).
//! A missing Anthropic key disables enhanced advice rather than failing.

use crate::llm::{CLAUDE_API_URL, CLAUDE_MODEL};
use crate::models::TimeRange;
use crate::strava::STRAVA_API_BASE;
use std::env;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite://trainer-trends.db?mode=rwc";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_TOKENS: u32 = 300;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_PER_PAGE: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  Invalid { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
  pub api_key: String,
  pub endpoint: String,
  pub model: String,
  pub timeout_secs: u64,
  pub max_tokens: u32,
  pub temperature: f32,
}

impl Default for LlmConfig {
  fn default() -> Self {
    Self {
      api_key: String::new(),
      endpoint: CLAUDE_API_URL.to_string(),
      model: CLAUDE_MODEL.to_string(),
      timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
      max_tokens: DEFAULT_MAX_TOKENS,
      temperature: DEFAULT_TEMPERATURE,
    }
  }
}

impl LlmConfig {
  /// `Ok(None)` when no API key is set
  pub fn from_env() -> Result<Option<Self>, ConfigError> {
    let api_key = match optional("ANTHROPIC_API_KEY") {
      Some(key) => key,
      None => return Ok(None),
    };

    let defaults = Self::default();
    Ok(Some(Self {
      api_key,
      endpoint: optional("LLM_ENDPOINT").unwrap_or(defaults.endpoint),
      model: optional("LLM_MODEL").unwrap_or(defaults.model),
      timeout_secs: parsed("LLM_TIMEOUT_SECS", defaults.timeout_secs)?,
      max_tokens: parsed("LLM_MAX_TOKENS", defaults.max_tokens)?,
      temperature: parsed("LLM_TEMPERATURE", defaults.temperature)?,
    }))
  }
}

#[derive(Debug, Clone)]
pub struct StravaConfig {
  pub access_token: String,
  pub api_base: String,
  pub per_page: u32,
}

impl StravaConfig {
  /// `Ok(None)` when no access token is set
  pub fn from_env() -> Result<Option<Self>, ConfigError> {
    let access_token = match optional("STRAVA_ACCESS_TOKEN") {
      Some(token) => token,
      None => return Ok(None),
    };

    Ok(Some(Self {
      access_token,
      api_base: optional("STRAVA_API_BASE").unwrap_or_else(|| STRAVA_API_BASE.to_string()),
      per_page: parsed("STRAVA_PER_PAGE", DEFAULT_PER_PAGE)?,
    }))
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub database_url: String,
  pub time_range: TimeRange,
  pub llm: Option<LlmConfig>,
  pub strava: Option<StravaConfig>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    Ok(Self {
      database_url: optional("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
      time_range: parsed("TRENDS_TIME_RANGE", TimeRange::default())?,
      llm: LlmConfig::from_env()?,
      strava: StravaConfig::from_env()?,
    })
  }
}

/// Unset and blank are treated the same
fn optional(key: &str) -> Option<String> {
  env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
  match optional(key) {
    Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
      key: key.to_string(),
      value,
    }),
    None => Ok(default),
  }
}
