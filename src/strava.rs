use crate::config::StravaConfig;
use crate::source::{ActivitySource, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";

/// ---------------------------------------------------------------------------
/// Strava API - Activity Fetching
/// ---------------------------------------------------------------------------

/// Reads the athlete's recent activities with a pre-issued access token.
///
/// Activities are returned as raw JSON; typing happens at the aggregator.
pub struct StravaActivitySource {
  client: Client,
  config: StravaConfig,
}

impl StravaActivitySource {
  pub fn new(config: StravaConfig) -> Self {
    Self {
      client: Client::new(),
      config,
    }
  }

  fn activities_url(&self) -> Result<Url, SyncError> {
    let mut url = Url::parse(&format!(
      "{}/athlete/activities",
      self.config.api_base.trim_end_matches('/')
    ))
    .map_err(|e| SyncError::Api(format!("Invalid Strava API base: {}", e)))?;

    url
      .query_pairs_mut()
      .append_pair("per_page", &self.config.per_page.to_string());

    Ok(url)
  }

  /// Fetch the most recent page of activities from Strava.
  ///
  /// Always the full page: a sync replaces the cached snapshot wholesale.
  pub async fn fetch_activities(&self) -> Result<Vec<Value>, SyncError> {
    let url = self.activities_url()?;

    let response = self
      .client
      .get(url)
      .bearer_auth(&self.config.access_token)
      .send()
      .await?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
      return Err(SyncError::NotAuthenticated);
    }

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(SyncError::Api(format!(
        "Failed to fetch activities (HTTP {}): {}",
        status, error_text
      )));
    }

    let response_text = response.text().await?;

    // Keep the records loose, but the envelope must be a list
    let activities: Vec<Value> = serde_json::from_str(&response_text).map_err(|e| {
      let snippet: String = response_text.chars().take(500).collect();
      tracing::warn!(raw = %snippet, "Failed to parse Strava response");
      SyncError::Parse(e.to_string())
    })?;

    Ok(activities)
  }
}

#[async_trait]
impl ActivitySource for StravaActivitySource {
  fn name(&self) -> &'static str {
    "strava"
  }

  async fn list_recent_activities(&self) -> Result<Vec<Value>, SyncError> {
    self.fetch_activities().await
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;

  fn source_for(base: String) -> StravaActivitySource {
    StravaActivitySource::new(StravaConfig {
      access_token: "token-123".to_string(),
      api_base: base,
      per_page: 30,
    })
  }

  #[tokio::test]
  async fn test_fetch_activities_sends_token_and_page_size() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/athlete/activities")
      .match_header("authorization", "Bearer token-123")
      .match_query(Matcher::UrlEncoded("per_page".into(), "30".into()))
      .with_status(200)
      .with_body(r#"[{"id": 1, "start_date": "2024-03-04T07:00:00Z", "average_speed": 3.1}, {"id": 2}]"#)
      .create_async()
      .await;

    let activities = source_for(server.url()).list_recent_activities().await.unwrap();
    assert_eq!(activities.len(), 2);
    assert_eq!(activities[0]["id"], 1);
    mock.assert_async().await;
  }

  #[test]
  fn test_activities_url_requests_one_full_page() {
    let source = source_for("https://example.com/api/v3/".to_string());
    let url = source.activities_url().unwrap();
    assert_eq!(url.as_str(), "https://example.com/api/v3/athlete/activities?per_page=30");
  }

  #[tokio::test]
  async fn test_unauthorized_maps_to_not_authenticated() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("GET", "/athlete/activities")
      .match_query(Matcher::Any)
      .with_status(401)
      .create_async()
      .await;

    let result = source_for(server.url()).list_recent_activities().await;
    assert!(matches!(result, Err(SyncError::NotAuthenticated)));
  }

  #[tokio::test]
  async fn test_non_list_body_is_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("GET", "/athlete/activities")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(r#"{"message": "Rate Limit Exceeded"}"#)
      .create_async()
      .await;

    let result = source_for(server.url()).list_recent_activities().await;
    assert!(matches!(result, Err(SyncError::Parse(_))));
  }
}
