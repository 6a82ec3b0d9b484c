//! LLM integration for coaching advice
//!
//! This module handles communication with the Claude API for turning a
//! metric trend into a short piece of coaching advice.

use crate::config::LlmConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum LlmError {
  #[error("Invalid endpoint: {0}")]
  InvalidEndpoint(String),

  #[error("Network error: {0}")]
  NetworkError(String),

  #[error("Authentication rejected: {0}")]
  AuthRejected(String),

  #[error("Malformed response: {0}")]
  MalformedResponse(String),
}

/// ---------------------------------------------------------------------------
/// Text Generation Seam
/// ---------------------------------------------------------------------------

/// Everything needed for one advice completion
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceRequest {
  pub system_prompt: String,
  pub user_prompt: String,
  pub max_tokens: u32,
  pub temperature: f32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate_advice(&self, request: &AdviceRequest) -> Result<String, LlmError>;
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  temperature: f32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  #[allow(dead_code)]
  stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct ClaudeClient {
  client: Client,
  endpoint: Url,
  api_key: String,
  model: String,
}

impl ClaudeClient {
  pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
    let endpoint = parse_endpoint(&config.endpoint)?;

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| LlmError::NetworkError(e.to_string()))?;

    Ok(Self {
      client,
      endpoint,
      api_key: config.api_key.clone(),
      model: config.model.clone(),
    })
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
    temperature: f32,
  ) -> Result<String, LlmError> {
    let request = ClaudeRequest {
      model: self.model.clone(),
      max_tokens,
      temperature,
      system: system_prompt.to_string(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(transport_error)?;

    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
      let message = serde_json::from_str::<ClaudeErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

      return Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
          LlmError::AuthRejected(format!("HTTP {}: {}", status, message))
        }
        _ => LlmError::NetworkError(format!("HTTP {}: {}", status, message)),
      });
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    // Extract text from the first text content block
    claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::MalformedResponse("No text content in response".to_string()))
  }
}

#[async_trait]
impl TextGenerator for ClaudeClient {
  async fn generate_advice(&self, request: &AdviceRequest) -> Result<String, LlmError> {
    let text = self
      .complete(
        &request.system_prompt,
        &request.user_prompt,
        request.max_tokens,
        request.temperature,
      )
      .await?;

    clean_advice(&text)
  }
}

fn parse_endpoint(raw: &str) -> Result<Url, LlmError> {
  let url = Url::parse(raw).map_err(|e| LlmError::InvalidEndpoint(format!("{}: {}", raw, e)))?;
  match url.scheme() {
    "http" | "https" => Ok(url),
    other => Err(LlmError::InvalidEndpoint(format!("unsupported scheme {}", other))),
  }
}

fn transport_error(e: reqwest::Error) -> LlmError {
  if e.is_timeout() {
    LlmError::NetworkError("request timed out".to_string())
  } else {
    LlmError::NetworkError(e.to_string())
  }
}

/// Strip markdown fences and wrapping quotes from the model's reply
pub fn clean_advice(text: &str) -> Result<String, LlmError> {
  let mut body = text.trim();

  if let Some(rest) = body.strip_prefix("```") {
    // Skip language identifier if present
    let content_start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
    let rest = &rest[content_start..];
    body = rest.rfind("```").map(|end| &rest[..end]).unwrap_or(rest).trim();
  }

  let body = body.trim_matches('"').trim();
  if body.is_empty() {
    return Err(LlmError::MalformedResponse("Empty advice text".to_string()));
  }

  Ok(body.to_string())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  fn config_for(endpoint: String) -> LlmConfig {
    LlmConfig {
      api_key: "test-key".to_string(),
      endpoint,
      ..LlmConfig::default()
    }
  }

  fn request() -> AdviceRequest {
    AdviceRequest {
      system_prompt: "You are a coach.".to_string(),
      user_prompt: "Speed went up.".to_string(),
      max_tokens: 100,
      temperature: 0.7,
    }
  }

  #[test]
  fn test_clean_advice_plain_and_fenced() {
    assert_eq!(clean_advice("  Keep it easy.  ").unwrap(), "Keep it easy.");
    assert_eq!(clean_advice("\"Keep it easy.\"").unwrap(), "Keep it easy.");
    assert_eq!(clean_advice("```text\nKeep it easy.\n```").unwrap(), "Keep it easy.");
    assert!(matches!(clean_advice("   "), Err(LlmError::MalformedResponse(_))));
  }

  #[test]
  fn test_invalid_endpoint_rejected() {
    assert!(matches!(
      ClaudeClient::new(&config_for("not a url".to_string())),
      Err(LlmError::InvalidEndpoint(_))
    ));
    assert!(matches!(
      ClaudeClient::new(&config_for("ftp://example.com/v1".to_string())),
      Err(LlmError::InvalidEndpoint(_))
    ));
  }

  #[tokio::test]
  async fn test_generate_advice_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/v1/messages")
      .match_header("x-api-key", "test-key")
      .match_header("anthropic-version", API_VERSION)
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"content":[{"type":"text","text":"Add one easy run."}],"stop_reason":"end_turn"}"#)
      .create_async()
      .await;

    let client = ClaudeClient::new(&config_for(format!("{}/v1/messages", server.url()))).unwrap();
    let advice = client.generate_advice(&request()).await.unwrap();

    assert_eq!(advice, "Add one easy run.");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_auth_failures_map_to_auth_rejected() {
    let mut server = mockito::Server::new_async().await;
    for status in [401, 403] {
      let mock = server
        .mock("POST", "/v1/messages")
        .with_status(status)
        .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
        .create_async()
        .await;

      let client = ClaudeClient::new(&config_for(format!("{}/v1/messages", server.url()))).unwrap();
      let result = client.generate_advice(&request()).await;

      match result {
        Err(LlmError::AuthRejected(msg)) => assert!(msg.contains("invalid x-api-key")),
        other => panic!("expected AuthRejected, got {:?}", other),
      }
      mock.remove_async().await;
    }
  }

  #[tokio::test]
  async fn test_server_error_is_network_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/v1/messages")
      .with_status(529)
      .with_body("overloaded")
      .create_async()
      .await;

    let client = ClaudeClient::new(&config_for(format!("{}/v1/messages", server.url()))).unwrap();
    assert!(matches!(
      client.generate_advice(&request()).await,
      Err(LlmError::NetworkError(_))
    ));
  }

  #[tokio::test]
  async fn test_malformed_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/v1/messages")
      .with_status(200)
      .with_body("{\"content\": [")
      .create_async()
      .await;

    let client = ClaudeClient::new(&config_for(format!("{}/v1/messages", server.url()))).unwrap();
    assert!(matches!(
      client.generate_advice(&request()).await,
      Err(LlmError::MalformedResponse(_))
    ));
  }

  #[tokio::test]
  async fn test_unreachable_endpoint_is_network_error() {
    // Port 9 (discard) on localhost is expected to refuse connections
    let client = ClaudeClient::new(&config_for("http://127.0.0.1:9/v1/messages".to_string())).unwrap();
    assert!(matches!(
      client.generate_advice(&request()).await,
      Err(LlmError::NetworkError(_))
    ));
  }
}
