//! Model invoker: one bounded call to the generative model per attempt.
//!
//! [`ModelClient`] is the network seam; [`GeminiClient`] speaks the
//! `generateContent` API in JSON response mode. [`Invoker`] adds the timeout.
//! Retrying is the orchestrator's decision, never the invoker's.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::ModelError;
use crate::prompt;
use crate::types::EvaluationRequest;

#[async_trait]
pub trait ModelClient: Send + Sync {
  /// Send the rendered request; return the model's raw text answer.
  async fn generate(&self, request: &EvaluationRequest, api_key: &str) -> Result<String, ModelError>;
}

pub struct Invoker {
  client: Arc<dyn ModelClient>,
  timeout: Duration,
}

impl Invoker {
  pub fn new(client: Arc<dyn ModelClient>, timeout: Duration) -> Self {
    Self { client, timeout }
  }

  /// A blank key can never authenticate, so it fails before any call.
  pub fn check_key(api_key: &str) -> Result<(), ModelError> {
    if api_key.trim().is_empty() {
      return Err(ModelError::Authentication("no API key supplied".into()));
    }
    Ok(())
  }

  /// Single call, abandoned after the configured timeout.
  pub async fn invoke(&self, request: &EvaluationRequest, api_key: &str) -> Result<String, ModelError> {
    Self::check_key(api_key)?;
    match tokio::time::timeout(self.timeout, self.client.generate(request, api_key)).await {
      Ok(result) => result,
      Err(_) => Err(ModelError::Timeout(self.timeout)),
    }
  }
}

// ---------------------------------------------------------------------------
// Gemini generateContent client
// ---------------------------------------------------------------------------

pub struct GeminiClient {
  endpoint: String,
  timeout: Duration,
  client: Client,
}

impl GeminiClient {
  pub fn new(config: &Config) -> Result<Self, ModelError> {
    let client = Client::builder()
      .timeout(config.model_timeout)
      .build()
      .map_err(|e| ModelError::Transport(e.to_string()))?;

    Ok(Self {
      endpoint: format!(
        "{}/v1beta/models/{}:generateContent",
        config.model_api_url.trim_end_matches('/'),
        config.model_name
      ),
      timeout: config.model_timeout,
      client,
    })
  }
}

#[async_trait]
impl ModelClient for GeminiClient {
  async fn generate(&self, request: &EvaluationRequest, api_key: &str) -> Result<String, ModelError> {
    let response = self
      .client
      .post(&self.endpoint)
      .header("x-goog-api-key", api_key)
      .json(&request_body(request))
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          ModelError::Timeout(self.timeout)
        } else {
          ModelError::Transport(e.to_string())
        }
      })?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| ModelError::Transport(e.to_string()))?;

    if !status.is_success() {
      return Err(classify_failure(status, &body));
    }
    extract_text(&body)
  }
}

/// Request payload: the prompt plus JSON response mode and schema.
pub fn request_body(request: &EvaluationRequest) -> Value {
  json!({
    "contents": [{
      "role": "user",
      "parts": [{ "text": request.text() }],
    }],
    "generationConfig": {
      "temperature": 0.0,
      "responseMimeType": "application/json",
      "responseSchema": prompt::response_schema(),
    },
  })
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
  #[serde(default)]
  error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  #[serde(default)]
  message: String,
  #[serde(default)]
  status: String,
}

/// Map a non-2xx answer onto the error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> ModelError {
  let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
  let message = if envelope.error.message.is_empty() {
    status.canonical_reason().unwrap_or("unknown error").to_string()
  } else {
    envelope.error.message
  };

  // An invalid key comes back as 400 INVALID_ARGUMENT with reason API_KEY_INVALID.
  let bad_key = body.contains("API_KEY_INVALID") || message.contains("API key not valid");

  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelError::Authentication(message),
    StatusCode::BAD_REQUEST if bad_key => ModelError::Authentication(message),
    StatusCode::TOO_MANY_REQUESTS => ModelError::Quota(message),
    _ if envelope.error.status == "RESOURCE_EXHAUSTED" => ModelError::Quota(message),
    _ => ModelError::Service {
      status: status.as_u16(),
      message,
    },
  }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  #[serde(default)]
  content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
  #[serde(default)]
  text: Option<String>,
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(body: &str) -> Result<String, ModelError> {
  let parsed: GenerateResponse =
    serde_json::from_str(body).map_err(|e| ModelError::Decode(e.to_string()))?;
  let text: String = parsed
    .candidates
    .into_iter()
    .next()
    .and_then(|c| c.content)
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
    .unwrap_or_default();

  if text.trim().is_empty() {
    return Err(ModelError::Decode("response has no candidate text".into()));
  }
  Ok(text)
}
