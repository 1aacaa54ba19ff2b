//! The text-generation oracle behind the assistant.
//!
//! [`Generator`] is all the assistant needs from a language model: prompt in,
//! text out. [`GeminiGenerator`] implements it against the Gemini
//! `generateContent` REST endpoint.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Trait ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GenerationError {
  /// The model answered with no usable text (no candidates, a filtered
  /// candidate, or blank parts).
  #[error("model returned no text (finish reason: {0:?})")]
  Empty(Option<String>),

  #[error("model API returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("model is not configured: {0}")]
  Config(String),
}

/// A text-generation backend.
pub trait Generator: Send + Sync {
  /// Produce a reply for `prompt`. Implementations should not retry; the
  /// caller decides how to surface a failure.
  fn generate<'a>(
    &'a self,
    prompt: &'a str,
  ) -> impl Future<Output = Result<String, GenerationError>> + Send + 'a;
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Model settings, deserialised from the `[model]` config table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  pub name:         String,
  pub endpoint:     String,
  /// Falls back to the `GEMINI_API_KEY` environment variable when empty.
  pub api_key:      String,
  pub timeout_secs: u64,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      name:         "gemini-2.5-flash".to_owned(),
      endpoint:     "https://generativelanguage.googleapis.com/v1beta".to_owned(),
      api_key:      String::new(),
      timeout_secs: 30,
    }
  }
}

// ─── Gemini ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
  contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
  role:  &'static str,
  parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
  text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
  candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
  content:       Option<ResponseContent>,
  finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseContent {
  parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
  text: Option<String>,
}

impl GenerateResponse {
  /// Concatenated text of the first candidate.
  fn into_text(self) -> Result<String, GenerationError> {
    let Some(candidate) = self.candidates.into_iter().next() else {
      return Err(GenerationError::Empty(None));
    };
    let text: String = candidate
      .content
      .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
      .unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
      return Err(GenerationError::Empty(candidate.finish_reason));
    }
    Ok(text.to_owned())
  }
}

/// Gemini `models/{name}:generateContent` client.
#[derive(Clone)]
pub struct GeminiGenerator {
  http:    reqwest::Client,
  url:     String,
  api_key: String,
}

impl GeminiGenerator {
  pub fn new(config: &ModelConfig) -> Result<Self, GenerationError> {
    let api_key = if config.api_key.is_empty() {
      std::env::var("GEMINI_API_KEY").unwrap_or_default()
    } else {
      config.api_key.clone()
    };
    if api_key.is_empty() {
      return Err(GenerationError::Config(
        "no api_key in config and GEMINI_API_KEY is unset".to_owned(),
      ));
    }

    let model = config.name.trim_start_matches("models/");
    let url = format!(
      "{}/models/{model}:generateContent",
      config.endpoint.trim_end_matches('/')
    );
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Ok(Self { http, url, api_key })
  }
}

impl Generator for GeminiGenerator {
  async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
    let body = GenerateRequest {
      contents: [RequestContent { role: "user", parts: [RequestPart { text: prompt }] }],
    };

    let response = self
      .http
      .post(&self.url)
      .header("x-goog-api-key", &self.api_key)
      .json(&body)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(GenerationError::Status { status: status.as_u16(), body });
    }

    response.json::<GenerateResponse>().await?.into_text()
  }
}
