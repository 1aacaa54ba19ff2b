//! `POST /chat`: one conversational turn.
//!
//! Body: `{"message": "...", "history": [{"user": "...", "assistant": "..."}]}`,
//! history oldest first. Response: `{"reply": "..."}`. Model and storage
//! failures still answer `200` with apology text; only a blank message is a
//! client error.

use axum::{Json, extract::State};
use boutique_agent::{assistant::Exchange, generator::Generator};
use boutique_core::store::LeadStore;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
  pub message: String,
  #[serde(default)]
  pub history: Vec<Exchange>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
  pub reply: String,
}

pub async fn handler<S, G>(
  State(assistant): State<AppState<S, G>>,
  Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError>
where
  S: LeadStore,
  G: Generator,
{
  if body.message.trim().is_empty() {
    return Err(ApiError::BadRequest("message must not be empty".into()));
  }
  let reply = assistant.respond(&body.message, &body.history).await;
  Ok(Json(ChatResponse { reply }))
}
