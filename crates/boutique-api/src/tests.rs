//! Router tests against an in-memory store and a canned generator.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use boutique_agent::{
  assistant::{Assistant, FEEDBACK_SUFFIX, INTEREST_SUFFIX},
  engine::LeadBook,
  generator::{GenerationError, Generator},
  knowledge::Knowledge,
  retry::RetryPolicy,
};
use boutique_core::{feedback::FeedbackEntry, lead::Lead};
use boutique_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{api_router, chat::ChatResponse};

/// Always answers with the same text.
struct Fixed(&'static str);

impl Generator for Fixed {
  async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
    Ok(self.0.to_owned())
  }
}

async fn app(reply: &'static str) -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let book = LeadBook::new(Arc::new(store), RetryPolicy::none());
  let assistant = Assistant::new(book, Fixed(reply), &Knowledge::default());
  api_router(Arc::new(assistant))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, bytes.to_vec())
}

fn chat(body: Value) -> Request<Body> {
  Request::post("/chat")
    .header("content-type", "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

fn get(uri: &str) -> Request<Body> { Request::get(uri).body(Body::empty()).unwrap() }

// ─── Chat ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_plain_reply() {
  let app = app("We're open 10 to 6.").await;
  let (status, body) = send(&app, chat(json!({ "message": "hours?" }))).await;
  assert_eq!(status, StatusCode::OK);

  let res: ChatResponse = serde_json::from_slice(&body).unwrap();
  assert_eq!(res.reply, "We're open 10 to 6.");
}

#[tokio::test]
async fn chat_captures_lead_and_lists_it() {
  let app = app("Lovely! record_customer_interest(name='Lara', email='lara@example.com')").await;
  let (status, body) = send(
    &app,
    chat(json!({
      "message": "I'm Lara, lara@example.com",
      "history": [{ "user": "hi", "assistant": "Hello!" }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let res: ChatResponse = serde_json::from_slice(&body).unwrap();
  assert_eq!(res.reply, format!("Lovely!{INTEREST_SUFFIX}"));

  let (status, body) = send(&app, get("/leads")).await;
  assert_eq!(status, StatusCode::OK);
  let leads: Vec<Lead> = serde_json::from_slice(&body).unwrap();
  assert_eq!(leads.len(), 1);
  assert_eq!(leads[0].email, "lara@example.com");

  let (status, body) = send(&app, get(&format!("/leads/{}", leads[0].id))).await;
  assert_eq!(status, StatusCode::OK);
  let lead: Lead = serde_json::from_slice(&body).unwrap();
  assert_eq!(lead, leads[0]);
}

#[tokio::test]
async fn chat_feedback_is_listed() {
  let app = app("Hmm, not sure. record_feedback()").await;
  let (_, body) = send(&app, chat(json!({ "message": "Do you rent gowns?" }))).await;
  let res: ChatResponse = serde_json::from_slice(&body).unwrap();
  assert_eq!(res.reply, format!("Hmm, not sure.{FEEDBACK_SUFFIX}"));

  let (_, body) = send(&app, get("/feedback")).await;
  let all: Vec<FeedbackEntry> = serde_json::from_slice(&body).unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].question, "Do you rent gowns?");

  let (status, body) = send(&app, get(&format!("/leads/{}/feedback", all[0].lead_id))).await;
  assert_eq!(status, StatusCode::OK);
  let one: Vec<FeedbackEntry> = serde_json::from_slice(&body).unwrap();
  assert_eq!(one, all);
}

#[tokio::test]
async fn blank_message_is_rejected() {
  let app = app("unused").await;
  let (status, body) = send(&app, chat(json!({ "message": "   " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let v: Value = serde_json::from_slice(&body).unwrap();
  assert!(v["error"].as_str().unwrap().contains("message"));
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_lead_is_404() {
  let app = app("unused").await;
  let (status, _) = send(&app, get("/leads/42")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, get("/leads/42/feedback")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_store_lists_nothing() {
  let app = app("unused").await;
  let (status, body) = send(&app, get("/leads")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([]));
}
