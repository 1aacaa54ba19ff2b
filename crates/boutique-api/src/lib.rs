//! JSON HTTP API for Boutique.
//!
//! Exposes an axum [`Router`] backed by an [`Assistant`]: the chat endpoint
//! plus read-only views of captured leads and feedback. The transcript lives
//! with the client and is sent along with every message.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", boutique_api::api_router(assistant.clone()))
//! ```

pub mod chat;
pub mod error;
pub mod leads;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use boutique_agent::{assistant::Assistant, generator::Generator};
use boutique_core::store::LeadStore;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared handler state.
pub type AppState<S, G> = Arc<Assistant<S, G>>;

/// Build the API router for `assistant`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(assistant: AppState<S, G>) -> Router<()>
where
  S: LeadStore + 'static,
  G: Generator + 'static,
{
  Router::new()
    .route("/chat", post(chat::handler::<S, G>))
    .route("/leads", get(leads::list::<S, G>))
    .route("/leads/{id}", get(leads::get_one::<S, G>))
    .route("/leads/{id}/feedback", get(leads::feedback_for::<S, G>))
    .route("/feedback", get(leads::all_feedback::<S, G>))
    .layer(TraceLayer::new_for_http())
    .with_state(assistant)
}

#[cfg(test)]
mod tests;
