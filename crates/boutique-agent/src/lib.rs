//! Conversation handling for Boutique: turns a model's free-text reply into
//! deduplicated lead and feedback records.
//!
//! - [`engine::LeadBook`]: create-or-update of leads and placeholder
//!   materialisation for feedback.
//! - [`intent`]: detection of implied actions in a reply.
//! - [`assistant::Assistant`]: one chat turn end to end.
//! - [`generator`]: the text-generation oracle and a Gemini client.

#![allow(async_fn_in_trait)]

pub mod assistant;
pub mod engine;
pub mod error;
pub mod generator;
pub mod intent;
pub mod knowledge;
pub mod retry;

pub use error::{Error, Result};
