//! Core types and trait definitions for the Boutique lead capture system.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures instead.
#![allow(async_fn_in_trait)]

pub mod contact;
pub mod error;
pub mod feedback;
pub mod lead;
pub mod store;

pub use error::{Error, Result};
