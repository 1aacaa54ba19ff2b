//! The `LeadStore` trait and error classification.
//!
//! The trait is implemented by storage backends (e.g.
//! `boutique-store-sqlite`). The dedup engine in `boutique-agent` depends on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  feedback::FeedbackEntry,
  lead::{Lead, LeadId, LeadUpdate, NewLead},
};

// ─── Fault classification ────────────────────────────────────────────────────

/// How a caller should react to a store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
  /// Lock contention or I/O trouble. Retrying the same call may succeed.
  Transient,
  /// A uniqueness constraint rejected the write (duplicate email, or a
  /// feedback entry with an identical `(lead_id, timestamp)` key).
  Conflict,
  /// A feedback insert referenced a lead that does not exist.
  MissingParent,
  /// An update targeted a lead that does not exist.
  NotFound,
  /// Anything else. Not recoverable by the caller.
  Fatal,
}

/// Implemented by backend error types so callers can classify failures
/// without knowing the backend.
pub trait StoreFault {
  fn fault(&self) -> Fault;

  fn is_transient(&self) -> bool { self.fault() == Fault::Transient }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Boutique record store backend.
///
/// Each method is atomic on its own. No transaction spans two calls, so the
/// find-then-create sequence in the dedup engine can race with another
/// writer; backends must enforce email uniqueness on insert and report the
/// violation as [`Fault::Conflict`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LeadStore: Send + Sync {
  type Error: std::error::Error + StoreFault + Send + Sync + 'static;

  /// Create both tables if they are absent. Idempotent.
  fn ensure_schema(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Leads ─────────────────────────────────────────────────────────────

  /// Exact, case-sensitive lookup by email.
  fn find_lead_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + 'a;

  /// Retrieve a lead by id. Returns `None` if not found.
  fn get_lead(
    &self,
    id: LeadId,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  /// Insert a new lead and return its id.
  ///
  /// Fails with a [`Fault::Conflict`] error if the email is already taken.
  fn create_lead(
    &self,
    lead: NewLead,
  ) -> impl Future<Output = Result<LeadId, Self::Error>> + Send + '_;

  /// Overwrite the mutable fields of an existing lead.
  ///
  /// Fails with a [`Fault::NotFound`] error if `id` does not exist.
  fn update_lead(
    &self,
    id: LeadId,
    update: LeadUpdate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All leads, ordered by id.
  fn list_leads(
    &self,
  ) -> impl Future<Output = Result<Vec<Lead>, Self::Error>> + Send + '_;

  // ── Feedback — append-only ────────────────────────────────────────────

  /// Append a feedback entry.
  ///
  /// Fails with [`Fault::MissingParent`] if `lead_id` does not exist and
  /// with [`Fault::Conflict`] if an entry with the same lead and millisecond
  /// timestamp already exists.
  fn insert_feedback(
    &self,
    lead_id: LeadId,
    question: String,
    timestamp: DateTime<Utc>,
  ) -> impl Future<Output = Result<FeedbackEntry, Self::Error>> + Send + '_;

  /// Feedback entries ordered by `(lead_id, timestamp)`, optionally
  /// restricted to one lead.
  fn list_feedback(
    &self,
    lead_id: Option<LeadId>,
  ) -> impl Future<Output = Result<Vec<FeedbackEntry>, Self::Error>> + Send + '_;
}
