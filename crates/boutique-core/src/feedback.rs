//! FeedbackEntry: a question the assistant could not answer.
//!
//! Entries are append-only. Identity is the pair `(lead_id, timestamp)` where
//! the timestamp carries millisecond precision, so two entries for the same
//! lead within one second do not collide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::LeadId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
  pub lead_id:   LeadId,
  /// Millisecond precision; part of the entry's identity.
  pub timestamp: DateTime<Utc>,
  pub question:  String,
}
