//! Lead: a prospective customer keyed by email address.
//!
//! The email is the natural key. A lead's `id` is assigned by the store on
//! creation and never changes; `name`, `message` and `timestamp` are
//! overwritten every time the same customer shows interest again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Surrogate identifier assigned by the store.
pub type LeadId = i64;

/// Name given to leads materialised from feedback with no prior lead.
pub const PLACEHOLDER_NAME: &str = "Anonymous";

/// Message given to leads materialised from feedback with no prior lead.
pub const PLACEHOLDER_MESSAGE: &str = "Auto-created from feedback";

/// A persisted lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
  pub id:        LeadId,
  /// Exact, case-sensitive natural key. Unique across the store.
  pub email:     String,
  pub name:      String,
  pub message:   String,
  /// Last time the lead was created or updated. Second precision.
  pub timestamp: DateTime<Utc>,
}

impl Lead {
  /// Whether this lead was auto-created from a feedback event and has never
  /// been claimed by an interest event since.
  pub fn is_placeholder(&self) -> bool {
    self.name == PLACEHOLDER_NAME && self.message == PLACEHOLDER_MESSAGE
  }
}

/// Input for [`LeadStore::create_lead`](crate::store::LeadStore::create_lead).
#[derive(Debug, Clone)]
pub struct NewLead {
  pub email:     String,
  pub name:      String,
  pub message:   String,
  pub timestamp: DateTime<Utc>,
}

impl NewLead {
  /// A placeholder lead for feedback that arrived before any interest event.
  pub fn placeholder(email: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
    Self {
      email: email.into(),
      name: PLACEHOLDER_NAME.to_owned(),
      message: PLACEHOLDER_MESSAGE.to_owned(),
      timestamp,
    }
  }
}

/// The mutable fields of a lead, for
/// [`LeadStore::update_lead`](crate::store::LeadStore::update_lead).
#[derive(Debug, Clone)]
pub struct LeadUpdate {
  pub name:      String,
  pub message:   String,
  pub timestamp: DateTime<Utc>,
}
