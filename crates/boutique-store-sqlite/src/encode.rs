//! Encoding and decoding helpers between domain types and the integer
//! columns stored in SQLite.
//!
//! Lead timestamps are whole seconds since the epoch; feedback timestamps
//! are milliseconds since the epoch.

use boutique_core::{feedback::FeedbackEntry, lead::Lead};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_secs(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

pub fn decode_secs(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0).ok_or(Error::Timestamp(secs))
}

pub fn encode_millis(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

pub fn decode_millis(ms: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_millis(ms).ok_or(Error::Timestamp(ms))
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `leads` row as read from SQLite, before timestamp decoding.
pub struct RawLead {
  pub id:        i64,
  pub timestamp: i64,
  pub name:      String,
  pub email:     String,
  pub message:   String,
}

impl RawLead {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      timestamp: row.get(1)?,
      name:      row.get(2)?,
      email:     row.get(3)?,
      message:   row.get(4)?,
    })
  }

  pub fn into_lead(self) -> Result<Lead> {
    Ok(Lead {
      id:        self.id,
      email:     self.email,
      name:      self.name,
      message:   self.message,
      timestamp: decode_secs(self.timestamp)?,
    })
  }
}

/// A `feedback` row as read from SQLite, before timestamp decoding.
pub struct RawFeedback {
  pub lead_id:   i64,
  pub timestamp: i64,
  pub question:  String,
}

impl RawFeedback {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      lead_id:   row.get(0)?,
      timestamp: row.get(1)?,
      question:  row.get(2)?,
    })
  }

  pub fn into_entry(self) -> Result<FeedbackEntry> {
    Ok(FeedbackEntry {
      lead_id:   self.lead_id,
      timestamp: decode_millis(self.timestamp)?,
      question:  self.question,
    })
  }
}
