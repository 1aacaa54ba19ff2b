//! Error type for `boutique-store-sqlite`.

use boutique_core::{
  lead::LeadId,
  store::{Fault, StoreFault},
};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("a lead with email {0:?} already exists")]
  DuplicateEmail(String),

  #[error("feedback for lead {lead_id} at {timestamp_ms}ms already exists")]
  DuplicateFeedback { lead_id: LeadId, timestamp_ms: i64 },

  /// An update targeted a lead id that does not exist.
  #[error("lead not found: {0}")]
  LeadNotFound(LeadId),

  /// A feedback insert referenced a lead id that does not exist.
  #[error("feedback references missing lead {0}")]
  MissingLead(LeadId),

  #[error("timestamp out of range: {0}")]
  Timestamp(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl StoreFault for Error {
  fn fault(&self) -> Fault {
    match self {
      Error::Database(e) => match sqlite_code(e) {
        Some(
          ErrorCode::DatabaseBusy
          | ErrorCode::DatabaseLocked
          | ErrorCode::SystemIoFailure,
        ) => Fault::Transient,
        _ => Fault::Fatal,
      },
      Error::DuplicateEmail(_) | Error::DuplicateFeedback { .. } => {
        Fault::Conflict
      }
      Error::LeadNotFound(_) => Fault::NotFound,
      Error::MissingLead(_) => Fault::MissingParent,
      Error::Timestamp(_) => Fault::Fatal,
    }
  }
}

/// The primary SQLite result code behind a failed call, if there is one.
fn sqlite_code(err: &tokio_rusqlite::Error) -> Option<ErrorCode> {
  match err {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) => {
      Some(e.code)
    }
    _ => None,
  }
}

/// The extended result code of a constraint violation, if `err` is one.
pub(crate) fn constraint_code(err: &tokio_rusqlite::Error) -> Option<i32> {
  match err {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.code == ErrorCode::ConstraintViolation =>
    {
      Some(e.extended_code)
    }
    _ => None,
  }
}
