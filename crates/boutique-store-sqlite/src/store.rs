//! [`SqliteStore`]: the SQLite implementation of [`LeadStore`].

use std::{path::Path, time::Duration};

use boutique_core::{
  feedback::FeedbackEntry,
  lead::{Lead, LeadId, LeadUpdate, NewLead},
  store::LeadStore,
};
use chrono::{DateTime, Utc};
use rusqlite::{
  OptionalExtension as _,
  ffi::{
    SQLITE_CONSTRAINT_FOREIGNKEY, SQLITE_CONSTRAINT_PRIMARYKEY,
    SQLITE_CONSTRAINT_UNIQUE,
  },
};

use crate::{
  Error, Result,
  encode::{RawFeedback, RawLead, decode_millis, encode_millis, encode_secs},
  error::constraint_code,
  schema::SCHEMA,
};

/// How long a connection waits on a locked database before the call fails
/// with a transient error.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const LEAD_COLUMNS: &str = "id, timestamp, name, email, message";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Boutique record store backed by a single SQLite file.
///
/// Each operation borrows the connection for the duration of one closure on
/// the connection's worker thread and releases it when the closure returns,
/// on success and on error alike. Nothing holds the connection across calls.
///
/// Cloning is cheap; the inner connection handle is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(
    path: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.configure(busy_timeout).await?;
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn configure(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LeadStore impl ──────────────────────────────────────────────────────────

impl LeadStore for SqliteStore {
  type Error = Error;

  async fn ensure_schema(&self) -> Result<()> { self.init_schema().await }

  // ── Leads ─────────────────────────────────────────────────────────────────

  async fn find_lead_by_email(&self, email: &str) -> Result<Option<Lead>> {
    let email = email.to_owned();

    let raw: Option<RawLead> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE email = ?1"),
              rusqlite::params![email],
              RawLead::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLead::into_lead).transpose()
  }

  async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>> {
    let raw: Option<RawLead> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
              rusqlite::params![id],
              RawLead::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLead::into_lead).transpose()
  }

  async fn create_lead(&self, lead: NewLead) -> Result<LeadId> {
    let NewLead { email, name, message, timestamp } = lead;
    let at = encode_secs(timestamp);
    let email_for_err = email.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO leads (timestamp, name, email, message)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![at, name, email, message],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await;

    match outcome {
      Ok(id) => {
        tracing::debug!(lead_id = id, "inserted lead");
        Ok(id)
      }
      Err(e) if constraint_code(&e) == Some(SQLITE_CONSTRAINT_UNIQUE) => {
        Err(Error::DuplicateEmail(email_for_err))
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn update_lead(&self, id: LeadId, update: LeadUpdate) -> Result<()> {
    let LeadUpdate { name, message, timestamp } = update;
    let at = encode_secs(timestamp);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE leads SET name = ?1, message = ?2, timestamp = ?3
           WHERE id = ?4",
          rusqlite::params![name, message, at, id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::LeadNotFound(id));
    }
    Ok(())
  }

  async fn list_leads(&self) -> Result<Vec<Lead>> {
    let raws: Vec<RawLead> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawLead::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLead::into_lead).collect()
  }

  // ── Feedback — append-only ────────────────────────────────────────────────

  async fn insert_feedback(
    &self,
    lead_id:   LeadId,
    question:  String,
    timestamp: DateTime<Utc>,
  ) -> Result<FeedbackEntry> {
    let at = encode_millis(timestamp);
    let stored_question = question.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO feedback (lead_id, timestamp, question)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![lead_id, at, stored_question],
        )?;
        Ok(())
      })
      .await;

    match outcome {
      Ok(()) => Ok(FeedbackEntry {
        lead_id,
        timestamp: decode_millis(at)?,
        question,
      }),
      Err(e) => match constraint_code(&e) {
        Some(SQLITE_CONSTRAINT_FOREIGNKEY) => Err(Error::MissingLead(lead_id)),
        Some(SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE) => {
          Err(Error::DuplicateFeedback { lead_id, timestamp_ms: at })
        }
        _ => Err(e.into()),
      },
    }
  }

  async fn list_feedback(
    &self,
    lead_id: Option<LeadId>,
  ) -> Result<Vec<FeedbackEntry>> {
    let raws: Vec<RawFeedback> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(id) = lead_id {
          let mut stmt = conn.prepare(
            "SELECT lead_id, timestamp, question FROM feedback
             WHERE lead_id = ?1 ORDER BY timestamp",
          )?;
          stmt
            .query_map(rusqlite::params![id], RawFeedback::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT lead_id, timestamp, question FROM feedback
             ORDER BY lead_id, timestamp",
          )?;
          stmt
            .query_map([], RawFeedback::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedback::into_entry).collect()
  }
}
