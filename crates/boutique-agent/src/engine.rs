//! [`LeadBook`]: the upsert/dedup engine over a [`LeadStore`].
//!
//! The store offers only single-statement operations, so "find, then create
//! or update" is not atomic. Two sessions can both miss on the same email and
//! race to insert it. The store's unique constraint rejects the loser, which
//! this engine absorbs by re-reading the winner and updating it instead.

use std::sync::Arc;

use boutique_core::{
  contact,
  feedback::FeedbackEntry,
  lead::{Lead, LeadId, LeadUpdate, NewLead},
  store::{Fault, LeadStore, StoreFault},
};
use chrono::{DateTime, TimeDelta, Utc};

use crate::{Error, Result, retry::RetryPolicy};

/// How many successive milliseconds `record_feedback` tries before giving up
/// on a free `(lead_id, timestamp)` key.
const FEEDBACK_SLOT_ATTEMPTS: u32 = 64;

pub const FEEDBACK_CONFIRMATION: &str =
  "Thank you! We've saved your feedback for follow-up 👗";

pub fn interest_confirmation(name: &str) -> String {
  format!("Thanks, {name}! We've saved your interest and our team will reach out soon 💌")
}

/// Outcome of [`LeadBook::record_customer_interest`].
#[derive(Debug, Clone)]
pub struct InterestRecorded {
  pub lead_id:      LeadId,
  /// `false` when an existing lead for the email was updated.
  pub created:      bool,
  pub confirmation: String,
}

/// Outcome of [`LeadBook::record_feedback`].
#[derive(Debug, Clone)]
pub struct FeedbackRecorded {
  pub entry:               FeedbackEntry,
  /// `true` when no lead existed for the email and a placeholder was made.
  pub placeholder_created: bool,
  pub confirmation:        String,
}

/// Create-or-update of leads keyed by email, plus feedback recording.
pub struct LeadBook<S> {
  store: Arc<S>,
  retry: RetryPolicy,
}

impl<S> Clone for LeadBook<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), retry: self.retry }
  }
}

impl<S: LeadStore> LeadBook<S> {
  pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self { Self { store, retry } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Record that the customer behind `email` is interested.
  ///
  /// Creates the lead on first sight of the email; afterwards overwrites its
  /// name and message and bumps its timestamp, keeping the id. Repeating the
  /// same call converges on the same single row.
  pub async fn record_customer_interest(
    &self,
    email: &str,
    name: &str,
    message: &str,
  ) -> Result<InterestRecorded> {
    let email = contact::normalize_email(email)?;
    let name = contact::require("name", name)?;
    let update = LeadUpdate {
      name:      name.clone(),
      message:   message.trim().to_owned(),
      timestamp: Utc::now(),
    };

    if let Some(lead) = self.find(&email).await? {
      self.update(lead.id, update).await?;
      tracing::info!(lead_id = lead.id, %email, "updated existing lead");
      return Ok(InterestRecorded {
        lead_id:      lead.id,
        created:      false,
        confirmation: interest_confirmation(&name),
      });
    }

    let new = NewLead {
      email:     email.clone(),
      name:      update.name.clone(),
      message:   update.message.clone(),
      timestamp: update.timestamp,
    };
    let (lead_id, created) = match self.create(new).await? {
      Some(id) => {
        tracing::info!(lead_id = id, %email, "new lead added");
        (id, true)
      }
      None => {
        let lead = self.reread_after_conflict(&email).await?;
        self.update(lead.id, update).await?;
        (lead.id, false)
      }
    };

    Ok(InterestRecorded {
      lead_id,
      created,
      confirmation: interest_confirmation(&name),
    })
  }

  /// Record a question the assistant could not answer.
  ///
  /// Links the entry to the lead for `email`, creating an anonymous
  /// placeholder lead if there is none. Every call appends a new entry; at
  /// most one placeholder is ever created per email.
  pub async fn record_feedback(
    &self,
    email: &str,
    question: &str,
  ) -> Result<FeedbackRecorded> {
    let email = contact::normalize_email(email)?;
    let question = contact::require("question", question)?;

    let (mut lead_id, placeholder_created) = self.resolve_for_feedback(&email).await?;
    let mut at = Utc::now();
    let mut reresolved = false;

    for _ in 0..FEEDBACK_SLOT_ATTEMPTS {
      match self.insert_feedback(lead_id, &question, at).await {
        Ok(entry) => {
          tracing::info!(lead_id, %email, "feedback logged");
          return Ok(FeedbackRecorded {
            entry,
            placeholder_created,
            confirmation: FEEDBACK_CONFIRMATION.to_owned(),
          });
        }
        Err(e) => match e.fault() {
          Fault::Conflict => {
            tracing::debug!(lead_id, "feedback timestamp taken, advancing 1ms");
            at += TimeDelta::milliseconds(1);
          }
          Fault::MissingParent if !reresolved => {
            tracing::warn!(lead_id, %email, "feedback parent missing, re-resolving lead");
            reresolved = true;
            lead_id = self.resolve_for_feedback(&email).await?.0;
          }
          _ => return Err(Error::store(e)),
        },
      }
    }

    Err(Error::FeedbackSlotsExhausted(lead_id))
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// The lead for `email`, or a freshly created placeholder.
  async fn resolve_for_feedback(&self, email: &str) -> Result<(LeadId, bool)> {
    if let Some(lead) = self.find(email).await? {
      return Ok((lead.id, false));
    }
    match self.create(NewLead::placeholder(email, Utc::now())).await? {
      Some(id) => {
        tracing::info!(lead_id = id, %email, "placeholder lead created");
        Ok((id, true))
      }
      None => Ok((self.reread_after_conflict(email).await?.id, false)),
    }
  }

  async fn reread_after_conflict(&self, email: &str) -> Result<Lead> {
    tracing::warn!(%email, "lead created concurrently, using the existing row");
    self
      .find(email)
      .await?
      .ok_or_else(|| Error::LeadVanished(email.to_owned()))
  }

  async fn find(&self, email: &str) -> Result<Option<Lead>> {
    self
      .retry
      .run("find_lead_by_email", || self.store.find_lead_by_email(email))
      .await
      .map_err(Error::store)
  }

  /// `Ok(None)` when the email was taken between lookup and insert.
  async fn create(&self, lead: NewLead) -> Result<Option<LeadId>> {
    match self
      .retry
      .run("create_lead", || self.store.create_lead(lead.clone()))
      .await
    {
      Ok(id) => Ok(Some(id)),
      Err(e) if e.fault() == Fault::Conflict => Ok(None),
      Err(e) => Err(Error::store(e)),
    }
  }

  async fn update(&self, id: LeadId, update: LeadUpdate) -> Result<()> {
    self
      .retry
      .run("update_lead", || self.store.update_lead(id, update.clone()))
      .await
      .map_err(Error::store)
  }

  async fn insert_feedback(
    &self,
    lead_id: LeadId,
    question: &str,
    at: DateTime<Utc>,
  ) -> Result<FeedbackEntry, S::Error> {
    self
      .retry
      .run("insert_feedback", || {
        self.store.insert_feedback(lead_id, question.to_owned(), at)
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
  };

  use boutique_core::lead::PLACEHOLDER_NAME;
  use boutique_store_sqlite::SqliteStore;

  use super::*;

  async fn book() -> LeadBook<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    LeadBook::new(Arc::new(store), RetryPolicy::none())
  }

  // ─── Interest ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn first_interest_creates_lead() {
    let b = book().await;
    let out = b
      .record_customer_interest(" lara@example.com ", " Lara ", " fitting please ")
      .await
      .unwrap();
    assert!(out.created);
    assert!(out.confirmation.contains("Lara"));

    let lead = b.store().get_lead(out.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.email, "lara@example.com");
    assert_eq!(lead.name, "Lara");
    assert_eq!(lead.message, "fitting please");
  }

  #[tokio::test]
  async fn repeated_interest_converges_on_one_row() {
    let b = book().await;
    let first = b.record_customer_interest("a@x.com", "A", "m1").await.unwrap();
    let second = b.record_customer_interest("a@x.com", "B", "m2").await.unwrap();

    assert!(!second.created);
    assert_eq!(first.lead_id, second.lead_id);

    let leads = b.store().list_leads().await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].id, first.lead_id);
    assert_eq!(leads[0].name, "B");
    assert_eq!(leads[0].message, "m2");
  }

  #[tokio::test]
  async fn one_row_per_distinct_email() {
    let b = book().await;
    for (email, name) in [
      ("a@x.com", "A"),
      ("b@x.com", "B"),
      (" a@x.com", "A2"),
      ("b@x.com ", "B2"),
      ("c@x.com", "C"),
      ("a@x.com", "A3"),
    ] {
      b.record_customer_interest(email, name, "hi").await.unwrap();
    }

    let mut emails: Vec<_> = b
      .store()
      .list_leads()
      .await
      .unwrap()
      .into_iter()
      .map(|l| l.email)
      .collect();
    emails.sort();
    assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
  }

  #[tokio::test]
  async fn interest_rejects_blank_name_without_writing() {
    let b = book().await;
    let err = b.record_customer_interest("a@x.com", "  ", "m").await.unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));
    assert!(b.store().list_leads().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn interest_claims_placeholder_lead() {
    let b = book().await;
    let fb = b.record_feedback("a@x.com", "q").await.unwrap();
    let out = b.record_customer_interest("a@x.com", "Ann", "hi").await.unwrap();

    assert!(!out.created);
    assert_eq!(out.lead_id, fb.entry.lead_id);
    let lead = b.store().get_lead(out.lead_id).await.unwrap().unwrap();
    assert!(!lead.is_placeholder());
  }

  // ─── Feedback ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn feedback_for_unseen_email_creates_placeholder() {
    let b = book().await;
    let out = b.record_feedback("new@x.com", "do you ship abroad?").await.unwrap();
    assert!(out.placeholder_created);
    assert_eq!(out.confirmation, FEEDBACK_CONFIRMATION);

    let leads = b.store().list_leads().await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].name, PLACEHOLDER_NAME);
    assert!(leads[0].is_placeholder());

    let feedback = b.store().list_feedback(None).await.unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].lead_id, leads[0].id);
    assert_eq!(feedback[0].question, "do you ship abroad?");
  }

  #[tokio::test]
  async fn feedback_accumulates_under_one_lead() {
    let b = book().await;
    let first = b.record_feedback("a@x.com", "q1").await.unwrap();
    let second = b.record_feedback("a@x.com", "q2").await.unwrap();
    assert!(first.placeholder_created);
    assert!(!second.placeholder_created);

    let leads = b.store().list_leads().await.unwrap();
    assert_eq!(leads.len(), 1);

    let feedback = b.store().list_feedback(None).await.unwrap();
    assert_eq!(feedback.len(), 2);
    assert!(feedback.iter().all(|f| f.lead_id == leads[0].id));
  }

  #[tokio::test]
  async fn rapid_feedback_never_collides() {
    let b = book().await;
    for i in 0..25 {
      b.record_feedback("a@x.com", &format!("q{i}")).await.unwrap();
    }
    assert_eq!(b.store().list_feedback(None).await.unwrap().len(), 25);
  }

  #[tokio::test]
  async fn feedback_links_to_existing_lead() {
    let b = book().await;
    let lead = b.record_customer_interest("a@x.com", "A", "m").await.unwrap();
    let fb = b.record_feedback("a@x.com", "q").await.unwrap();

    assert!(!fb.placeholder_created);
    assert_eq!(fb.entry.lead_id, lead.lead_id);
    let stored = b.store().get_lead(lead.lead_id).await.unwrap().unwrap();
    assert_eq!(stored.name, "A");
  }

  #[tokio::test]
  async fn every_feedback_references_an_existing_lead() {
    let b = book().await;
    b.record_feedback("a@x.com", "q1").await.unwrap();
    b.record_customer_interest("b@x.com", "B", "m").await.unwrap();
    b.record_feedback("b@x.com", "q2").await.unwrap();
    b.record_feedback("c@x.com", "q3").await.unwrap();

    let ids: Vec<_> = b
      .store()
      .list_leads()
      .await
      .unwrap()
      .into_iter()
      .map(|l| l.id)
      .collect();
    for entry in b.store().list_feedback(None).await.unwrap() {
      assert!(ids.contains(&entry.lead_id));
    }
  }

  // ─── Fault injection ───────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  enum ScriptedError {
    #[error(transparent)]
    Inner(#[from] boutique_store_sqlite::Error),
    #[error("injected {0:?}")]
    Injected(Fault),
  }

  impl StoreFault for ScriptedError {
    fn fault(&self) -> Fault {
      match self {
        Self::Inner(e) => e.fault(),
        Self::Injected(f) => *f,
      }
    }
  }

  /// Wraps a real store and misbehaves on cue.
  #[derive(Default)]
  struct Script {
    /// Lookups that report "not found" regardless of the data.
    stale_finds:  AtomicU32,
    /// Creates that fail with a transient fault before reaching the store.
    busy_creates: AtomicU32,
    /// Feedback inserts that report their key as taken.
    conflict_feedback: AtomicU32,
    /// Feedback inserts that report their parent lead as gone.
    missing_parent_feedback: AtomicU32,
    /// Every timestamp a feedback insert was attempted with.
    feedback_attempts: Mutex<Vec<DateTime<Utc>>>,
  }

  fn take(counter: &AtomicU32) -> bool {
    counter
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
  }

  struct ScriptedStore {
    inner:  SqliteStore,
    script: Script,
  }

  impl LeadStore for ScriptedStore {
    type Error = ScriptedError;

    async fn ensure_schema(&self) -> Result<(), ScriptedError> {
      Ok(self.inner.ensure_schema().await?)
    }

    async fn find_lead_by_email(&self, email: &str) -> Result<Option<Lead>, ScriptedError> {
      if take(&self.script.stale_finds) {
        return Ok(None);
      }
      Ok(self.inner.find_lead_by_email(email).await?)
    }

    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, ScriptedError> {
      Ok(self.inner.get_lead(id).await?)
    }

    async fn create_lead(&self, lead: NewLead) -> Result<LeadId, ScriptedError> {
      if take(&self.script.busy_creates) {
        return Err(ScriptedError::Injected(Fault::Transient));
      }
      Ok(self.inner.create_lead(lead).await?)
    }

    async fn update_lead(&self, id: LeadId, update: LeadUpdate) -> Result<(), ScriptedError> {
      Ok(self.inner.update_lead(id, update).await?)
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, ScriptedError> {
      Ok(self.inner.list_leads().await?)
    }

    async fn insert_feedback(
      &self,
      lead_id: LeadId,
      question: String,
      timestamp: DateTime<Utc>,
    ) -> Result<FeedbackEntry, ScriptedError> {
      self.script.feedback_attempts.lock().unwrap().push(timestamp);
      if take(&self.script.conflict_feedback) {
        return Err(ScriptedError::Injected(Fault::Conflict));
      }
      if take(&self.script.missing_parent_feedback) {
        return Err(ScriptedError::Injected(Fault::MissingParent));
      }
      Ok(self.inner.insert_feedback(lead_id, question, timestamp).await?)
    }

    async fn list_feedback(&self, lead_id: Option<LeadId>) -> Result<Vec<FeedbackEntry>, ScriptedError> {
      Ok(self.inner.list_feedback(lead_id).await?)
    }
  }

  async fn scripted(script: Script, retry: RetryPolicy) -> LeadBook<ScriptedStore> {
    let inner = SqliteStore::open_in_memory().await.expect("in-memory store");
    LeadBook::new(Arc::new(ScriptedStore { inner, script }), retry)
  }

  #[tokio::test]
  async fn lost_create_race_updates_the_winner() {
    let b = scripted(Script::default(), RetryPolicy::none()).await;
    let winner = b.record_customer_interest("a@x.com", "A", "m1").await.unwrap();

    // The next lookup misses, as if another session had not committed yet.
    b.store().script.stale_finds.store(1, Ordering::SeqCst);
    let loser = b.record_customer_interest("a@x.com", "B", "m2").await.unwrap();

    assert!(!loser.created);
    assert_eq!(loser.lead_id, winner.lead_id);
    let leads = b.store().list_leads().await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].name, "B");
  }

  #[tokio::test]
  async fn lost_placeholder_race_reuses_existing_lead() {
    let b = scripted(Script::default(), RetryPolicy::none()).await;
    b.record_feedback("a@x.com", "q1").await.unwrap();

    b.store().script.stale_finds.store(1, Ordering::SeqCst);
    let out = b.record_feedback("a@x.com", "q2").await.unwrap();

    assert!(!out.placeholder_created);
    assert_eq!(b.store().list_leads().await.unwrap().len(), 1);
    assert_eq!(b.store().list_feedback(None).await.unwrap().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn transient_create_failures_are_retried() {
    let script = Script { busy_creates: AtomicU32::new(2), ..Script::default() };
    let b = scripted(script, RetryPolicy { attempts: 3, backoff_ms: 5 }).await;

    let out = b.record_customer_interest("a@x.com", "A", "m").await.unwrap();
    assert!(out.created);
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_retries_surface_as_store_error() {
    let script = Script { busy_creates: AtomicU32::new(5), ..Script::default() };
    let b = scripted(script, RetryPolicy { attempts: 2, backoff_ms: 5 }).await;

    let err = b.record_customer_interest("a@x.com", "A", "m").await.unwrap_err();
    assert!(matches!(err, Error::Store { fault: Fault::Transient, .. }));
    assert!(b.store().list_leads().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn taken_feedback_slot_advances_one_millisecond() {
    let script = Script { conflict_feedback: AtomicU32::new(1), ..Script::default() };
    let b = scripted(script, RetryPolicy::none()).await;

    let out = b.record_feedback("a@x.com", "q").await.unwrap();

    let attempts = b.store().script.feedback_attempts.lock().unwrap().clone();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1] - attempts[0], TimeDelta::milliseconds(1));
    assert_eq!(out.entry.timestamp.timestamp_millis(), attempts[1].timestamp_millis());
    assert_eq!(b.store().list_feedback(None).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn every_slot_taken_gives_up() {
    let script = Script {
      conflict_feedback: AtomicU32::new(FEEDBACK_SLOT_ATTEMPTS),
      ..Script::default()
    };
    let b = scripted(script, RetryPolicy::none()).await;

    let err = b.record_feedback("a@x.com", "q").await.unwrap_err();
    assert!(matches!(err, Error::FeedbackSlotsExhausted(_)));
    assert!(b.store().list_feedback(None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn missing_parent_is_resolved_again_once() {
    let script = Script { missing_parent_feedback: AtomicU32::new(1), ..Script::default() };
    let b = scripted(script, RetryPolicy::none()).await;

    let out = b.record_feedback("a@x.com", "q").await.unwrap();
    let leads = b.store().list_leads().await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(out.entry.lead_id, leads[0].id);
    assert_eq!(b.store().list_feedback(None).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn missing_parent_twice_surfaces_as_store_error() {
    let script = Script { missing_parent_feedback: AtomicU32::new(2), ..Script::default() };
    let b = scripted(script, RetryPolicy::none()).await;

    let err = b.record_feedback("a@x.com", "q").await.unwrap_err();
    assert!(matches!(err, Error::Store { fault: Fault::MissingParent, .. }));
    assert!(b.store().list_feedback(None).await.unwrap().is_empty());
  }
}
