//! Detection of implied actions in a generated reply.
//!
//! The model has no structured tool-calling channel, so it is asked to wrap
//! any action it wants taken in an `<action>{…}</action>` envelope holding a
//! tagged JSON object. A valid envelope is the primary signal. Replies that
//! merely *describe* a call (`record_customer_interest(name='Lara', …)`) are
//! still recognised lexically, with looser argument extraction.
//!
//! In every branch the action text is removed from what the customer sees.
//! A reply with no action is returned byte-for-byte.

use std::sync::LazyLock;

use boutique_core::contact::is_plausible_email;
use regex::Regex;
use serde::Deserialize;

/// Marker naming the lead-capture action. Case-sensitive.
pub const INTEREST_MARKER: &str = "record_customer_interest";

/// Marker naming the feedback action. Case-sensitive.
pub const FEEDBACK_MARKER: &str = "record_feedback";

/// Argument token that also signals feedback.
pub const FEEDBACK_ARG: &str = "feedback=";

const ENVELOPE_OPEN: &str = "<action>";

static ENVELOPE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)<action>(.*?)</action>").expect("valid envelope regex")
});

static NAME_ARG: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"name=['"]?([\w ]+)['"]?"#).expect("valid name regex")
});

static EMAIL_ARG: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"email=['"]?([\w@.\-]+)['"]?"#).expect("valid email regex")
});

/// A customer's name and email as extracted from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
  pub name:  String,
  pub email: String,
}

impl Contact {
  /// Trimmed contact, or `None` if the name is blank or the email unusable.
  ///
  /// Punctuation closing the model's sentence (`email=lara@example.com.`) is
  /// not part of the address.
  fn validated(name: &str, email: &str) -> Option<Self> {
    let name = name.trim();
    let email = email.trim().trim_end_matches(['.', ',']);
    if name.is_empty() || !is_plausible_email(email) {
      return None;
    }
    Some(Self { name: name.to_owned(), email: email.to_owned() })
  }
}

/// What the reply asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
  /// Ordinary conversation.
  None,
  /// Capture a lead with these details.
  Interest(Contact),
  /// A lead capture was requested but its arguments could not be read.
  InterestUnparsed,
  /// Record the customer's message as unanswered feedback.
  Feedback,
}

/// Result of [`extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
  /// The customer-visible part of the reply, without any suffix.
  pub text:   String,
  pub intent: Intent,
}

/// The JSON object inside an `<action>` envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
  RecordCustomerInterest { name: String, email: String },
  RecordFeedback {},
}

/// Inspect `reply` for an action request.
pub fn extract(reply: &str) -> Extraction {
  if let Some(found) = from_envelope(reply) {
    return found;
  }
  from_markers(reply)
}

fn from_envelope(reply: &str) -> Option<Extraction> {
  let body = ENVELOPE.captures(reply)?.get(1)?.as_str().trim();

  let action = match serde_json::from_str::<Action>(body) {
    Ok(action) => action,
    Err(e) => {
      tracing::warn!(error = %e, "malformed action envelope, falling back to markers");
      return None;
    }
  };

  let intent = match action {
    Action::RecordCustomerInterest { name, email } => {
      match Contact::validated(&name, &email) {
        Some(contact) => Intent::Interest(contact),
        None => {
          tracing::warn!(%name, %email, "action envelope carried unusable contact details");
          Intent::InterestUnparsed
        }
      }
    }
    Action::RecordFeedback {} => Intent::Feedback,
  };

  Some(Extraction { text: visible_text(reply), intent })
}

fn from_markers(reply: &str) -> Extraction {
  if reply.contains(INTEREST_MARKER) {
    let name = NAME_ARG.captures(reply).and_then(|c| c.get(1));
    let email = EMAIL_ARG.captures(reply).and_then(|c| c.get(1));
    let intent = match name
      .zip(email)
      .and_then(|(n, e)| Contact::validated(n.as_str(), e.as_str()))
    {
      Some(contact) => Intent::Interest(contact),
      None => {
        tracing::warn!("interest marker found but name/email could not be extracted");
        Intent::InterestUnparsed
      }
    };
    return Extraction { text: visible_text(reply), intent };
  }

  if reply.contains(FEEDBACK_MARKER) || reply.contains(FEEDBACK_ARG) {
    return Extraction { text: visible_text(reply), intent: Intent::Feedback };
  }

  if reply.contains(ENVELOPE_OPEN) {
    tracing::warn!("unrecognised action envelope hidden from reply");
    return Extraction { text: visible_text(reply), intent: Intent::None };
  }

  Extraction { text: reply.to_owned(), intent: Intent::None }
}

/// `reply` without any envelope, cut before the first remaining marker or
/// unterminated `<action>`.
fn visible_text(reply: &str) -> String {
  let rest = ENVELOPE.replace_all(reply, "");
  let at = [INTEREST_MARKER, FEEDBACK_MARKER, FEEDBACK_ARG, ENVELOPE_OPEN]
    .iter()
    .filter_map(|m| rest.find(m))
    .min()
    .unwrap_or(rest.len());
  rest[..at].trim().to_owned()
}
