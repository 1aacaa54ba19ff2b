//! [`Assistant`]: one chat turn from user text to customer-visible reply.
//!
//! The assistant never shows raw model or storage errors. Every path ends in
//! natural-language text; fixed strings cover the failure cases.

use std::sync::{Arc, LazyLock};

use boutique_core::{contact::is_plausible_email, store::LeadStore};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
  engine::LeadBook,
  generator::{GenerationError, Generator},
  intent::{self, Intent},
  knowledge::Knowledge,
};

/// Appended after a lead was saved.
pub const INTEREST_SUFFIX: &str = "\n\n💌 Thanks! Your interest has been saved.";

/// Appended after feedback was saved.
pub const FEEDBACK_SUFFIX: &str = "\n\n💖 Your feedback has been noted for follow-up.";

/// Appended when a lead capture was requested without readable details.
pub const MISSING_DETAILS_SUFFIX: &str =
  "\n\n📝 Could you share your name and email so our team can follow up?";

/// Appended when a record could not be persisted.
pub const UNCONFIRMED_SUFFIX: &str =
  "\n\n🙏 Thanks! We couldn't confirm that your details were saved, so please mention them again if you don't hear from us.";

/// Reply when the model produced no usable text.
pub const EMPTY_REPLY: &str =
  "💭 Sorry, I wasn't able to generate a proper reply this time. Could you please rephrase that?";

/// Reply when the model call failed outright.
pub const FAILED_REPLY: &str = "⚠️ Something went wrong while processing your message. Please try again.";

/// Email used for feedback when the session never mentioned one.
pub const ANONYMOUS_EMAIL: &str = "anonymous@example.com";

const EMAIL_NOTE: &str = " (Note: this email is shared for business contact purposes only.)";

static EMAIL_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[\w.+\-]+@[\w\-]+(?:\.[\w\-]+)+").expect("valid email regex")
});

/// One past (user, assistant) pair of the session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
  pub user:      String,
  pub assistant: String,
}

/// Turn handler: generator → intent extraction → lead book.
pub struct Assistant<S, G> {
  book:          LeadBook<S>,
  generator:     G,
  system_prompt: Arc<str>,
}

impl<S: LeadStore, G: Generator> Assistant<S, G> {
  pub fn new(book: LeadBook<S>, generator: G, knowledge: &Knowledge) -> Self {
    Self {
      book,
      generator,
      system_prompt: knowledge.system_prompt().into(),
    }
  }

  pub fn book(&self) -> &LeadBook<S> { &self.book }

  /// The full prompt for a turn: instructions, transcript, then the new
  /// message.
  pub fn build_prompt(&self, user_message: &str, history: &[Exchange]) -> String {
    let mut prompt = format!("{}\n\nConversation so far:\n", self.system_prompt);
    for turn in history {
      prompt.push_str(&format!("User: {}\nAssistant: {}\n", turn.user, turn.assistant));
    }
    let note = if user_message.contains('@') { EMAIL_NOTE } else { "" };
    prompt.push_str(&format!("User: {user_message}{note}\nAssistant:"));
    prompt
  }

  /// Generate a reply for `user_message` and act on any action it implies.
  pub async fn respond(&self, user_message: &str, history: &[Exchange]) -> String {
    let prompt = self.build_prompt(user_message, history);

    let reply = match self.generator.generate(&prompt).await {
      Ok(text) if !text.trim().is_empty() => text,
      Ok(_) | Err(GenerationError::Empty(_)) => {
        tracing::warn!("model returned an empty or filtered reply");
        return EMPTY_REPLY.to_owned();
      }
      Err(e) => {
        tracing::error!(error = %e, "model call failed");
        return FAILED_REPLY.to_owned();
      }
    };

    self.handle_reply(user_message, history, reply.trim()).await
  }

  /// Act on `reply` and return what the customer should see.
  ///
  /// `user_message` becomes the lead message or the feedback question.
  /// `history` supplies the customer's email for feedback when one was
  /// mentioned earlier in the session.
  pub async fn handle_reply(
    &self,
    user_message: &str,
    history: &[Exchange],
    reply: &str,
  ) -> String {
    let extraction = intent::extract(reply);

    let suffix = match extraction.intent {
      Intent::None => return extraction.text,
      Intent::Interest(contact) => {
        match self
          .book
          .record_customer_interest(&contact.email, &contact.name, user_message)
          .await
        {
          Ok(_) => INTEREST_SUFFIX,
          Err(e) => {
            tracing::error!(error = %e, email = %contact.email, "failed to record interest");
            UNCONFIRMED_SUFFIX
          }
        }
      }
      Intent::InterestUnparsed => MISSING_DETAILS_SUFFIX,
      Intent::Feedback => {
        let email = session_email(user_message, history)
          .unwrap_or_else(|| ANONYMOUS_EMAIL.to_owned());
        match self.book.record_feedback(&email, user_message).await {
          Ok(_) => FEEDBACK_SUFFIX,
          Err(e) => {
            tracing::error!(error = %e, %email, "failed to record feedback");
            UNCONFIRMED_SUFFIX
          }
        }
      }
    };

    format!("{}{suffix}", extraction.text).trim_start().to_owned()
  }
}

/// The most recent plausible email the customer typed this session.
fn session_email(user_message: &str, history: &[Exchange]) -> Option<String> {
  std::iter::once(user_message)
    .chain(history.iter().rev().map(|t| t.user.as_str()))
    .find_map(|text| {
      EMAIL_IN_TEXT
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.'))
        .filter(|e| is_plausible_email(e))
        .last()
        .map(str::to_owned)
    })
}
