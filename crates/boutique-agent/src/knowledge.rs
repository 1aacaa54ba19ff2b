//! Business knowledge loaded once at startup and the system prompt built
//! from it.

use std::{io, path::Path};

use crate::intent::{FEEDBACK_MARKER, INTEREST_MARKER};

pub const SUMMARY_FILE: &str = "business_summary.txt";
pub const PROFILE_FILE: &str = "about_business.pdf";

/// Static facts about the business the assistant speaks for.
#[derive(Debug, Clone, Default)]
pub struct Knowledge {
  pub business_name: String,
  pub summary:       String,
  pub profile:       String,
}

impl Knowledge {
  /// Read [`SUMMARY_FILE`] and the text of [`PROFILE_FILE`] from `dir`.
  ///
  /// A missing file contributes an empty section, as does a profile PDF that
  /// cannot be parsed. Any other I/O failure on the summary is returned.
  pub fn load(dir: &Path, business_name: impl Into<String>) -> io::Result<Self> {
    Ok(Self {
      business_name: business_name.into(),
      summary:       read_optional(&dir.join(SUMMARY_FILE))?,
      profile:       read_pdf(&dir.join(PROFILE_FILE)),
    })
  }

  /// The instructions prepended to every conversation.
  pub fn system_prompt(&self) -> String {
    let name = &self.business_name;
    format!(
      "You are the assistant for **{name}**.

Your goals:
- Speak with a friendly, polished, concise tone.
- Use the official business information below to answer questions about
  products, sizing, sustainability, or policies.
- When a customer shows shopping interest, politely ask for their **name** and
  **email**. Once you have both, end your reply with
  <action>{{\"action\":\"{INTEREST_MARKER}\",\"name\":\"<name>\",\"email\":\"<email>\"}}</action>
- When you cannot answer a question from the information below, say so and end
  your reply with
  <action>{{\"action\":\"{FEEDBACK_MARKER}\"}}</action>
- Never show the action envelope's contents to the customer in any other form.

# Business Summary
{}

# Brand Profile
{}",
      self.summary.trim(),
      self.profile.trim(),
    )
    .trim()
    .to_owned()
  }
}

fn read_optional(path: &Path) -> io::Result<String> {
  match std::fs::read_to_string(path) {
    Ok(text) => Ok(text),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      tracing::warn!(path = %path.display(), "knowledge file missing, using empty section");
      Ok(String::new())
    }
    Err(e) => Err(e),
  }
}

/// Text of the PDF at `path`, or an empty string if it is absent or
/// unreadable.
fn read_pdf(path: &Path) -> String {
  if !path.exists() {
    tracing::warn!(path = %path.display(), "knowledge file missing, using empty section");
    return String::new();
  }
  // pdf-extract panics on some malformed documents.
  match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
    Ok(Ok(text)) => text,
    Ok(Err(e)) => {
      tracing::warn!(path = %path.display(), error = %e, "failed to extract PDF text, using empty section");
      String::new()
    }
    Err(_) => {
      tracing::warn!(path = %path.display(), "PDF extraction panicked, using empty section");
      String::new()
    }
  }
}
