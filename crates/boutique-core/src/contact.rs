//! Normalisation and validation of customer-supplied contact details.

use crate::{Error, Result};

/// Trim `value` and reject it if nothing is left.
pub fn require(field: &'static str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::EmptyField(field));
  }
  Ok(trimmed.to_owned())
}

/// Trim an email address and check that it has the rough shape of one.
///
/// Matching stays case-sensitive: the address is returned exactly as given,
/// minus surrounding whitespace.
pub fn normalize_email(value: &str) -> Result<String> {
  let email = require("email", value)?;
  if is_plausible_email(&email) {
    Ok(email)
  } else {
    Err(Error::InvalidEmail(email))
  }
}

/// `local@domain` with no whitespace, a non-empty local part and a domain of
/// non-empty dot-separated labels. Single-label domains (`lara@shop`) pass.
pub fn is_plausible_email(value: &str) -> bool {
  if value.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = value.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain.split('.').all(|label| !label.is_empty())
}
