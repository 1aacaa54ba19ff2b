//! Error type for `boutique-agent`.

use boutique_core::{
  lead::LeadId,
  store::{Fault, StoreFault},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  Invalid(#[from] boutique_core::Error),

  /// A store call failed with a fault the engine does not absorb, or a
  /// transient fault outlived the retry budget.
  #[error("store error ({fault:?}): {source}")]
  Store {
    fault:  Fault,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The store reported a duplicate email but a re-read found nothing.
  #[error("lead for {0:?} disappeared while being recorded")]
  LeadVanished(String),

  #[error("no free feedback timestamp for lead {0}")]
  FeedbackSlotsExhausted(LeadId),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + StoreFault + Send + Sync + 'static,
  {
    Self::Store { fault: err.fault(), source: Box::new(err) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
