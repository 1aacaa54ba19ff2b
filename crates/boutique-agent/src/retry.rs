//! Bounded retry of store calls that fail with a transient fault.

use std::{fmt::Display, future::Future, time::Duration};

use boutique_core::store::StoreFault;
use serde::Deserialize;

/// Retry budget for a single store call.
///
/// The delay doubles after every failed attempt, starting at `backoff_ms`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts including the first. Values below 1 behave as 1.
  pub attempts:   u32,
  pub backoff_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { attempts: 3, backoff_ms: 50 } }
}

impl RetryPolicy {
  /// A policy that never retries.
  pub fn none() -> Self { Self { attempts: 1, backoff_ms: 0 } }

  fn delay(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(self.backoff_ms).saturating_mul(factor)
  }

  /// Run `op` until it succeeds, fails with a non-transient fault, or the
  /// attempt budget runs out. The last error is returned unchanged.
  pub async fn run<T, E, F, Fut>(&self, label: &'static str, mut op: F) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: StoreFault + Display,
  {
    let attempts = self.attempts.max(1);
    let mut attempt = 1;
    loop {
      match op().await {
        Err(e) if e.is_transient() && attempt < attempts => {
          let delay = self.delay(attempt);
          tracing::warn!(op = label, attempt, error = %e, ?delay, "transient store error, retrying");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) if e.is_transient() => {
          tracing::error!(op = label, attempts, error = %e, "store retries exhausted");
          return Err(e);
        }
        other => return other,
      }
    }
  }
}
