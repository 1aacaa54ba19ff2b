//! Process-wide configuration, built once at startup.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use boutique_agent::{generator::ModelConfig, retry::RetryPolicy};
use serde::Deserialize;

/// File name of the SQLite store inside `data_dir`.
pub const STORE_FILE: &str = "boutique.db";

/// Runtime configuration, deserialised from `config.toml` and `BOUTIQUE_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
  pub host:            String,
  pub port:            u16,
  pub data_dir:        PathBuf,
  pub knowledge_dir:   PathBuf,
  pub business_name:   String,
  pub busy_timeout_ms: u64,
  pub model:           ModelConfig,
  pub retry:           RetryPolicy,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      host:            "127.0.0.1".to_owned(),
      port:            8080,
      data_dir:        PathBuf::from("data"),
      knowledge_dir:   PathBuf::from("me"),
      business_name:   "Tam's Store".to_owned(),
      busy_timeout_ms: 5_000,
      model:           ModelConfig::default(),
      retry:           RetryPolicy::default(),
    }
  }
}

impl AppConfig {
  /// Layer the optional file at `path` under `BOUTIQUE_*` environment
  /// variables (nested keys separated by `__`).
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("BOUTIQUE")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")
  }

  /// Path of the SQLite file, with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.data_dir).join(STORE_FILE) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
