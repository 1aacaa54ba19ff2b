//! boutique binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store in the data directory, loads the business knowledge files, and then
//! either serves the JSON API over HTTP or runs a chat session on stdin.
//!
//! ```
//! cargo run -p boutique-server -- serve
//! cargo run -p boutique-server -- chat
//! ```

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use boutique_agent::{
  assistant::{Assistant, Exchange},
  engine::LeadBook,
  generator::{GeminiGenerator, Generator},
  knowledge::Knowledge,
};
use boutique_core::store::LeadStore;
use boutique_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::{
  io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
  net::TcpListener,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Boutique shop assistant")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Command {
  /// Serve the JSON API over HTTP (default).
  #[default]
  Serve,
  /// Chat with the assistant on stdin/stdout.
  Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so they never interleave with chat output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  // Open SQLite store, creating the data directory on first use.
  let store_path = cfg.store_path();
  if let Some(dir) = store_path.parent() {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create data directory {dir:?}"))?;
  }
  let store = SqliteStore::open(&store_path, cfg.busy_timeout())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::info!(path = ?store_path, "store ready");

  let knowledge_dir = expand_tilde(&cfg.knowledge_dir);
  let knowledge = Knowledge::load(&knowledge_dir, cfg.business_name.clone())
    .with_context(|| format!("failed to read knowledge from {knowledge_dir:?}"))?;

  let generator =
    GeminiGenerator::new(&cfg.model).context("failed to set up model client")?;

  let book = LeadBook::new(Arc::new(store), cfg.retry);
  let assistant = Assistant::new(book, generator, &knowledge);

  match cli.command.unwrap_or_default() {
    Command::Serve => serve(&cfg, assistant).await,
    Command::Chat => chat(&cfg, assistant).await,
  }
}

async fn serve<S, G>(cfg: &AppConfig, assistant: Assistant<S, G>) -> anyhow::Result<()>
where
  S: LeadStore + 'static,
  G: Generator + 'static,
{
  let app = boutique_api::api_router(Arc::new(assistant));
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Line-oriented chat on stdin. The transcript lives only as long as the
/// session.
async fn chat<S, G>(cfg: &AppConfig, assistant: Assistant<S, G>) -> anyhow::Result<()>
where
  S: LeadStore,
  G: Generator,
{
  let mut stdout = tokio::io::stdout();
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut history: Vec<Exchange> = Vec::new();

  stdout
    .write_all(
      format!(
        "Welcome to {}! Ask anything about collections, sizing, or policies. \
         Type /quit to leave.\n> ",
        cfg.business_name
      )
      .as_bytes(),
    )
    .await?;
  stdout.flush().await?;

  while let Some(line) = lines.next_line().await? {
    let message = line.trim();
    if message == "/quit" {
      break;
    }
    if !message.is_empty() {
      let reply = assistant.respond(message, &history).await;
      stdout.write_all(format!("\n{reply}\n\n").as_bytes()).await?;
      history.push(Exchange { user: message.to_owned(), assistant: reply });
    }
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
  }

  Ok(())
}
