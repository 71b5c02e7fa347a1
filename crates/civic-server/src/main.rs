//! civic-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, seeds the default accounts and serves the JSON API under `/api`.
//!
//! # Password hash generation
//!
//! The seeded accounts read their password from `seed_password_hash`; print
//! one with:
//!
//! ```
//! cargo run -p civic-server -- --hash-password
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::Router;
use civic_api::{AppState, api_router};
use civic_core::service::{AuthService, default_seed_users};
use civic_store_sqlite::SqliteStore;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Civic complaint portal server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  let session_ttl = chrono::TimeDelta::try_hours(server_cfg.session_ttl_hours)
    .context("`session_ttl_hours` is out of range")?;
  let auth = AuthService::new(store.clone()).with_session_ttl(session_ttl);
  if server_cfg.seed_users {
    let hash = server_cfg.seed_password_hash.as_deref().context(
      "`seed_password_hash` must be set when `seed_users` is enabled; \
       generate one with `civic-server --hash-password`",
    )?;
    let seeded = auth
      .seed_users(&default_seed_users(hash))
      .await
      .context("failed to seed default users")?;
    if seeded == 0 {
      tracing::debug!("users already present; seeding skipped");
    }
  }

  let state = AppState::new(
    store,
    auth,
    Duration::from_millis(server_cfg.chat_typing_delay_ms),
  )
  .with_chat_limits(
    Duration::from_secs(server_cfg.chat_idle_timeout_secs),
    server_cfg.max_chat_sessions,
  );
  let app = Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
