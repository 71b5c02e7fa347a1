//! Runtime configuration, deserialised from `config.toml` and `CIVIC_*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// Milliseconds the chat assistant "types" before replying.
  #[serde(default = "default_typing_delay")]
  pub chat_typing_delay_ms: u64,
  /// Idle chat sessions are dropped after this many seconds.
  #[serde(default = "default_chat_idle_timeout")]
  pub chat_idle_timeout_secs: u64,
  /// Most chat sessions held at once; the least recently used goes first.
  #[serde(default = "default_max_chat_sessions")]
  pub max_chat_sessions:    usize,
  /// Login sessions expire this many hours after they are opened.
  #[serde(default = "default_session_ttl")]
  pub session_ttl_hours:    i64,
  /// Insert the default admin, official and citizen into an empty store.
  #[serde(default = "default_true")]
  pub seed_users:           bool,
  /// Argon2 PHC string shared by the seeded accounts, from
  /// `civic-server --hash-password`. Required when `seed_users` is set.
  pub seed_password_hash:   Option<String>,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/civic/portal.db") }

fn default_typing_delay() -> u64 { 600 }

fn default_chat_idle_timeout() -> u64 { 30 * 60 }

fn default_max_chat_sessions() -> usize { 1000 }

fn default_session_ttl() -> i64 { 24 * 7 }

fn default_true() -> bool { true }

impl ServerConfig {
  /// Layer `path` (optional) under `CIVIC_*` environment variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CIVIC"))
      .build()?
      .try_deserialize()
  }
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
