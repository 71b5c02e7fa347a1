//! Error types for `civic-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("email already registered: {0}")]
  DuplicateEmail(String),

  #[error("phone number already registered: {0}")]
  DuplicatePhone(String),

  #[error("user not found: {0}")]
  UserNotFound(uuid::Uuid),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("unknown complaint category: {0:?}")]
  UnknownCategory(String),

  #[error("the assistant is still typing a reply")]
  ChatBusy,

  #[error("no message is waiting for a reply")]
  ChatIdle,

  #[error("message is empty")]
  EmptyMessage,

  #[error("no free complaint id after {0} attempts")]
  ComplaintIdExhausted(usize),

  #[error("password hashing error: {0}")]
  PasswordHash(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
