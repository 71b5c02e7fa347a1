//! Login, registration and session handling.
//!
//! Sessions replace the browser's "current user" slot: the user object is
//! serialised into the store's key-value section under a key derived from the
//! bearer token, and rehydrated on every lookup. Only the SHA-256 digest of a
//! token is ever written. Sessions expire after a fixed lifetime; expired
//! rows are removed on lookup and whenever a new session is opened.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::PortalStore,
  user::{ProfileUpdate, Registration, Role, Session, User, UserRecord},
};

const SESSION_PREFIX: &str = "session:";
const MIN_PASSWORD_LEN: usize = 6;
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// An account created at startup when the user list is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
  pub name:          String,
  pub email:         String,
  pub phone:         String,
  pub role:          Role,
  pub department:    Option<String>,
  /// Argon2 PHC string, as printed by `civic-server --hash-password`.
  pub password_hash: String,
}

/// One admin, one official and one citizen sharing `password_hash`.
pub fn default_seed_users(password_hash: &str) -> Vec<SeedUser> {
  let seed = |name: &str, email: &str, phone: &str, role, department: Option<&str>| {
    SeedUser {
      name: name.to_owned(),
      email: email.to_owned(),
      phone: phone.to_owned(),
      role,
      department: department.map(str::to_owned),
      password_hash: password_hash.to_owned(),
    }
  };
  vec![
    seed("Portal Admin", "admin@tsc.gov.in", "9000000001", Role::Admin, None),
    seed(
      "Water Board Officer",
      "official@tsc.gov.in",
      "9000000002",
      Role::Official,
      Some("water"),
    ),
    seed("Demo Citizen", "citizen@example.com", "9000000003", Role::Citizen, None),
  ]
}

/// What a session key maps to in the store.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
  user:       User,
  expires_at: DateTime<Utc>,
}

pub struct AuthService<S> {
  store:       Arc<S>,
  hasher:      Argon2<'static>,
  session_ttl: Duration,
}

impl<S: PortalStore> AuthService<S> {
  pub fn new(store: Arc<S>) -> Self { Self::with_hasher(store, Argon2::default()) }

  /// Use explicit argon2 parameters (tests pass cheap ones).
  pub fn with_hasher(store: Arc<S>, hasher: Argon2<'static>) -> Self {
    Self {
      store,
      hasher,
      session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
    }
  }

  /// How long a session stays valid after login or registration.
  pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
    self.session_ttl = ttl;
    self
  }

  pub fn hash_password(&self, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    self
      .hasher
      .hash_password(password.as_bytes(), &salt)
      .map(|h| h.to_string())
      .map_err(|e| Error::PasswordHash(e.to_string()))
  }

  fn verify_password(&self, password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
      .and_then(|parsed| self.hasher.verify_password(password.as_bytes(), &parsed))
      .is_ok()
  }

  /// Insert `seeds` if no user exists yet. Returns how many were inserted.
  ///
  /// Every seed's hash is checked before anything is written.
  pub async fn seed_users(&self, seeds: &[SeedUser]) -> Result<usize> {
    if !self.store.list_users().await.map_err(Error::store)?.is_empty() {
      return Ok(0);
    }
    for seed in seeds {
      PasswordHash::new(&seed.password_hash).map_err(|e| {
        Error::PasswordHash(format!("seed account {}: {e}", seed.email))
      })?;
    }
    for seed in seeds {
      let record = UserRecord {
        user:          User {
          id:         Uuid::new_v4(),
          name:       seed.name.clone(),
          email:      seed.email.clone(),
          phone:      seed.phone.clone(),
          role:       seed.role,
          department: seed.department.clone(),
          created_at: Utc::now(),
          last_login: None,
        },
        password_hash: seed.password_hash.clone(),
      };
      self.store.insert_user(record).await.map_err(Error::store)?;
    }
    tracing::info!(count = seeds.len(), "seeded default users");
    Ok(seeds.len())
  }

  // ── Login / register / logout ─────────────────────────────────────────

  pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
    let record = self
      .store
      .find_user_by_email(email)
      .await
      .map_err(Error::store)?
      .ok_or(Error::InvalidCredentials)?;

    if !self.verify_password(password, &record.password_hash) {
      tracing::info!(%email, "rejected login");
      return Err(Error::InvalidCredentials);
    }

    let user = User { last_login: Some(Utc::now()), ..record.user };
    self.store.update_user(user.clone()).await.map_err(Error::store)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
    self.open_session(user).await
  }

  /// Create a citizen account and log it in.
  pub async fn register(&self, registration: Registration) -> Result<Session> {
    validate_registration(&registration)?;
    self.ensure_unique(&registration.email, &registration.phone, None).await?;

    let now = Utc::now();
    let record = UserRecord {
      user:          User {
        id:         Uuid::new_v4(),
        name:       registration.name.trim().to_owned(),
        email:      registration.email,
        phone:      registration.phone,
        role:       Role::Citizen,
        department: None,
        created_at: now,
        last_login: Some(now),
      },
      password_hash: self.hash_password(&registration.password)?,
    };
    let user = self.store.insert_user(record).await.map_err(Error::store)?;
    tracing::info!(user_id = %user.id, "registered new citizen");
    self.open_session(user).await
  }

  /// Drop the session for `token`. Returns whether one existed.
  pub async fn logout(&self, token: &str) -> Result<bool> {
    self
      .store
      .remove_value(&session_key(token))
      .await
      .map_err(Error::store)
  }

  // ── Session state ─────────────────────────────────────────────────────

  /// Rehydrate the user behind `token`. Expired or corrupt session data is
  /// discarded.
  pub async fn current_user(&self, token: &str) -> Result<Option<User>> {
    Ok(self.load_session(&session_key(token)).await?.map(|s| s.user))
  }

  /// Remove every expired or unreadable session. Returns how many went.
  pub async fn prune_expired_sessions(&self) -> Result<usize> {
    let keys = self
      .store
      .keys_with_prefix(SESSION_PREFIX)
      .await
      .map_err(Error::store)?;
    let mut removed = 0;
    for key in keys {
      if self.load_session(&key).await?.is_none() {
        removed += 1;
      }
    }
    if removed > 0 {
      tracing::debug!(removed, "pruned stale sessions");
    }
    Ok(removed)
  }

  async fn load_session(&self, key: &str) -> Result<Option<StoredSession>> {
    let Some(raw) = self.store.get_value(key).await.map_err(Error::store)? else {
      return Ok(None);
    };
    match serde_json::from_str::<StoredSession>(&raw) {
      Ok(session) if session.expires_at > Utc::now() => Ok(Some(session)),
      Ok(session) => {
        tracing::debug!(user_id = %session.user.id, "session expired");
        self.store.remove_value(key).await.map_err(Error::store)?;
        Ok(None)
      }
      Err(e) => {
        tracing::warn!(error = %e, "discarding corrupt session data");
        self.store.remove_value(key).await.map_err(Error::store)?;
        Ok(None)
      }
    }
  }

  /// Apply `update` to the session's user. Returns `None` without a session.
  pub async fn update_profile(
    &self,
    token: &str,
    update: ProfileUpdate,
  ) -> Result<Option<User>> {
    let key = session_key(token);
    let Some(session) = self.load_session(&key).await? else {
      return Ok(None);
    };
    let current = self
      .store
      .get_user(session.user.id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(session.user.id))?;

    let email = update.email.unwrap_or_else(|| current.email.clone());
    let phone = update.phone.unwrap_or_else(|| current.phone.clone());
    if email.trim().is_empty() || !email.contains('@') {
      return Err(Error::Validation("a valid email is required".into()));
    }
    if phone.trim().is_empty() {
      return Err(Error::Validation("phone is required".into()));
    }
    self.ensure_unique(&email, &phone, Some(current.id)).await?;

    let user = User {
      name: update.name.unwrap_or_else(|| current.name.clone()),
      email,
      phone,
      department: update.department.or_else(|| current.department.clone()),
      ..current
    };
    if !self.store.update_user(user.clone()).await.map_err(Error::store)? {
      return Err(Error::UserNotFound(user.id));
    }
    self
      .persist_session(&key, &StoredSession {
        user:       user.clone(),
        expires_at: session.expires_at,
      })
      .await?;
    Ok(Some(user))
  }

  async fn open_session(&self, user: User) -> Result<Session> {
    self.prune_expired_sessions().await?;

    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    self
      .persist_session(&session_key(&token), &StoredSession {
        user:       user.clone(),
        expires_at: Utc::now() + self.session_ttl,
      })
      .await?;
    Ok(Session { token, user })
  }

  async fn persist_session(&self, key: &str, session: &StoredSession) -> Result<()> {
    let json = serde_json::to_string(session)?;
    self.store.put_value(key, json).await.map_err(Error::store)
  }

  /// Fail if `email` or `phone` belongs to someone other than `except`.
  async fn ensure_unique(
    &self,
    email: &str,
    phone: &str,
    except: Option<Uuid>,
  ) -> Result<()> {
    let by_email = self.store.find_user_by_email(email).await.map_err(Error::store)?;
    if by_email.is_some_and(|r| Some(r.user.id) != except) {
      return Err(Error::DuplicateEmail(email.to_owned()));
    }
    let by_phone = self.store.find_user_by_phone(phone).await.map_err(Error::store)?;
    if by_phone.is_some_and(|u| Some(u.id) != except) {
      return Err(Error::DuplicatePhone(phone.to_owned()));
    }
    Ok(())
  }
}

fn session_key(token: &str) -> String {
  format!("{SESSION_PREFIX}{}", hex::encode(Sha256::digest(token.as_bytes())))
}

fn validate_registration(r: &Registration) -> Result<()> {
  if r.name.trim().is_empty() {
    return Err(Error::Validation("name is required".into()));
  }
  if !r.email.contains('@') {
    return Err(Error::Validation("a valid email is required".into()));
  }
  if r.phone.trim().is_empty() {
    return Err(Error::Validation("phone is required".into()));
  }
  if r.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::Validation(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  Ok(())
}
