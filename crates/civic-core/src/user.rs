//! Users and their roles.
//!
//! A [`User`] is what leaves the store: it never carries the password. The
//! argon2 hash travels only inside [`UserRecord`], between the auth service
//! and the store backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// The role a user acts in. Route access is gated on this.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Citizen,
  Admin,
  Official,
}

impl Role {
  /// Admins and officials work the complaint dashboard.
  pub fn is_staff(self) -> bool { matches!(self, Self::Admin | Self::Official) }
}

/// A registered portal user, as handed out to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         Uuid,
  pub name:       String,
  pub email:      String,
  pub phone:      String,
  pub role:       Role,
  /// Set for officials; the department whose complaints they handle.
  pub department: Option<String>,
  pub created_at: DateTime<Utc>,
  pub last_login: Option<DateTime<Utc>>,
}

/// A user together with its password hash, as persisted.
#[derive(Debug, Clone)]
pub struct UserRecord {
  pub user:          User,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Input to [`crate::service::AuthService::register`]. Registration always
/// creates a citizen.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub name:     String,
  pub email:    String,
  pub phone:    String,
  pub password: String,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub name:       Option<String>,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub department: Option<String>,
}

/// An authenticated session: the bearer token and the user it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
  pub token: String,
  pub user:  User,
}
