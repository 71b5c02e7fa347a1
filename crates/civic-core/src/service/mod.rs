//! Services: the portal's operations, each generic over a [`PortalStore`].
//!
//! Services own no state of their own beyond an `Arc` to the store (and, for
//! complaints, the id RNG), so they are cheap to build per application.
//!
//! [`PortalStore`]: crate::store::PortalStore

mod auth;
mod complaints;
mod language;
mod notifications;

pub use auth::{AuthService, SeedUser, default_seed_users};
pub use complaints::ComplaintService;
pub use language::{LANGUAGE_KEY, LanguageService};
pub use notifications::NotificationService;

/// Argon2 with the smallest legal cost, so tests don't spend seconds hashing.
#[cfg(test)]
pub(crate) fn test_hasher() -> argon2::Argon2<'static> {
  use argon2::{Algorithm, Argon2, Params, Version};
  let params = Params::new(8, 1, 1, None).expect("valid argon2 params");
  Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}
