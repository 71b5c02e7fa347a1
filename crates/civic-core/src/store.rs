//! The `PortalStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends ([`crate::memory::MemoryStore`]
//! and `civic-store-sqlite`). Services and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  complaint::{Complaint, ComplaintPatch, ComplaintStatus, HistoryEntry},
  notification::Notification,
  user::{User, UserRecord},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters for [`PortalStore::list_complaints`]. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct ComplaintQuery {
  pub status:       Option<ComplaintStatus>,
  pub category:     Option<String>,
  /// Exact match on the submitter's phone number.
  pub phone:        Option<String>,
  /// Inclusive lower bound on `created_at`.
  pub created_from: Option<DateTime<Utc>>,
  /// Inclusive upper bound on `created_at`.
  pub created_to:   Option<DateTime<Utc>>,
}

impl ComplaintQuery {
  pub fn matches(&self, c: &Complaint) -> bool {
    self.status.is_none_or(|s| c.status == s)
      && self.category.as_deref().is_none_or(|cat| c.category == cat)
      && self.phone.as_deref().is_none_or(|p| c.submitter.phone == p)
      && self.created_from.is_none_or(|from| c.created_at >= from)
      && self.created_to.is_none_or(|to| c.created_at <= to)
  }
}

/// A status transition to apply to a stored complaint.
#[derive(Debug, Clone)]
pub struct StatusChange {
  /// Appended to `history`; its status and timestamp become the complaint's.
  pub entry:            HistoryEntry,
  /// Replaces `resolution_notes` when set.
  pub resolution_notes: Option<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the portal's storage backend.
///
/// Complaint history is append-only: the only write path that touches it is
/// [`PortalStore::apply_status_change`], which adds one entry.
///
/// The key-value section replaces browser local storage: sessions and the
/// selected language live there as opaque JSON strings.
pub trait PortalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Backends may reject duplicate email or phone.
  fn insert_user(
    &self,
    record: UserRecord,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Exact-match lookup, including the password hash for verification.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + 'a;

  fn find_user_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Overwrite the profile fields and `last_login` of an existing user.
  /// Returns `false` if the user does not exist.
  fn update_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Complaints ────────────────────────────────────────────────────────

  /// Persist a freshly created complaint, history included.
  fn insert_complaint(
    &self,
    complaint: Complaint,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_complaint<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Complaint>, Self::Error>> + Send + 'a;

  /// Complaints matching `query`, newest first.
  fn list_complaints<'a>(
    &'a self,
    query: &'a ComplaintQuery,
  ) -> impl Future<Output = Result<Vec<Complaint>, Self::Error>> + Send + 'a;

  /// Append a history entry and move the complaint to its status. Returns the
  /// updated complaint, or `None` if `id` is unknown.
  fn apply_status_change<'a>(
    &'a self,
    id: &'a str,
    change: StatusChange,
  ) -> impl Future<Output = Result<Option<Complaint>, Self::Error>> + Send + 'a;

  /// Apply non-status field changes. Returns `None` if `id` is unknown.
  fn apply_patch<'a>(
    &'a self,
    id: &'a str,
    patch: &'a ComplaintPatch,
    updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Complaint>, Self::Error>> + Send + 'a;

  fn delete_complaint<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove every complaint currently in `status`; returns how many.
  fn delete_complaints_with_status(
    &self,
    status: ComplaintStatus,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn insert_notification(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every notification, newest first.
  fn list_notifications(
    &self,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Set `is_read` on the given ids; returns how many existed.
  fn mark_notifications_read<'a>(
    &'a self,
    ids: &'a [Uuid],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Returns how many of the given ids existed.
  fn delete_notifications<'a>(
    &'a self,
    ids: &'a [Uuid],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Key-value ─────────────────────────────────────────────────────────

  fn get_value<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn put_value<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Returns whether the key existed.
  fn remove_value<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Every key starting with `prefix`, in ascending order.
  fn keys_with_prefix<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}
