//! [`MemoryStore`]: an in-process [`PortalStore`] for tests and demos.
//!
//! Collections are plain vectors kept newest-first, mirroring the order the
//! services expose; every filter is a linear scan.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  complaint::{Complaint, ComplaintPatch, ComplaintStatus},
  notification::Notification,
  store::{ComplaintQuery, PortalStore, StatusChange},
  user::{User, UserRecord},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("a user with this {field} already exists: {value}")]
  DuplicateUser { field: &'static str, value: String },

  #[error("complaint id already in use: {0}")]
  DuplicateComplaint(String),
}

#[derive(Default)]
pub struct MemoryStore {
  users:         RwLock<Vec<UserRecord>>,
  complaints:    RwLock<Vec<Complaint>>,
  notifications: RwLock<Vec<Notification>>,
  values:        RwLock<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl PortalStore for MemoryStore {
  type Error = MemoryError;

  // ── Users ───────────────────────────────────────────────────────────────

  async fn insert_user(&self, record: UserRecord) -> Result<User, MemoryError> {
    let mut users = self.users.write().await;
    if users.iter().any(|r| r.user.email == record.user.email) {
      return Err(MemoryError::DuplicateUser {
        field: "email",
        value: record.user.email,
      });
    }
    if users.iter().any(|r| r.user.phone == record.user.phone) {
      return Err(MemoryError::DuplicateUser {
        field: "phone",
        value: record.user.phone,
      });
    }
    let user = record.user.clone();
    users.push(record);
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>, MemoryError> {
    let users = self.users.read().await;
    Ok(users.iter().find(|r| r.user.id == id).map(|r| r.user.clone()))
  }

  async fn find_user_by_email(
    &self,
    email: &str,
  ) -> Result<Option<UserRecord>, MemoryError> {
    let users = self.users.read().await;
    Ok(users.iter().find(|r| r.user.email == email).cloned())
  }

  async fn find_user_by_phone(
    &self,
    phone: &str,
  ) -> Result<Option<User>, MemoryError> {
    let users = self.users.read().await;
    Ok(users.iter().find(|r| r.user.phone == phone).map(|r| r.user.clone()))
  }

  async fn list_users(&self) -> Result<Vec<User>, MemoryError> {
    let users = self.users.read().await;
    Ok(users.iter().map(|r| r.user.clone()).collect())
  }

  async fn update_user(&self, user: User) -> Result<bool, MemoryError> {
    let mut users = self.users.write().await;
    match users.iter_mut().find(|r| r.user.id == user.id) {
      Some(record) => {
        record.user = User { created_at: record.user.created_at, ..user };
        Ok(true)
      }
      None => Ok(false),
    }
  }

  // ── Complaints ──────────────────────────────────────────────────────────

  async fn insert_complaint(&self, complaint: Complaint) -> Result<(), MemoryError> {
    let mut complaints = self.complaints.write().await;
    if complaints.iter().any(|c| c.id == complaint.id) {
      return Err(MemoryError::DuplicateComplaint(complaint.id));
    }
    complaints.insert(0, complaint);
    Ok(())
  }

  async fn get_complaint(&self, id: &str) -> Result<Option<Complaint>, MemoryError> {
    let complaints = self.complaints.read().await;
    Ok(complaints.iter().find(|c| c.id == id).cloned())
  }

  async fn list_complaints(
    &self,
    query: &ComplaintQuery,
  ) -> Result<Vec<Complaint>, MemoryError> {
    let complaints = self.complaints.read().await;
    Ok(complaints.iter().filter(|c| query.matches(c)).cloned().collect())
  }

  async fn apply_status_change(
    &self,
    id: &str,
    change: StatusChange,
  ) -> Result<Option<Complaint>, MemoryError> {
    let mut complaints = self.complaints.write().await;
    let Some(complaint) = complaints.iter_mut().find(|c| c.id == id) else {
      return Ok(None);
    };
    complaint.status = change.entry.status;
    complaint.updated_at = change.entry.timestamp;
    if let Some(notes) = change.resolution_notes {
      complaint.resolution_notes = Some(notes);
    }
    complaint.history.push(change.entry);
    Ok(Some(complaint.clone()))
  }

  async fn apply_patch(
    &self,
    id: &str,
    patch: &ComplaintPatch,
    updated_at: DateTime<Utc>,
  ) -> Result<Option<Complaint>, MemoryError> {
    let mut complaints = self.complaints.write().await;
    let Some(complaint) = complaints.iter_mut().find(|c| c.id == id) else {
      return Ok(None);
    };
    if let Some(assignee) = &patch.assigned_to {
      complaint.assigned_to = Some(assignee.clone());
    }
    if let Some(eta) = patch.estimated_resolution {
      complaint.estimated_resolution = Some(eta);
    }
    if let Some(priority) = patch.priority {
      complaint.priority = priority;
    }
    complaint.updated_at = updated_at;
    Ok(Some(complaint.clone()))
  }

  async fn delete_complaint(&self, id: &str) -> Result<bool, MemoryError> {
    let mut complaints = self.complaints.write().await;
    let before = complaints.len();
    complaints.retain(|c| c.id != id);
    Ok(complaints.len() != before)
  }

  async fn delete_complaints_with_status(
    &self,
    status: ComplaintStatus,
  ) -> Result<usize, MemoryError> {
    let mut complaints = self.complaints.write().await;
    let before = complaints.len();
    complaints.retain(|c| c.status != status);
    Ok(before - complaints.len())
  }

  // ── Notifications ───────────────────────────────────────────────────────

  async fn insert_notification(
    &self,
    notification: Notification,
  ) -> Result<(), MemoryError> {
    self.notifications.write().await.insert(0, notification);
    Ok(())
  }

  async fn list_notifications(&self) -> Result<Vec<Notification>, MemoryError> {
    Ok(self.notifications.read().await.clone())
  }

  async fn mark_notifications_read(&self, ids: &[Uuid]) -> Result<usize, MemoryError> {
    let mut notifications = self.notifications.write().await;
    let mut hit = 0;
    for n in notifications.iter_mut().filter(|n| ids.contains(&n.id)) {
      n.is_read = true;
      hit += 1;
    }
    Ok(hit)
  }

  async fn delete_notifications(&self, ids: &[Uuid]) -> Result<usize, MemoryError> {
    let mut notifications = self.notifications.write().await;
    let before = notifications.len();
    notifications.retain(|n| !ids.contains(&n.id));
    Ok(before - notifications.len())
  }

  // ── Key-value ───────────────────────────────────────────────────────────

  async fn get_value(&self, key: &str) -> Result<Option<String>, MemoryError> {
    Ok(self.values.read().await.get(key).cloned())
  }

  async fn put_value(&self, key: &str, value: String) -> Result<(), MemoryError> {
    self.values.write().await.insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove_value(&self, key: &str) -> Result<bool, MemoryError> {
    Ok(self.values.write().await.remove(key).is_some())
  }

  async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, MemoryError> {
    let mut keys: Vec<String> = self
      .values
      .read()
      .await
      .keys()
      .filter(|k| k.starts_with(prefix))
      .cloned()
      .collect();
    keys.sort();
    Ok(keys)
  }
}
