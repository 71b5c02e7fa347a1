//! Notifications and the [`NotificationSink`] port.
//!
//! A notification targets a user id, the broadcast sentinel [`ALL_USERS`], or
//! a role. Visibility is an OR over the three: see
//! [`Notification::is_visible_to`].

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Result, complaint::ComplaintStatus, user::Role};

/// Target user id that makes a notification visible to everyone.
pub const ALL_USERS: &str = "all";

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
  ComplaintSubmitted,
  ComplaintAssigned,
  ComplaintInProgress,
  ComplaintResolved,
  ComplaintClosed,
  System,
}

impl NotificationType {
  /// The lifecycle event emitted when a complaint enters `status`, for the
  /// statuses that notify the submitter.
  pub fn for_status_change(status: ComplaintStatus) -> Option<Self> {
    match status {
      ComplaintStatus::Assigned => Some(Self::ComplaintAssigned),
      ComplaintStatus::InProgress => Some(Self::ComplaintInProgress),
      ComplaintStatus::Resolved => Some(Self::ComplaintResolved),
      ComplaintStatus::Pending | ComplaintStatus::Closed => None,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationPriority {
  Low,
  #[default]
  Medium,
  High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub id:           Uuid,
  #[serde(rename = "type")]
  pub kind:         NotificationType,
  pub title:        String,
  pub message:      String,
  pub complaint_id: Option<String>,
  /// A user id, a phone number for complaint submitters, or [`ALL_USERS`].
  pub user_id:      String,
  pub user_role:    Option<Role>,
  pub is_read:      bool,
  pub created_at:   DateTime<Utc>,
  pub priority:     NotificationPriority,
  pub action_url:   Option<String>,
}

impl Notification {
  /// A notification is visible when it names the viewer's id or phone, is
  /// broadcast, or targets the viewer's role.
  pub fn is_visible_to(&self, viewer: &Viewer) -> bool {
    self.user_id == viewer.user_id
      || viewer.phone.as_deref() == Some(self.user_id.as_str())
      || self.user_id == ALL_USERS
      || self.user_role == Some(viewer.role)
  }
}

/// Input to [`NotificationSink::notify`]; id, timestamp and read flag are
/// assigned on insert.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
  #[serde(rename = "type")]
  pub kind:         NotificationType,
  pub title:        String,
  pub message:      String,
  pub complaint_id: Option<String>,
  pub user_id:      String,
  pub user_role:    Option<Role>,
  #[serde(default)]
  pub priority:     NotificationPriority,
  pub action_url:   Option<String>,
}

impl NewNotification {
  pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
    Notification {
      id:           Uuid::new_v4(),
      kind:         self.kind,
      title:        self.title,
      message:      self.message,
      complaint_id: self.complaint_id,
      user_id:      self.user_id,
      user_role:    self.user_role,
      is_read:      false,
      created_at:   now,
      priority:     self.priority,
      action_url:   self.action_url,
    }
  }
}

/// Whoever is reading notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
  pub user_id: String,
  pub role:    Role,
  /// Status updates are addressed to the submitter's phone number.
  pub phone:   Option<String>,
}

impl Viewer {
  pub fn new(user_id: impl Into<String>, role: Role) -> Self {
    Self { user_id: user_id.into(), role, phone: None }
  }
}

impl From<&crate::user::User> for Viewer {
  fn from(user: &crate::user::User) -> Self {
    Self {
      user_id: user.id.to_string(),
      role:    user.role,
      phone:   Some(user.phone.clone()),
    }
  }
}

/// Where complaint lifecycle events are delivered.
///
/// The complaint service depends on this port rather than on notification
/// storage, so it can be handed any delivery mechanism (or none).
pub trait NotificationSink: Send + Sync {
  fn notify(
    &self,
    notification: NewNotification,
  ) -> impl Future<Output = Result<Notification>> + Send + '_;
}
