//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with nanosecond precision and a
//! `Z` suffix, so lexical order equals chronological order. Enums are stored
//! as their serde/strum names. Image lists are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use civic_core::{
  complaint::{Complaint, ComplaintStatus, HistoryEntry, Priority, Submitter},
  notification::{Notification, NotificationPriority, NotificationType},
  user::{Role, User, UserRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

/// Parse a strum-backed enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, value: &str) -> Result<T> {
  value.parse().map_err(|_| Error::Decode {
    column,
    value: value.to_owned(),
  })
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Raw column values from the `users` table.
pub struct RawUser {
  pub user_id:       String,
  pub name:          String,
  pub email:         String,
  pub phone:         String,
  pub role:          String,
  pub department:    Option<String>,
  pub created_at:    String,
  pub last_login:    Option<String>,
  pub password_hash: String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, name, email, phone, role, department, \
                                     created_at, last_login, password_hash";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      phone:         row.get(3)?,
      role:          row.get(4)?,
      department:    row.get(5)?,
      created_at:    row.get(6)?,
      last_login:    row.get(7)?,
      password_hash: row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<UserRecord> {
    Ok(UserRecord {
      user:          User {
        id:         decode_uuid(&self.user_id)?,
        name:       self.name,
        email:      self.email,
        phone:      self.phone,
        role:       decode_enum::<Role>("role", &self.role)?,
        department: self.department,
        created_at: decode_dt(&self.created_at)?,
        last_login: decode_opt_dt(self.last_login)?,
      },
      password_hash: self.password_hash,
    })
  }

  pub fn into_user(self) -> Result<User> { Ok(self.into_record()?.user) }
}

/// Raw column values from `complaint_history`.
pub struct RawHistoryEntry {
  pub recorded_at: String,
  pub status:      String,
  pub notes:       String,
  pub updated_by:  String,
}

impl RawHistoryEntry {
  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      timestamp:  decode_dt(&self.recorded_at)?,
      status:     decode_enum::<ComplaintStatus>("status", &self.status)?,
      notes:      self.notes,
      updated_by: self.updated_by,
    })
  }
}

/// Raw column values from `complaints`, plus its history rows in order.
pub struct RawComplaint {
  pub complaint_id:         String,
  pub title:                String,
  pub description:          String,
  pub category:             String,
  pub subcategory:          Option<String>,
  pub location:             String,
  pub landmark:             Option<String>,
  pub priority:             String,
  pub status:               String,
  pub submitter_name:       String,
  pub submitter_phone:      String,
  pub submitter_email:      Option<String>,
  pub images:               String,
  pub created_at:           String,
  pub updated_at:           String,
  pub assigned_to:          Option<String>,
  pub resolution_notes:     Option<String>,
  pub estimated_resolution: Option<String>,
  pub history:              Vec<RawHistoryEntry>,
}

impl RawComplaint {
  pub const COLUMNS: &'static str = "complaint_id, title, description, category, \
                                     subcategory, location, landmark, priority, status, \
                                     submitter_name, submitter_phone, submitter_email, \
                                     images, created_at, updated_at, assigned_to, \
                                     resolution_notes, estimated_resolution";

  /// Read the complaint columns; `history` is filled in by the caller.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      complaint_id:         row.get(0)?,
      title:                row.get(1)?,
      description:          row.get(2)?,
      category:             row.get(3)?,
      subcategory:          row.get(4)?,
      location:             row.get(5)?,
      landmark:             row.get(6)?,
      priority:             row.get(7)?,
      status:               row.get(8)?,
      submitter_name:       row.get(9)?,
      submitter_phone:      row.get(10)?,
      submitter_email:      row.get(11)?,
      images:               row.get(12)?,
      created_at:           row.get(13)?,
      updated_at:           row.get(14)?,
      assigned_to:          row.get(15)?,
      resolution_notes:     row.get(16)?,
      estimated_resolution: row.get(17)?,
      history:              Vec::new(),
    })
  }

  pub fn into_complaint(self) -> Result<Complaint> {
    Ok(Complaint {
      id:                   self.complaint_id,
      title:                self.title,
      description:          self.description,
      category:             self.category,
      subcategory:          self.subcategory,
      location:             self.location,
      landmark:             self.landmark,
      priority:             decode_enum::<Priority>("priority", &self.priority)?,
      status:               decode_enum::<ComplaintStatus>("status", &self.status)?,
      submitter:            Submitter {
        name:  self.submitter_name,
        phone: self.submitter_phone,
        email: self.submitter_email,
      },
      images:               serde_json::from_str(&self.images)?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
      assigned_to:          self.assigned_to,
      resolution_notes:     self.resolution_notes,
      estimated_resolution: decode_opt_dt(self.estimated_resolution)?,
      history:              self
        .history
        .into_iter()
        .map(RawHistoryEntry::into_entry)
        .collect::<Result<_>>()?,
    })
  }
}

/// Raw column values from `notifications`.
pub struct RawNotification {
  pub notification_id: String,
  pub kind:            String,
  pub title:           String,
  pub message:         String,
  pub complaint_id:    Option<String>,
  pub user_id:         String,
  pub user_role:       Option<String>,
  pub is_read:         bool,
  pub created_at:      String,
  pub priority:        String,
  pub action_url:      Option<String>,
}

impl RawNotification {
  pub const COLUMNS: &'static str = "notification_id, kind, title, message, complaint_id, \
                                     user_id, user_role, is_read, created_at, priority, \
                                     action_url";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      kind:            row.get(1)?,
      title:           row.get(2)?,
      message:         row.get(3)?,
      complaint_id:    row.get(4)?,
      user_id:         row.get(5)?,
      user_role:       row.get(6)?,
      is_read:         row.get(7)?,
      created_at:      row.get(8)?,
      priority:        row.get(9)?,
      action_url:      row.get(10)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      id:           decode_uuid(&self.notification_id)?,
      kind:         decode_enum::<NotificationType>("kind", &self.kind)?,
      title:        self.title,
      message:      self.message,
      complaint_id: self.complaint_id,
      user_id:      self.user_id,
      user_role:    self
        .user_role
        .as_deref()
        .map(|r| decode_enum::<Role>("user_role", r))
        .transpose()?,
      is_read:      self.is_read,
      created_at:   decode_dt(&self.created_at)?,
      priority:     decode_enum::<NotificationPriority>("priority", &self.priority)?,
      action_url:   self.action_url,
    })
  }
}
