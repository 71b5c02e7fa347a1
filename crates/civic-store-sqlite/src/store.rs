//! [`SqliteStore`]: the SQLite implementation of [`PortalStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use civic_core::{
  complaint::{Complaint, ComplaintPatch, ComplaintStatus},
  notification::Notification,
  store::{ComplaintQuery, PortalStore, StatusChange},
  user::{User, UserRecord},
};

use crate::{
  Error, Result,
  encode::{
    RawComplaint, RawHistoryEntry, RawNotification, RawUser, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn select_complaint(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawComplaint>> {
  let sql = format!(
    "SELECT {} FROM complaints WHERE complaint_id = ?1",
    RawComplaint::COLUMNS
  );
  let raw = conn
    .query_row(&sql, rusqlite::params![id], RawComplaint::from_row)
    .optional()?;
  match raw {
    Some(mut raw) => {
      load_history(conn, &mut raw)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

/// Fill in `raw.history`, oldest entry first.
fn load_history(
  conn: &rusqlite::Connection,
  raw: &mut RawComplaint,
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare_cached(
    "SELECT recorded_at, status, notes, updated_by
     FROM complaint_history
     WHERE complaint_id = ?1
     ORDER BY entry_id",
  )?;
  raw.history = stmt
    .query_map(rusqlite::params![raw.complaint_id], |row| {
      Ok(RawHistoryEntry {
        recorded_at: row.get(0)?,
        status:      row.get(1)?,
        notes:       row.get(2)?,
        updated_by:  row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(())
}

fn insert_history(
  conn: &rusqlite::Connection,
  complaint_id: &str,
  recorded_at: &str,
  status: &str,
  notes: &str,
  updated_by: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO complaint_history (complaint_id, recorded_at, status, notes, updated_by)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![complaint_id, recorded_at, status, notes, updated_by],
  )?;
  Ok(())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A portal store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── PortalStore impl ────────────────────────────────────────────────────────

impl PortalStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, record: UserRecord) -> Result<User> {
    let UserRecord { user, password_hash } = record;

    let id_str         = encode_uuid(user.id);
    let role_str       = user.role.as_ref().to_owned();
    let created_str    = encode_dt(user.created_at);
    let last_login_str = user.last_login.map(encode_dt);
    let u              = user.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, name, email, phone, role, department,
             created_at, last_login, password_hash
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            u.name,
            u.email,
            u.phone,
            role_str,
            u.department,
            created_str,
            last_login_str,
            password_hash,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS);
        Ok(conn.query_row(&sql, rusqlite::params![id_str], RawUser::from_row).optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
    let email = email.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM users WHERE email = ?1", RawUser::COLUMNS);
        Ok(conn.query_row(&sql, rusqlite::params![email], RawUser::from_row).optional()?)
      })
      .await?;

    raw.map(RawUser::into_record).transpose()
  }

  async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
    let phone = phone.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM users WHERE phone = ?1", RawUser::COLUMNS);
        Ok(conn.query_row(&sql, rusqlite::params![phone], RawUser::from_row).optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {} FROM users ORDER BY created_at", RawUser::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_user(&self, user: User) -> Result<bool> {
    let id_str         = encode_uuid(user.id);
    let role_str       = user.role.as_ref().to_owned();
    let last_login_str = user.last_login.map(encode_dt);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET name = ?2, email = ?3, phone = ?4, role = ?5,
               department = ?6, last_login = ?7
           WHERE user_id = ?1",
          rusqlite::params![
            id_str,
            user.name,
            user.email,
            user.phone,
            role_str,
            user.department,
            last_login_str,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Complaints ────────────────────────────────────────────────────────────

  async fn insert_complaint(&self, complaint: Complaint) -> Result<()> {
    let priority_str = complaint.priority.as_ref().to_owned();
    let status_str   = complaint.status.as_ref().to_owned();
    let images_str   = serde_json::to_string(&complaint.images)?;
    let created_str  = encode_dt(complaint.created_at);
    let updated_str  = encode_dt(complaint.updated_at);
    let eta_str      = complaint.estimated_resolution.map(encode_dt);
    let history: Vec<(String, String, String, String)> = complaint
      .history
      .iter()
      .map(|h| {
        (
          encode_dt(h.timestamp),
          h.status.as_ref().to_owned(),
          h.notes.clone(),
          h.updated_by.clone(),
        )
      })
      .collect();
    let c = complaint;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO complaints (
             complaint_id, title, description, category, subcategory,
             location, landmark, priority, status,
             submitter_name, submitter_phone, submitter_email,
             images, created_at, updated_at, assigned_to,
             resolution_notes, estimated_resolution
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
          rusqlite::params![
            c.id,
            c.title,
            c.description,
            c.category,
            c.subcategory,
            c.location,
            c.landmark,
            priority_str,
            status_str,
            c.submitter.name,
            c.submitter.phone,
            c.submitter.email,
            images_str,
            created_str,
            updated_str,
            c.assigned_to,
            c.resolution_notes,
            eta_str,
          ],
        )?;
        for (at, status, notes, by) in &history {
          insert_history(&tx, &c.id, at, status, notes, by)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn get_complaint(&self, id: &str) -> Result<Option<Complaint>> {
    let id = id.to_owned();

    let raw = self
      .conn
      .call(move |conn| Ok(select_complaint(conn, &id)?))
      .await?;

    raw.map(RawComplaint::into_complaint).transpose()
  }

  async fn list_complaints(&self, query: &ComplaintQuery) -> Result<Vec<Complaint>> {
    let status_str   = query.status.map(|s| s.as_ref().to_owned());
    let category     = query.category.clone();
    let phone        = query.phone.clone();
    let from_str     = query.created_from.map(encode_dt);
    let to_str       = query.created_to.map(encode_dt);

    let raws: Vec<RawComplaint> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM complaints
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR category = ?2)
             AND (?3 IS NULL OR submitter_phone = ?3)
             AND (?4 IS NULL OR created_at >= ?4)
             AND (?5 IS NULL OR created_at <= ?5)
           ORDER BY seq DESC",
          RawComplaint::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
          .query_map(
            rusqlite::params![status_str, category, phone, from_str, to_str],
            RawComplaint::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          load_history(conn, raw)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComplaint::into_complaint).collect()
  }

  async fn apply_status_change(
    &self,
    id: &str,
    change: StatusChange,
  ) -> Result<Option<Complaint>> {
    let id         = id.to_owned();
    let at_str     = encode_dt(change.entry.timestamp);
    let status_str = change.entry.status.as_ref().to_owned();
    let notes      = change.entry.notes;
    let updated_by = change.entry.updated_by;
    let resolution = change.resolution_notes;

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE complaints
           SET status = ?2, updated_at = ?3,
               resolution_notes = COALESCE(?4, resolution_notes)
           WHERE complaint_id = ?1",
          rusqlite::params![id, status_str, at_str, resolution],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        insert_history(&tx, &id, &at_str, &status_str, &notes, &updated_by)?;
        let raw = select_complaint(&tx, &id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawComplaint::into_complaint).transpose()
  }

  async fn apply_patch(
    &self,
    id: &str,
    patch: &ComplaintPatch,
    updated_at: DateTime<Utc>,
  ) -> Result<Option<Complaint>> {
    let id           = id.to_owned();
    let assigned_to  = patch.assigned_to.clone();
    let eta_str      = patch.estimated_resolution.map(encode_dt);
    let priority_str = patch.priority.map(|p| p.as_ref().to_owned());
    let updated_str  = encode_dt(updated_at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE complaints
           SET assigned_to          = COALESCE(?2, assigned_to),
               estimated_resolution = COALESCE(?3, estimated_resolution),
               priority             = COALESCE(?4, priority),
               updated_at           = ?5
           WHERE complaint_id = ?1",
          rusqlite::params![id, assigned_to, eta_str, priority_str, updated_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let raw = select_complaint(&tx, &id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawComplaint::into_complaint).transpose()
  }

  async fn delete_complaint(&self, id: &str) -> Result<bool> {
    let id = id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM complaint_history WHERE complaint_id = ?1",
          rusqlite::params![id],
        )?;
        let removed = tx.execute(
          "DELETE FROM complaints WHERE complaint_id = ?1",
          rusqlite::params![id],
        )?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn delete_complaints_with_status(&self, status: ComplaintStatus) -> Result<usize> {
    let status_str = status.as_ref().to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM complaint_history
           WHERE complaint_id IN (SELECT complaint_id FROM complaints WHERE status = ?1)",
          rusqlite::params![status_str],
        )?;
        let removed = tx.execute(
          "DELETE FROM complaints WHERE status = ?1",
          rusqlite::params![status_str],
        )?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed)
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn insert_notification(&self, n: Notification) -> Result<()> {
    let id_str       = encode_uuid(n.id);
    let kind_str     = n.kind.as_ref().to_owned();
    let role_str     = n.user_role.map(|r| r.as_ref().to_owned());
    let created_str  = encode_dt(n.created_at);
    let priority_str = n.priority.as_ref().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, kind, title, message, complaint_id,
             user_id, user_role, is_read, created_at, priority, action_url
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            kind_str,
            n.title,
            n.message,
            n.complaint_id,
            n.user_id,
            role_str,
            n.is_read,
            created_str,
            priority_str,
            n.action_url,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn list_notifications(&self) -> Result<Vec<Notification>> {
    let raws: Vec<RawNotification> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM notifications ORDER BY seq DESC",
          RawNotification::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_notifications_read(&self, ids: &[Uuid]) -> Result<usize> {
    let ids: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let hit = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut hit = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE notifications SET is_read = 1 WHERE notification_id = ?1",
          )?;
          for id in &ids {
            hit += stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(hit)
      })
      .await?;

    Ok(hit)
  }

  async fn delete_notifications(&self, ids: &[Uuid]) -> Result<usize> {
    let ids: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
          let mut stmt =
            tx.prepare("DELETE FROM notifications WHERE notification_id = ?1")?;
          for id in &ids {
            removed += stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed)
  }

  // ── Key-value ─────────────────────────────────────────────────────────────

  async fn get_value(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();

    let value = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(value)
  }

  async fn put_value(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
          rusqlite::params![key, value],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn remove_value(&self, key: &str) -> Result<bool> {
    let key = key.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
    let prefix = prefix.to_owned();

    let keys = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
          .query_map(rusqlite::params![prefix], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
      })
      .await?;

    Ok(keys)
  }
}
