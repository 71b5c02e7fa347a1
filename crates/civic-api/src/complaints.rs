//! Handlers for `/complaints` and `/categories`.
//!
//! | Method   | Path | Access | Notes |
//! |----------|------|--------|-------|
//! | `GET`    | `/categories` | public | Static category table |
//! | `POST`   | `/complaints` | public | 201; admins get a `complaint_submitted` notification |
//! | `GET`    | `/complaints` | staff | `?status=&category=&phone=&from=&to=` |
//! | `GET`    | `/complaints/stats` | staff | |
//! | `GET`    | `/complaints/:id` | public | 404 if not found |
//! | `GET`    | `/complaints/by-phone/:phone` | public | |
//! | `POST`   | `/complaints/:id/status` | staff | Notifies the submitter |
//! | `PATCH`  | `/complaints/:id` | staff | Assignment, ETA, priority |
//! | `POST`   | `/complaints/bulk-status` | staff | No notifications |
//! | `DELETE` | `/complaints/:id` | admin | |
//! | `DELETE` | `/complaints/resolved` | admin | Purges every resolved complaint |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use civic_core::{
  complaint::{
    CATEGORIES, Category, Complaint, ComplaintPatch, ComplaintStats, ComplaintStatus,
    NewComplaint, Priority,
  },
  notification::{NewNotification, NotificationPriority, NotificationType},
  store::{ComplaintQuery, PortalStore},
  user::Role,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::{Admin, Staff},
  error::ApiError,
};

/// Target of the notification raised for each new complaint.
const ADMIN_INBOX: &str = "admin";

/// `GET /categories`
pub async fn categories() -> Json<&'static [Category]> { Json(CATEGORIES) }

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /complaints`
pub async fn create<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewComplaint>,
) -> Result<impl IntoResponse, ApiError> {
  let complaint = state.complaints.add_complaint(body).await?;

  let alert = NewNotification {
    kind:         NotificationType::ComplaintSubmitted,
    title:        "New Complaint Submitted".into(),
    message:      format!(
      "{} reported \"{}\" under {}.",
      complaint.submitter.name, complaint.title, complaint.category
    ),
    complaint_id: Some(complaint.id.clone()),
    user_id:      ADMIN_INBOX.into(),
    user_role:    Some(Role::Admin),
    priority:     match complaint.priority {
      Priority::High => NotificationPriority::High,
      _ => NotificationPriority::Medium,
    },
    action_url:   Some(format!("/admin/complaints/{}", complaint.id)),
  };
  if let Err(e) = state.notifications.add_notification(alert).await {
    tracing::warn!(complaint_id = %complaint.id, error = %e, "failed to alert admins");
  }

  Ok((StatusCode::CREATED, Json(complaint)))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status:   Option<ComplaintStatus>,
  pub category: Option<String>,
  pub phone:    Option<String>,
  /// Inclusive RFC 3339 lower bound on creation time.
  pub from:     Option<DateTime<Utc>>,
  /// Inclusive RFC 3339 upper bound on creation time.
  pub to:       Option<DateTime<Utc>>,
}

/// `GET /complaints`
pub async fn list<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
  let query = ComplaintQuery {
    status:       params.status,
    category:     params.category,
    phone:        params.phone,
    created_from: params.from,
    created_to:   params.to,
  };
  Ok(Json(state.complaints.list_complaints(&query).await?))
}

/// `GET /complaints/stats`
pub async fn stats<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> Result<Json<ComplaintStats>, ApiError> {
  Ok(Json(state.complaints.get_complaint_stats().await?))
}

/// `GET /complaints/{id}`
pub async fn get_one<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Complaint>, ApiError> {
  let complaint = state
    .complaints
    .get_complaint_by_id(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("complaint {id} not found")))?;
  Ok(Json(complaint))
}

/// `GET /complaints/by-phone/{phone}`
pub async fn by_phone<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Path(phone): Path<String>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
  Ok(Json(state.complaints.get_complaints_by_phone(&phone).await?))
}

// ─── Status changes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status:     ComplaintStatus,
  #[serde(default)]
  pub notes:      String,
  /// Defaults to the signed-in staff member's name.
  pub updated_by: Option<String>,
}

/// `POST /complaints/{id}/status`
pub async fn update_status<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Staff(user): Staff,
  Path(id): Path<String>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Complaint>, ApiError> {
  let updated_by = body.updated_by.unwrap_or(user.name);
  let complaint = state
    .complaints
    .update_status_notifying(
      &id,
      body.status,
      &body.notes,
      &updated_by,
      state.notifications.as_ref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("complaint {id} not found")))?;
  Ok(Json(complaint))
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusBody {
  pub ids:        Vec<String>,
  pub status:     ComplaintStatus,
  #[serde(default)]
  pub notes:      String,
  pub updated_by: Option<String>,
}

/// `POST /complaints/bulk-status`: returns `{"updated": n}`.
pub async fn bulk_status<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Staff(user): Staff,
  Json(body): Json<BulkStatusBody>,
) -> Result<Json<Value>, ApiError> {
  let updated_by = body.updated_by.unwrap_or(user.name);
  let updated = state
    .complaints
    .bulk_update_status(&body.ids, body.status, &body.notes, &updated_by)
    .await?;
  Ok(Json(json!({ "updated": updated })))
}

/// `PATCH /complaints/{id}`
pub async fn update_details<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(id): Path<String>,
  Json(patch): Json<ComplaintPatch>,
) -> Result<Json<Complaint>, ApiError> {
  let complaint = state
    .complaints
    .update_details(&id, &patch)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("complaint {id} not found")))?;
  Ok(Json(complaint))
}

// ─── Deletes ──────────────────────────────────────────────────────────────────

/// `DELETE /complaints/{id}`
pub async fn delete_one<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  if state.complaints.delete_complaint(&id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("complaint {id} not found")))
  }
}

/// `DELETE /complaints/resolved`: returns `{"removed": n}`.
pub async fn purge_resolved<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
) -> Result<Json<Value>, ApiError> {
  let removed = state.complaints.delete_resolved_complaints().await?;
  Ok(Json(json!({ "removed": removed })))
}
