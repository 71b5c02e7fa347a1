//! Handlers for `/notifications` endpoints.
//!
//! Every route is scoped to what the signed-in user can see: a notification
//! outside their visible set is reported as not found.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use civic_core::{
  notification::{NewNotification, Notification},
  store::PortalStore,
};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentUser, Staff},
  error::ApiError,
};

#[derive(Debug, Serialize)]
pub struct Inbox {
  pub notifications: Vec<Notification>,
  pub unread:        usize,
}

/// `GET /notifications`
pub async fn list<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<Inbox>, ApiError> {
  let notifications = state.notifications.visible_to(&current.viewer()).await?;
  let unread = notifications.iter().filter(|n| !n.is_read).count();
  Ok(Json(Inbox { notifications, unread }))
}

/// `POST /notifications`
pub async fn create<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Json(body): Json<NewNotification>,
) -> Result<impl IntoResponse, ApiError> {
  let notification = state.notifications.add_notification(body).await?;
  Ok((StatusCode::CREATED, Json(notification)))
}

async fn ensure_visible<S: PortalStore + 'static>(
  state: &AppState<S>,
  current: &CurrentUser,
  id: Uuid,
) -> Result<(), ApiError> {
  let visible = state.notifications.visible_to(&current.viewer()).await?;
  if visible.iter().any(|n| n.id == id) {
    Ok(())
  } else {
    Err(ApiError::NotFound(format!("notification {id} not found")))
  }
}

/// `POST /notifications/{id}/read`
pub async fn read_one<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  ensure_visible(&state, &current, id).await?;
  state.notifications.mark_as_read(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /notifications/read-all`: returns `{"updated": n}`.
pub async fn read_all<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<Value>, ApiError> {
  let updated = state.notifications.mark_all_as_read(&current.viewer()).await?;
  Ok(Json(json!({ "updated": updated })))
}

/// `DELETE /notifications/{id}`
pub async fn delete_one<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  ensure_visible(&state, &current, id).await?;
  state.notifications.delete_notification(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /notifications`: returns `{"removed": n}`.
pub async fn clear_all<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<Value>, ApiError> {
  let removed = state
    .notifications
    .clear_all_notifications(&current.viewer())
    .await?;
  Ok(Json(json!({ "removed": removed })))
}
