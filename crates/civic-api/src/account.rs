//! Handlers for `/auth` endpoints.
//!
//! | Method  | Path             | Notes |
//! |---------|------------------|-------|
//! | `POST`  | `/auth/login`    | Body: `{"email":…,"password":…}` → session |
//! | `POST`  | `/auth/register` | Body: name, email, phone, password → 201 + session |
//! | `POST`  | `/auth/logout`   | 204 |
//! | `GET`   | `/auth/me`       | The session's user |
//! | `PATCH` | `/auth/me`       | Partial profile update |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use civic_core::{
  store::PortalStore,
  user::{ProfileUpdate, Registration, Session, User},
};
use serde::Deserialize;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Session>, ApiError> {
  let session = state.auth.login(&body.email, &body.password).await?;
  Ok(Json(session))
}

/// `POST /auth/register`
pub async fn register<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<Registration>,
) -> Result<impl IntoResponse, ApiError> {
  let session = state.auth.register(body).await?;
  Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /auth/logout`
pub async fn logout<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<StatusCode, ApiError> {
  state.auth.logout(&current.token).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/me`
pub async fn me<S: PortalStore + 'static>(current: CurrentUser) -> Json<User> {
  Json(current.user)
}

/// `PATCH /auth/me`
pub async fn update_me<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
  let user = state
    .auth
    .update_profile(&current.token, body)
    .await?
    .ok_or_else(|| ApiError::Unauthorized("session expired or unknown".into()))?;
  Ok(Json(user))
}
