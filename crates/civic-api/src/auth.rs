//! Bearer-session extractors and role gates.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use civic_core::{notification::Viewer, store::PortalStore, user::User};

use crate::{AppState, error::ApiError};

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

  let token = value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".into()))?;
  Ok(token)
}

/// Any signed-in user.
pub struct CurrentUser {
  pub user:  User,
  pub token: String,
}

impl CurrentUser {
  pub fn viewer(&self) -> Viewer { Viewer::from(&self.user) }
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: PortalStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?.to_owned();
    let user = state
      .auth
      .current_user(&token)
      .await?
      .ok_or_else(|| ApiError::Unauthorized("session expired or unknown".into()))?;
    Ok(CurrentUser { user, token })
  }
}

/// An admin or official.
pub struct Staff(pub User);

impl<S> FromRequestParts<AppState<S>> for Staff
where
  S: PortalStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
    if !user.role.is_staff() {
      return Err(ApiError::Forbidden("staff only".into()));
    }
    Ok(Staff(user))
  }
}

/// An admin.
pub struct Admin(pub User);

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: PortalStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
    if user.role != civic_core::user::Role::Admin {
      return Err(ApiError::Forbidden("admins only".into()));
    }
    Ok(Admin(user))
  }
}
