//! JSON REST API for the civic complaint portal.
//!
//! Exposes an axum [`Router`] backed by any [`civic_core::store::PortalStore`].
//! TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", civic_api::api_router(state))
//! ```

pub mod account;
pub mod auth;
pub mod chat;
pub mod complaints;
pub mod error;
pub mod language;
pub mod notifications;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{delete, get, post},
};
use civic_core::{
  service::{AuthService, ComplaintService, LanguageService, NotificationService},
  store::PortalStore,
};

pub use chat::ChatSessions;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub auth:          Arc<AuthService<S>>,
  pub complaints:    Arc<ComplaintService<S>>,
  pub notifications: Arc<NotificationService<S>>,
  pub language:      Arc<LanguageService<S>>,
  pub chats:         Arc<ChatSessions>,
  /// How long the assistant "types" before a reply is emitted.
  pub typing_delay:  Duration,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      auth:          self.auth.clone(),
      complaints:    self.complaints.clone(),
      notifications: self.notifications.clone(),
      language:      self.language.clone(),
      chats:         self.chats.clone(),
      typing_delay:  self.typing_delay,
    }
  }
}

impl<S: PortalStore> AppState<S> {
  /// Build the services over `store`. `auth` is passed in so callers choose
  /// the argon2 parameters.
  pub fn new(store: Arc<S>, auth: AuthService<S>, typing_delay: Duration) -> Self {
    Self {
      auth: Arc::new(auth),
      complaints: Arc::new(ComplaintService::new(store.clone())),
      notifications: Arc::new(NotificationService::new(store.clone())),
      language: Arc::new(LanguageService::new(store)),
      chats: Arc::new(ChatSessions::default()),
      typing_delay,
    }
  }

  /// Replace the chat registry with one using the given idle timeout and
  /// session cap.
  pub fn with_chat_limits(mut self, idle_timeout: Duration, max_sessions: usize) -> Self {
    self.chats = Arc::new(ChatSessions::new(idle_timeout, max_sessions));
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: PortalStore + 'static,
{
  Router::new()
    // Account
    .route("/auth/login", post(account::login::<S>))
    .route("/auth/register", post(account::register::<S>))
    .route("/auth/logout", post(account::logout::<S>))
    .route("/auth/me", get(account::me::<S>).patch(account::update_me::<S>))
    // Complaints
    .route("/categories", get(complaints::categories))
    .route(
      "/complaints",
      get(complaints::list::<S>).post(complaints::create::<S>),
    )
    .route("/complaints/stats", get(complaints::stats::<S>))
    .route("/complaints/bulk-status", post(complaints::bulk_status::<S>))
    .route("/complaints/resolved", delete(complaints::purge_resolved::<S>))
    .route("/complaints/by-phone/{phone}", get(complaints::by_phone::<S>))
    .route(
      "/complaints/{id}",
      get(complaints::get_one::<S>)
        .patch(complaints::update_details::<S>)
        .delete(complaints::delete_one::<S>),
    )
    .route("/complaints/{id}/status", post(complaints::update_status::<S>))
    // Notifications
    .route(
      "/notifications",
      get(notifications::list::<S>)
        .post(notifications::create::<S>)
        .delete(notifications::clear_all::<S>),
    )
    .route("/notifications/read-all", post(notifications::read_all::<S>))
    .route("/notifications/{id}", delete(notifications::delete_one::<S>))
    .route("/notifications/{id}/read", post(notifications::read_one::<S>))
    // Chat assistant
    .route("/chat/faqs", get(chat::faqs))
    .route("/chat/sessions", post(chat::open::<S>))
    .route("/chat/sessions/{id}", get(chat::transcript_of::<S>))
    .route("/chat/sessions/{id}/messages", post(chat::send::<S>))
    // Language
    .route(
      "/language",
      get(language::current::<S>).put(language::select::<S>),
    )
    .route("/i18n/{lang}", get(language::translations))
    .with_state(state)
}

#[cfg(test)]
mod tests;
