//! Handlers for the help assistant under `/chat`.
//!
//! A message is recorded immediately, the configured typing delay is waited
//! out, then the reply is emitted and returned. While a reply is pending the
//! conversation rejects new messages with 409. The delay and the reply run in
//! their own task, so a caller that disconnects mid-delay cannot leave the
//! conversation stuck in `typing`.
//!
//! Sessions are anonymous. [`ChatSessions`] drops any that sit idle past a
//! timeout and evicts the least recently used once it is full.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use civic_core::{
  chatbot::{ChatMessage, ChatState, Conversation, FAQS, FaqEntry},
  store::PortalStore,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub const DEFAULT_CHAT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_CHAT_SESSIONS: usize = 1000;

// ─── Session registry ─────────────────────────────────────────────────────────

struct ChatSession {
  conversation: Conversation<StdRng>,
  last_active:  Instant,
  /// Access order; breaks ties between equal instants.
  touched:      u64,
}

#[derive(Default)]
struct Registry {
  sessions: HashMap<Uuid, ChatSession>,
  clock:    u64,
}

impl Registry {
  fn tick(&mut self) -> u64 {
    self.clock += 1;
    self.clock
  }

  fn sweep(&mut self, idle_timeout: Duration) {
    let before = self.sessions.len();
    self
      .sessions
      .retain(|_, s| s.last_active.elapsed() < idle_timeout);
    let dropped = before - self.sessions.len();
    if dropped > 0 {
      tracing::debug!(dropped, "idle chat sessions dropped");
    }
  }

  fn evict_oldest(&mut self) {
    let oldest = self
      .sessions
      .iter()
      .min_by_key(|(_, s)| s.touched)
      .map(|(id, _)| *id);
    if let Some(id) = oldest {
      self.sessions.remove(&id);
      tracing::debug!(chat_id = %id, "chat session evicted at capacity");
    }
  }
}

/// Live chat conversations, keyed by session id.
pub struct ChatSessions {
  inner:        Mutex<Registry>,
  idle_timeout: Duration,
  capacity:     usize,
}

impl Default for ChatSessions {
  fn default() -> Self { Self::new(DEFAULT_CHAT_IDLE_TIMEOUT, DEFAULT_MAX_CHAT_SESSIONS) }
}

impl ChatSessions {
  /// `capacity` is raised to at least one.
  pub fn new(idle_timeout: Duration, capacity: usize) -> Self {
    Self {
      inner: Mutex::new(Registry::default()),
      idle_timeout,
      capacity: capacity.max(1),
    }
  }

  /// Register `conversation` under a fresh id.
  pub async fn open(&self, conversation: Conversation<StdRng>) -> Transcript {
    let mut registry = self.inner.lock().await;
    registry.sweep(self.idle_timeout);
    while registry.sessions.len() >= self.capacity {
      registry.evict_oldest();
    }
    let id = Uuid::new_v4();
    let body = transcript(id, &conversation);
    let touched = registry.tick();
    registry.sessions.insert(id, ChatSession {
      conversation,
      last_active: Instant::now(),
      touched,
    });
    body
  }

  /// Run `f` against a live session, marking it active.
  pub async fn with<T>(
    &self,
    id: Uuid,
    f: impl FnOnce(Uuid, &mut Conversation<StdRng>) -> Result<T, ApiError>,
  ) -> Result<T, ApiError> {
    let mut registry = self.inner.lock().await;
    registry.sweep(self.idle_timeout);
    let touched = registry.tick();
    let session = registry.sessions.get_mut(&id).ok_or_else(|| unknown(id))?;
    session.last_active = Instant::now();
    session.touched = touched;
    f(id, &mut session.conversation)
  }

  /// How many sessions are currently held.
  pub async fn active(&self) -> usize { self.inner.lock().await.sessions.len() }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Transcript {
  pub id:       Uuid,
  pub state:    ChatState,
  pub messages: Vec<ChatMessage>,
}

fn transcript(id: Uuid, conversation: &Conversation<StdRng>) -> Transcript {
  Transcript {
    id,
    state: conversation.state(),
    messages: conversation.transcript().to_vec(),
  }
}

fn unknown(id: Uuid) -> ApiError { ApiError::NotFound(format!("chat session {id} not found")) }

/// `GET /chat/faqs`
pub async fn faqs() -> Json<&'static [FaqEntry]> { Json(FAQS) }

/// `POST /chat/sessions`: starts with the greeting.
pub async fn open<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
) -> impl IntoResponse {
  let body = state
    .chats
    .open(Conversation::new(StdRng::from_entropy()))
    .await;
  tracing::debug!(chat_id = %body.id, "chat session opened");
  (StatusCode::CREATED, Json(body))
}

/// `GET /chat/sessions/{id}`
pub async fn transcript_of<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Transcript>, ApiError> {
  let body = state
    .chats
    .with(id, |id, conversation| Ok(transcript(id, conversation)))
    .await?;
  Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
  pub text: String,
}

#[derive(Debug, Serialize)]
pub struct Exchange {
  pub message: ChatMessage,
  pub reply:   ChatMessage,
}

/// `POST /chat/sessions/{id}/messages`
pub async fn send<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SendBody>,
) -> Result<Json<Exchange>, ApiError> {
  let message = state
    .chats
    .with(id, |_, conversation| Ok(conversation.receive(&body.text)?.clone()))
    .await?;

  let chats = state.chats.clone();
  let delay = state.typing_delay;
  let reply = tokio::spawn(async move {
    tokio::time::sleep(delay).await;
    let reply = chats
      .with(id, |_, conversation| Ok(conversation.emit_reply()?.clone()))
      .await;
    tracing::debug!(chat_id = %id, ok = reply.is_ok(), "assistant replied");
    reply
  })
  .await
  .map_err(|e| ApiError::Internal(Box::new(e)))??;

  Ok(Json(Exchange { message, reply }))
}
