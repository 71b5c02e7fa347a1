//! Router tests over the in-memory store.

use std::{sync::Arc, time::Duration};

use argon2::{Algorithm, Argon2, Params, Version};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use civic_core::{
  chatbot,
  memory::MemoryStore,
  service::{AuthService, default_seed_users},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

const PASSWORD: &str = "secret123";

async fn make_state() -> AppState<MemoryStore> { make_state_typing(Duration::ZERO).await }

async fn make_state_typing(typing_delay: Duration) -> AppState<MemoryStore> {
  let store = Arc::new(MemoryStore::new());
  let hasher = Argon2::new(
    Algorithm::Argon2id,
    Version::V0x13,
    Params::new(8, 1, 1, None).unwrap(),
  );
  let auth = AuthService::with_hasher(store.clone(), hasher);
  let hash = auth.hash_password(PASSWORD).unwrap();
  auth.seed_users(&default_seed_users(&hash)).await.unwrap();
  AppState::new(store, auth, typing_delay)
}

async fn call(
  state: &AppState<MemoryStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn login(state: &AppState<MemoryStore>, email: &str) -> String {
  let (status, body) = call(
    state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": email, "password": PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  body["token"].as_str().unwrap().to_owned()
}

fn water_complaint(phone: &str) -> Value {
  json!({
    "title": "No water for three days",
    "description": "Taps are dry in the whole lane",
    "category": "water",
    "subcategory": "no-supply",
    "location": "Road No. 12, Banjara Hills",
    "priority": "high",
    "submitter": { "name": "Anita", "phone": phone }
  })
}

// ── Account ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_then_me_then_logout() {
  let state = make_state().await;
  let token = login(&state, "admin@tsc.gov.in").await;

  let (status, me) = call(&state, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["role"], "admin");
  assert!(me.get("password_hash").is_none());
  assert!(!me["last_login"].is_null());

  let (status, _) = call(&state, "POST", "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = call(&state, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let state = make_state().await;
  let (status, body) = call(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "admin@tsc.gov.in", "password": "nope" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn register_creates_citizen_and_rejects_duplicates() {
  let state = make_state().await;
  let registration = json!({
    "name": "Meena",
    "email": "meena@example.com",
    "phone": "9811111111",
    "password": "hunter22"
  });

  let (status, session) =
    call(&state, "POST", "/auth/register", None, Some(registration.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(session["user"]["role"], "citizen");

  let (status, _) = call(&state, "POST", "/auth/register", None, Some(registration)).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn profile_update_is_persisted_in_session() {
  let state = make_state().await;
  let token = login(&state, "citizen@example.com").await;

  let (status, user) = call(
    &state,
    "PATCH",
    "/auth/me",
    Some(&token),
    Some(json!({ "name": "Demo Citizen Renamed" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(user["name"], "Demo Citizen Renamed");

  let (_, me) = call(&state, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(me["name"], "Demo Citizen Renamed");
}

// ── Complaints ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_submission_is_trackable_and_alerts_admins() {
  let state = make_state().await;
  let (status, complaint) =
    call(&state, "POST", "/complaints", None, Some(water_complaint("9876543210"))).await;
  assert_eq!(status, StatusCode::CREATED, "{complaint}");
  let id = complaint["id"].as_str().unwrap().to_owned();
  assert!(id.starts_with("TSC"));
  assert_eq!(complaint["status"], "pending");
  assert_eq!(complaint["history"].as_array().unwrap().len(), 1);

  let (status, tracked) = call(&state, "GET", &format!("/complaints/{id}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(tracked["id"], id.as_str());

  let (_, mine) = call(&state, "GET", "/complaints/by-phone/9876543210", None, None).await;
  assert_eq!(mine.as_array().unwrap().len(), 1);

  let admin = login(&state, "admin@tsc.gov.in").await;
  let (_, inbox) = call(&state, "GET", "/notifications", Some(&admin), None).await;
  assert_eq!(inbox["unread"], 1);
  assert_eq!(inbox["notifications"][0]["type"], "complaint_submitted");
  assert_eq!(inbox["notifications"][0]["complaint_id"], id.as_str());

  let official = login(&state, "official@tsc.gov.in").await;
  let (_, inbox) = call(&state, "GET", "/notifications", Some(&official), None).await;
  assert_eq!(inbox["unread"], 0);
}

#[tokio::test]
async fn unknown_category_and_missing_complaint() {
  let state = make_state().await;
  let mut body = water_complaint("9876543210");
  body["category"] = json!("weather");
  let (status, _) = call(&state, "POST", "/complaints", None, Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&state, "GET", "/complaints/TSC2026000000", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_routes_are_staff_only() {
  let state = make_state().await;
  let (status, _) = call(&state, "GET", "/complaints", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let citizen = login(&state, "citizen@example.com").await;
  let (status, _) = call(&state, "GET", "/complaints/stats", Some(&citizen), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let official = login(&state, "official@tsc.gov.in").await;
  let (status, stats) = call(&state, "GET", "/complaints/stats", Some(&official), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["total"], 0);
}

#[tokio::test]
async fn resolving_notifies_the_submitter() {
  let state = make_state().await;
  let (_, complaint) =
    call(&state, "POST", "/complaints", None, Some(water_complaint("9000000003"))).await;
  let id = complaint["id"].as_str().unwrap().to_owned();

  let official = login(&state, "official@tsc.gov.in").await;
  let (status, updated) = call(
    &state,
    "POST",
    &format!("/complaints/{id}/status"),
    Some(&official),
    Some(json!({ "status": "resolved", "notes": "valve replaced" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["status"], "resolved");
  assert_eq!(updated["resolution_notes"], "valve replaced");
  let history = updated["history"].as_array().unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[1]["updated_by"], "Water Board Officer");

  let citizen = login(&state, "citizen@example.com").await;
  let (_, inbox) = call(&state, "GET", "/notifications", Some(&citizen), None).await;
  let notes = inbox["notifications"].as_array().unwrap();
  assert_eq!(notes.len(), 1);
  assert_eq!(notes[0]["type"], "complaint_resolved");
  assert_eq!(notes[0]["user_id"], "9000000003");

  let (_, stats) = call(&state, "GET", "/complaints/stats", Some(&official), None).await;
  assert_eq!(stats["resolved"], 1);
}

#[tokio::test]
async fn status_updates_reach_a_staff_submitter_by_phone() {
  let state = make_state().await;
  // The official files a complaint under their own phone number.
  let (_, complaint) =
    call(&state, "POST", "/complaints", None, Some(water_complaint("9000000002"))).await;
  let id = complaint["id"].as_str().unwrap().to_owned();

  let admin = login(&state, "admin@tsc.gov.in").await;
  let (status, _) = call(
    &state,
    "POST",
    &format!("/complaints/{id}/status"),
    Some(&admin),
    Some(json!({ "status": "assigned" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let official = login(&state, "official@tsc.gov.in").await;
  let (_, inbox) = call(&state, "GET", "/notifications", Some(&official), None).await;
  let notes = inbox["notifications"].as_array().unwrap();
  assert_eq!(notes.len(), 1);
  assert_eq!(notes[0]["type"], "complaint_assigned");

  let (_, inbox) = call(&state, "GET", "/notifications", Some(&admin), None).await;
  let kinds: Vec<_> = inbox["notifications"]
    .as_array()
    .unwrap()
    .iter()
    .map(|n| n["type"].clone())
    .collect();
  assert_eq!(kinds, vec![json!("complaint_submitted")]);
}

#[tokio::test]
async fn filters_bulk_updates_and_details() {
  let state = make_state().await;
  let mut ids = Vec::new();
  for phone in ["111", "222", "111"] {
    let (_, c) = call(&state, "POST", "/complaints", None, Some(water_complaint(phone))).await;
    ids.push(c["id"].as_str().unwrap().to_owned());
  }
  let official = login(&state, "official@tsc.gov.in").await;

  let (_, listed) =
    call(&state, "GET", "/complaints?phone=111", Some(&official), None).await;
  assert_eq!(listed.as_array().unwrap().len(), 2);

  let (_, bulk) = call(
    &state,
    "POST",
    "/complaints/bulk-status",
    Some(&official),
    Some(json!({ "ids": [ids[0], ids[1], "TSC2026999999"], "status": "assigned" })),
  )
  .await;
  assert_eq!(bulk["updated"], 2);

  let (_, assigned) =
    call(&state, "GET", "/complaints?status=assigned", Some(&official), None).await;
  assert_eq!(assigned.as_array().unwrap().len(), 2);

  let (status, patched) = call(
    &state,
    "PATCH",
    &format!("/complaints/{}", ids[2]),
    Some(&official),
    Some(json!({ "assigned_to": "Ward 12 crew", "priority": "low" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(patched["assigned_to"], "Ward 12 crew");
  assert_eq!(patched["priority"], "low");
  assert_eq!(patched["status"], "pending");
  assert_eq!(patched["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deletes_are_admin_only() {
  let state = make_state().await;
  let (_, a) = call(&state, "POST", "/complaints", None, Some(water_complaint("1"))).await;
  let (_, b) = call(&state, "POST", "/complaints", None, Some(water_complaint("2"))).await;
  let a = a["id"].as_str().unwrap().to_owned();
  let b = b["id"].as_str().unwrap().to_owned();

  let official = login(&state, "official@tsc.gov.in").await;
  let admin = login(&state, "admin@tsc.gov.in").await;

  let (status, _) =
    call(&state, "DELETE", &format!("/complaints/{a}"), Some(&official), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  call(
    &state,
    "POST",
    &format!("/complaints/{b}/status"),
    Some(&official),
    Some(json!({ "status": "resolved" })),
  )
  .await;
  let (_, purged) = call(&state, "DELETE", "/complaints/resolved", Some(&admin), None).await;
  assert_eq!(purged["removed"], 1);

  let (status, _) = call(&state, "DELETE", &format!("/complaints/{a}"), Some(&admin), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&state, "DELETE", &format!("/complaints/{a}"), Some(&admin), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Notifications ────────────────────────────────────────────────────────────

#[tokio::test]
async fn broadcast_read_and_clear() {
  let state = make_state().await;
  let admin = login(&state, "admin@tsc.gov.in").await;
  let citizen = login(&state, "citizen@example.com").await;

  let (status, created) = call(
    &state,
    "POST",
    "/notifications",
    Some(&admin),
    Some(json!({
      "type": "system",
      "title": "Maintenance",
      "message": "The portal is down tonight",
      "user_id": "all"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let id = created["id"].as_str().unwrap().to_owned();

  let (status, _) = call(&state, "POST", "/notifications", Some(&citizen), Some(created.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, inbox) = call(&state, "GET", "/notifications", Some(&citizen), None).await;
  assert_eq!(inbox["unread"], 1);

  let (status, _) =
    call(&state, "POST", &format!("/notifications/{id}/read"), Some(&citizen), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, inbox) = call(&state, "GET", "/notifications", Some(&citizen), None).await;
  assert_eq!(inbox["unread"], 0);
  assert_eq!(inbox["notifications"].as_array().unwrap().len(), 1);

  let (_, cleared) = call(&state, "DELETE", "/notifications", Some(&citizen), None).await;
  assert_eq!(cleared["removed"], 1);
  let (status, _) =
    call(&state, "DELETE", &format!("/notifications/{id}"), Some(&admin), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hidden_notifications_cannot_be_touched() {
  let state = make_state().await;
  // Raises an admin-only `complaint_submitted` alert.
  call(&state, "POST", "/complaints", None, Some(water_complaint("1"))).await;
  let admin = login(&state, "admin@tsc.gov.in").await;
  let citizen = login(&state, "citizen@example.com").await;

  let (_, inbox) = call(&state, "GET", "/notifications", Some(&admin), None).await;
  let id = inbox["notifications"][0]["id"].as_str().unwrap().to_owned();

  let (status, _) =
    call(&state, "POST", &format!("/notifications/{id}/read"), Some(&citizen), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (_, all) = call(&state, "POST", "/notifications/read-all", Some(&citizen), None).await;
  assert_eq!(all["updated"], 0);

  let (_, inbox) = call(&state, "GET", "/notifications", Some(&admin), None).await;
  assert_eq!(inbox["unread"], 1);
}

// ── Chat ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_session_round_trip() {
  let state = make_state().await;
  let (status, opened) = call(&state, "POST", "/chat/sessions", None, None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(opened["messages"][0]["text"], chatbot::GREETING);
  let id = opened["id"].as_str().unwrap().to_owned();

  let question = "How can I track my complaint status?";
  let (status, exchange) = call(
    &state,
    "POST",
    &format!("/chat/sessions/{id}/messages"),
    None,
    Some(json!({ "text": question })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(exchange["message"]["sender"], "user");
  assert_eq!(exchange["reply"]["sender"], "bot");
  assert_eq!(exchange["reply"]["text"], chatbot::respond(question));

  let (_, transcript) = call(&state, "GET", &format!("/chat/sessions/{id}"), None, None).await;
  assert_eq!(transcript["messages"].as_array().unwrap().len(), 3);
  assert_eq!(transcript["state"], "awaiting_input");

  let (status, _) = call(
    &state,
    "POST",
    &format!("/chat/sessions/{id}/messages"),
    None,
    Some(json!({ "text": "   " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn abandoned_message_still_gets_its_reply() {
  let state = make_state_typing(Duration::from_millis(200)).await;
  let (_, opened) = call(&state, "POST", "/chat/sessions", None, None).await;
  let id = opened["id"].as_str().unwrap().to_owned();
  let messages = format!("/chat/sessions/{id}/messages");

  // The caller gives up while the assistant is typing.
  let abandoned = tokio::time::timeout(
    Duration::from_millis(20),
    call(&state, "POST", &messages, None, Some(json!({ "text": "thanks" }))),
  )
  .await;
  assert!(abandoned.is_err());

  tokio::time::sleep(Duration::from_millis(400)).await;
  let (_, transcript) = call(&state, "GET", &format!("/chat/sessions/{id}"), None, None).await;
  assert_eq!(transcript["state"], "awaiting_input");
  assert_eq!(transcript["messages"].as_array().unwrap().len(), 3);

  let (status, exchange) =
    call(&state, "POST", &messages, None, Some(json!({ "text": "status?" }))).await;
  assert_eq!(status, StatusCode::OK, "{exchange}");
  assert_eq!(exchange["reply"]["sender"], "bot");
}

#[tokio::test]
async fn idle_chat_sessions_are_dropped() {
  let state = make_state().await.with_chat_limits(Duration::ZERO, 10);
  let (status, opened) = call(&state, "POST", "/chat/sessions", None, None).await;
  assert_eq!(status, StatusCode::CREATED);
  let id = opened["id"].as_str().unwrap().to_owned();

  let (status, _) = call(&state, "GET", &format!("/chat/sessions/{id}"), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(state.chats.active().await, 0);
}

#[tokio::test]
async fn chat_sessions_are_capped_least_recent_first() {
  let state = make_state()
    .await
    .with_chat_limits(Duration::from_secs(3600), 2);
  let mut ids = Vec::new();
  for _ in 0..2 {
    let (_, opened) = call(&state, "POST", "/chat/sessions", None, None).await;
    ids.push(opened["id"].as_str().unwrap().to_owned());
  }
  // Touching the first makes the second the least recently used.
  let (status, _) = call(&state, "GET", &format!("/chat/sessions/{}", ids[0]), None, None).await;
  assert_eq!(status, StatusCode::OK);

  let (_, opened) = call(&state, "POST", "/chat/sessions", None, None).await;
  ids.push(opened["id"].as_str().unwrap().to_owned());
  assert_eq!(state.chats.active().await, 2);

  for (id, expected) in ids.iter().zip([StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::OK]) {
    let (status, _) = call(&state, "GET", &format!("/chat/sessions/{id}"), None, None).await;
    assert_eq!(status, expected, "{id}");
  }
}

#[tokio::test]
async fn faqs_and_unknown_chat_session() {
  let state = make_state().await;
  let (_, faqs) = call(&state, "GET", "/chat/faqs", None, None).await;
  assert_eq!(faqs.as_array().unwrap().len(), chatbot::FAQS.len());

  let (status, _) = call(
    &state,
    "GET",
    "/chat/sessions/00000000-0000-0000-0000-000000000000",
    None,
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Language ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn language_selection_and_tables() {
  let state = make_state().await;
  let (_, current) = call(&state, "GET", "/language", None, None).await;
  assert_eq!(current["language"], "en");

  let (status, _) =
    call(&state, "PUT", "/language", None, Some(json!({ "language": "te" }))).await;
  assert_eq!(status, StatusCode::OK);
  let (_, current) = call(&state, "GET", "/language", None, None).await;
  assert_eq!(current["language"], "te");

  let (status, table) = call(&state, "GET", "/i18n/hi", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(table["strings"]["nav.home"], "होम");

  let (status, _) = call(&state, "GET", "/i18n/fr", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, categories) = call(&state, "GET", "/categories", None, None).await;
  assert_eq!(categories[0]["id"], "water");
}
