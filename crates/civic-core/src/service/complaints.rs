//! The complaint lifecycle: submission, status transitions, triage queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::Mutex;

use crate::{
  Error, Result,
  complaint::{
    Complaint, ComplaintPatch, ComplaintStats, ComplaintStatus, HistoryEntry,
    NewComplaint, generate_id,
  },
  notification::{NewNotification, NotificationPriority, NotificationSink, NotificationType},
  store::{ComplaintQuery, PortalStore, StatusChange},
  user::Role,
};

/// Fresh ids drawn before a submission is given up.
const MAX_ID_ATTEMPTS: usize = 16;

pub struct ComplaintService<S> {
  store: Arc<S>,
  rng:   Mutex<StdRng>,
}

impl<S: PortalStore> ComplaintService<S> {
  pub fn new(store: Arc<S>) -> Self { Self::with_rng(store, StdRng::from_entropy()) }

  /// Use a specific RNG for id generation.
  pub fn with_rng(store: Arc<S>, rng: StdRng) -> Self {
    Self { store, rng: Mutex::new(rng) }
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate and persist a submission as a `pending` complaint.
  ///
  /// An id that is already taken is redrawn, up to [`MAX_ID_ATTEMPTS`] times.
  pub async fn add_complaint(&self, input: NewComplaint) -> Result<Complaint> {
    input.validate()?;

    let now = Utc::now();
    let mut complaint = Complaint {
      id: String::new(),
      title: input.title,
      description: input.description,
      category: input.category,
      subcategory: input.subcategory,
      location: input.location,
      landmark: input.landmark,
      priority: input.priority,
      status: ComplaintStatus::Pending,
      history: vec![HistoryEntry {
        timestamp:  now,
        status:     ComplaintStatus::Pending,
        notes:      "Complaint registered".to_owned(),
        updated_by: input.submitter.name.clone(),
      }],
      submitter: input.submitter,
      images: input.images,
      created_at: now,
      updated_at: now,
      assigned_to: None,
      resolution_notes: None,
      estimated_resolution: None,
    };

    for attempt in 1..=MAX_ID_ATTEMPTS {
      complaint.id = generate_id(now, &mut *self.rng.lock().await);
      if self.id_taken(&complaint.id).await? {
        tracing::debug!(complaint_id = %complaint.id, attempt, "complaint id taken; redrawing");
        continue;
      }
      if let Err(e) = self.store.insert_complaint(complaint.clone()).await {
        // Lost a race for the id: draw again.
        if self.id_taken(&complaint.id).await? {
          continue;
        }
        return Err(Error::store(e));
      }
      log_registered(&complaint);
      return Ok(complaint);
    }
    tracing::error!(attempts = MAX_ID_ATTEMPTS, "no free complaint id");
    Err(Error::ComplaintIdExhausted(MAX_ID_ATTEMPTS))
  }

  async fn id_taken(&self, id: &str) -> Result<bool> {
    Ok(self.store.get_complaint(id).await.map_err(Error::store)?.is_some())
  }

  /// Move a complaint to `status`, appending one history entry. Unknown ids
  /// are a no-op returning `None`.
  pub async fn update_status(
    &self,
    id: &str,
    status: ComplaintStatus,
    notes: &str,
    updated_by: &str,
  ) -> Result<Option<Complaint>> {
    let change = StatusChange {
      entry:            HistoryEntry {
        timestamp:  Utc::now(),
        status,
        notes:      notes.to_owned(),
        updated_by: updated_by.to_owned(),
      },
      resolution_notes: (status == ComplaintStatus::Resolved && !notes.is_empty())
        .then(|| notes.to_owned()),
    };
    let updated = self
      .store
      .apply_status_change(id, change)
      .await
      .map_err(Error::store)?;
    match &updated {
      Some(c) => tracing::info!(complaint_id = %id, status = %c.status, %updated_by, "status changed"),
      None => tracing::debug!(complaint_id = %id, "status change for unknown complaint ignored"),
    }
    Ok(updated)
  }

  /// [`Self::update_status`], then tell the submitter through `sink` when the
  /// new status is `assigned`, `in-progress` or `resolved`.
  ///
  /// The notification is addressed to the complaint's phone number. A sink
  /// failure is logged; the status change stands.
  pub async fn update_status_notifying<N: NotificationSink>(
    &self,
    id: &str,
    status: ComplaintStatus,
    notes: &str,
    updated_by: &str,
    sink: &N,
  ) -> Result<Option<Complaint>> {
    let Some(complaint) = self.update_status(id, status, notes, updated_by).await? else {
      return Ok(None);
    };
    if let Some(notification) = status_notification(&complaint, notes) {
      if let Err(e) = sink.notify(notification).await {
        tracing::warn!(complaint_id = %id, error = %e, "failed to deliver status notification");
      }
    }
    Ok(Some(complaint))
  }

  /// Apply the same transition to each id, without notifications. Returns
  /// how many complaints existed.
  pub async fn bulk_update_status(
    &self,
    ids: &[String],
    status: ComplaintStatus,
    notes: &str,
    updated_by: &str,
  ) -> Result<usize> {
    let mut updated = 0;
    for id in ids {
      if self.update_status(id, status, notes, updated_by).await?.is_some() {
        updated += 1;
      }
    }
    Ok(updated)
  }

  /// Change assignment, ETA or priority. Status and history are untouched.
  pub async fn update_details(
    &self,
    id: &str,
    patch: &ComplaintPatch,
  ) -> Result<Option<Complaint>> {
    self
      .store
      .apply_patch(id, patch, Utc::now())
      .await
      .map_err(Error::store)
  }

  pub async fn delete_complaint(&self, id: &str) -> Result<bool> {
    let existed = self.store.delete_complaint(id).await.map_err(Error::store)?;
    if existed {
      tracing::info!(complaint_id = %id, "complaint deleted");
    }
    Ok(existed)
  }

  /// Purge every complaint currently `resolved`; returns how many.
  pub async fn delete_resolved_complaints(&self) -> Result<usize> {
    let removed = self
      .store
      .delete_complaints_with_status(ComplaintStatus::Resolved)
      .await
      .map_err(Error::store)?;
    tracing::info!(removed, "purged resolved complaints");
    Ok(removed)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_complaint_by_id(&self, id: &str) -> Result<Option<Complaint>> {
    self.store.get_complaint(id).await.map_err(Error::store)
  }

  pub async fn list_complaints(&self, query: &ComplaintQuery) -> Result<Vec<Complaint>> {
    self.store.list_complaints(query).await.map_err(Error::store)
  }

  pub async fn get_complaints_by_phone(&self, phone: &str) -> Result<Vec<Complaint>> {
    self
      .list_complaints(&ComplaintQuery {
        phone: Some(phone.to_owned()),
        ..Default::default()
      })
      .await
  }

  pub async fn get_complaints_by_category(&self, category: &str) -> Result<Vec<Complaint>> {
    self
      .list_complaints(&ComplaintQuery {
        category: Some(category.to_owned()),
        ..Default::default()
      })
      .await
  }

  /// Complaints created within `[from, to]`.
  pub async fn get_complaints_by_date_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<Complaint>> {
    self
      .list_complaints(&ComplaintQuery {
        created_from: Some(from),
        created_to: Some(to),
        ..Default::default()
      })
      .await
  }

  pub async fn get_complaint_stats(&self) -> Result<ComplaintStats> {
    let all = self.list_complaints(&ComplaintQuery::default()).await?;
    Ok(ComplaintStats::tally(&all))
  }
}

fn log_registered(complaint: &Complaint) {
  tracing::info!(
    complaint_id = %complaint.id,
    category = %complaint.category,
    priority = %complaint.priority,
    "complaint registered"
  );
}

fn status_notification(complaint: &Complaint, notes: &str) -> Option<NewNotification> {
  let kind = NotificationType::for_status_change(complaint.status)?;
  let (title, verb, priority) = match kind {
    NotificationType::ComplaintAssigned => {
      ("Complaint Assigned", "assigned to an officer", NotificationPriority::Medium)
    }
    NotificationType::ComplaintInProgress => {
      ("Work In Progress", "taken up for work", NotificationPriority::Medium)
    }
    _ => ("Complaint Resolved", "resolved", NotificationPriority::High),
  };
  let mut message = format!("Your complaint {} ({}) has been {verb}.", complaint.id, complaint.title);
  if !notes.is_empty() {
    message.push(' ');
    message.push_str(notes);
  }
  Some(NewNotification {
    kind,
    title: title.to_owned(),
    message,
    complaint_id: Some(complaint.id.clone()),
    user_id: complaint.submitter.phone.clone(),
    user_role: Some(Role::Citizen),
    priority,
    action_url: Some(format!("/track-complaint?id={}", complaint.id)),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    complaint::{Priority, Submitter, is_valid_id},
    memory::MemoryStore,
    service::NotificationService,
  };
  use chrono::Duration;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn service() -> (Arc<MemoryStore>, ComplaintService<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let svc = ComplaintService::with_rng(store.clone(), StdRng::seed_from_u64(42));
    (store, svc)
  }

  fn water(phone: &str) -> NewComplaint {
    NewComplaint {
      title:       "No water for three days".into(),
      description: "Taps dry in the whole lane".into(),
      category:    "water".into(),
      subcategory: Some("no-supply".into()),
      location:    "Road No. 12, Banjara Hills".into(),
      landmark:    Some("Opposite temple".into()),
      priority:    Priority::High,
      submitter:   Submitter {
        name:  "Anita".into(),
        phone: phone.into(),
        email: Some("anita@example.com".into()),
      },
      images:      Vec::new(),
    }
  }

  fn roads(phone: &str) -> NewComplaint {
    NewComplaint {
      category: "roads".into(),
      subcategory: Some("potholes".into()),
      priority: Priority::Low,
      ..water(phone)
    }
  }

  #[tokio::test]
  async fn new_complaint_is_pending_with_one_history_entry() {
    let (_, svc) = service();
    let c = svc.add_complaint(water("9876543210")).await.unwrap();

    assert!(is_valid_id(&c.id), "{}", c.id);
    assert_eq!(c.status, ComplaintStatus::Pending);
    assert_eq!(c.history.len(), 1);
    assert_eq!(c.history[0].status, ComplaintStatus::Pending);

    let fetched = svc.get_complaint_by_id(&c.id).await.unwrap().unwrap();
    assert_eq!(fetched, c);
  }

  #[tokio::test]
  async fn invalid_submission_is_not_stored() {
    let (_, svc) = service();
    let mut bad = water("9876543210");
    bad.title = String::new();
    assert!(matches!(svc.add_complaint(bad).await, Err(Error::Validation(_))));
    assert!(svc.list_complaints(&ComplaintQuery::default()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn status_updates_only_append_history() {
    let (_, svc) = service();
    let c = svc.add_complaint(water("9876543210")).await.unwrap();

    let steps = [
      (ComplaintStatus::Assigned, "sent to ward office"),
      (ComplaintStatus::InProgress, "crew dispatched"),
      (ComplaintStatus::Resolved, "valve replaced"),
      (ComplaintStatus::Closed, "confirmed by citizen"),
    ];
    let mut previous = c.history.clone();
    for (status, notes) in steps {
      let updated = svc
        .update_status(&c.id, status, notes, "Ward Officer")
        .await
        .unwrap()
        .unwrap();
      assert_eq!(updated.status, status);
      assert_eq!(updated.history.len(), previous.len() + 1);
      assert_eq!(&updated.history[..previous.len()], previous.as_slice());
      let last = updated.history.last().unwrap();
      assert_eq!(last.status, status);
      assert_eq!(last.notes, notes);
      previous = updated.history;
    }
  }

  #[tokio::test]
  async fn unknown_id_status_update_is_noop() {
    let (_, svc) = service();
    let result = svc
      .update_status("TSC2026000000", ComplaintStatus::Resolved, "", "x")
      .await
      .unwrap();
    assert!(result.is_none());
  }

  #[tokio::test]
  async fn resolving_with_sink_notifies_phone_once() {
    let (store, svc) = service();
    let notifications = NotificationService::new(store.clone());
    let c = svc.add_complaint(water("9876543210")).await.unwrap();

    let updated = svc
      .update_status_notifying(&c.id, ComplaintStatus::Resolved, "fixed", "Water Board", &notifications)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(updated.status, ComplaintStatus::Resolved);
    assert_eq!(updated.history.len(), 2);
    assert_eq!(updated.resolution_notes.as_deref(), Some("fixed"));

    let sent = store.list_notifications().await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationType::ComplaintResolved);
    assert_eq!(sent[0].user_id, "9876543210");
    assert_eq!(sent[0].complaint_id.as_deref(), Some(c.id.as_str()));
  }

  #[tokio::test]
  async fn assigning_and_starting_work_each_notify_once() {
    let cases = [
      (ComplaintStatus::Assigned, NotificationType::ComplaintAssigned),
      (ComplaintStatus::InProgress, NotificationType::ComplaintInProgress),
    ];
    for (status, kind) in cases {
      let (store, svc) = service();
      let notifications = NotificationService::new(store.clone());
      let c = svc.add_complaint(water("9876543210")).await.unwrap();

      svc
        .update_status_notifying(&c.id, status, "ward 4", "Water Board", &notifications)
        .await
        .unwrap()
        .unwrap();

      let sent = store.list_notifications().await.unwrap();
      assert_eq!(sent.len(), 1, "{status}");
      assert_eq!(sent[0].kind, kind);
      assert_eq!(sent[0].user_id, "9876543210");
      assert_eq!(sent[0].user_role, Some(Role::Citizen));
      assert!(sent[0].message.ends_with("ward 4"), "{}", sent[0].message);
    }
  }

  struct FailingSink {
    calls: AtomicUsize,
  }

  impl NotificationSink for FailingSink {
    async fn notify(&self, _: NewNotification) -> Result<crate::notification::Notification> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Err(Error::Validation("delivery refused".into()))
    }
  }

  #[tokio::test]
  async fn failing_sink_does_not_undo_the_status_change() {
    let (_, svc) = service();
    let sink = FailingSink { calls: AtomicUsize::new(0) };
    let c = svc.add_complaint(water("9876543210")).await.unwrap();

    let updated = svc
      .update_status_notifying(&c.id, ComplaintStatus::Resolved, "fixed", "Admin", &sink)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    assert_eq!(updated.status, ComplaintStatus::Resolved);

    let stored = svc.get_complaint_by_id(&c.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ComplaintStatus::Resolved);
    assert_eq!(stored.history.len(), 2);
    assert_eq!(stored.history[1].notes, "fixed");
    assert_eq!(stored.resolution_notes.as_deref(), Some("fixed"));
  }

  #[tokio::test]
  async fn taken_ids_are_redrawn() {
    let store = Arc::new(MemoryStore::new());
    let first = ComplaintService::with_rng(store.clone(), StdRng::seed_from_u64(5));
    let second = ComplaintService::with_rng(store.clone(), StdRng::seed_from_u64(5));

    let a = first.add_complaint(water("1")).await.unwrap();
    let b = second.add_complaint(water("2")).await.unwrap();
    assert_ne!(a.id, b.id);
    assert!(is_valid_id(&b.id));
    assert_eq!(svc_ids(&first).await, {
      let mut ids = vec![a.id, b.id];
      ids.sort();
      ids
    });
  }

  #[tokio::test]
  async fn submission_fails_once_every_attempt_is_taken() {
    let store = Arc::new(MemoryStore::new());
    let filler = ComplaintService::with_rng(store.clone(), StdRng::seed_from_u64(5));
    for _ in 0..MAX_ID_ATTEMPTS {
      filler.add_complaint(water("1")).await.unwrap();
    }

    let unlucky = ComplaintService::with_rng(store.clone(), StdRng::seed_from_u64(5));
    let result = unlucky.add_complaint(water("2")).await;
    assert!(matches!(result, Err(Error::ComplaintIdExhausted(MAX_ID_ATTEMPTS))));
    assert_eq!(svc_ids(&filler).await.len(), MAX_ID_ATTEMPTS);
  }

  async fn svc_ids(svc: &ComplaintService<MemoryStore>) -> Vec<String> {
    let mut ids: Vec<String> = svc
      .list_complaints(&ComplaintQuery::default())
      .await
      .unwrap()
      .into_iter()
      .map(|c| c.id)
      .collect();
    ids.sort();
    ids
  }

  #[tokio::test]
  async fn closing_or_reopening_sends_nothing() {
    let (store, svc) = service();
    let notifications = NotificationService::new(store.clone());
    let c = svc.add_complaint(water("9876543210")).await.unwrap();

    for status in [ComplaintStatus::Closed, ComplaintStatus::Pending] {
      svc
        .update_status_notifying(&c.id, status, "", "Admin", &notifications)
        .await
        .unwrap();
    }
    assert!(store.list_notifications().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn bulk_update_skips_unknown_and_sends_nothing() {
    let (store, svc) = service();
    let a = svc.add_complaint(water("1")).await.unwrap();
    let b = svc.add_complaint(roads("2")).await.unwrap();

    let ids = vec![a.id.clone(), "TSC2026999999".to_owned(), b.id.clone()];
    let n = svc
      .bulk_update_status(&ids, ComplaintStatus::InProgress, "batch", "Admin")
      .await
      .unwrap();
    assert_eq!(n, 2);
    for id in [&a.id, &b.id] {
      let c = svc.get_complaint_by_id(id).await.unwrap().unwrap();
      assert_eq!(c.status, ComplaintStatus::InProgress);
      assert_eq!(c.history.len(), 2);
    }
    assert!(store.list_notifications().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn stats_total_matches_per_status_sum() {
    let (_, svc) = service();
    let statuses = [
      ComplaintStatus::Pending,
      ComplaintStatus::Assigned,
      ComplaintStatus::Resolved,
      ComplaintStatus::Resolved,
      ComplaintStatus::Closed,
      ComplaintStatus::InProgress,
    ];
    for (i, status) in statuses.iter().enumerate() {
      let input = if i % 2 == 0 { water("1") } else { roads("2") };
      let c = svc.add_complaint(input).await.unwrap();
      if *status != ComplaintStatus::Pending {
        svc.update_status(&c.id, *status, "", "Admin").await.unwrap();
      }
    }

    let stats = svc.get_complaint_stats().await.unwrap();
    let per_status: usize = ComplaintStatus::ALL.iter().map(|s| stats.count(*s)).sum();
    assert_eq!(stats.total, statuses.len());
    assert_eq!(per_status, stats.total);
    assert_eq!(stats.resolved, 2);
    assert_eq!(stats.by_category.get("water"), Some(&3));
    assert_eq!(stats.by_priority.get(&Priority::Low), Some(&3));
  }

  #[tokio::test]
  async fn purge_removes_exactly_the_resolved() {
    let (_, svc) = service();
    let mut resolved_ids = Vec::new();
    for i in 0..5 {
      let c = svc.add_complaint(water("1")).await.unwrap();
      if i % 2 == 0 {
        svc.update_status(&c.id, ComplaintStatus::Resolved, "", "Admin").await.unwrap();
        resolved_ids.push(c.id);
      }
    }

    assert_eq!(svc.delete_resolved_complaints().await.unwrap(), resolved_ids.len());
    let remaining = svc.list_complaints(&ComplaintQuery::default()).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|c| c.status != ComplaintStatus::Resolved));
    assert_eq!(svc.delete_resolved_complaints().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn delete_reports_existence() {
    let (_, svc) = service();
    let c = svc.add_complaint(water("1")).await.unwrap();
    assert!(svc.delete_complaint(&c.id).await.unwrap());
    assert!(!svc.delete_complaint(&c.id).await.unwrap());
    assert!(svc.get_complaint_by_id(&c.id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn queries_filter_by_phone_category_and_date() {
    let (_, svc) = service();
    svc.add_complaint(water("111")).await.unwrap();
    svc.add_complaint(roads("111")).await.unwrap();
    svc.add_complaint(water("222")).await.unwrap();

    let by_phone = svc.get_complaints_by_phone("111").await.unwrap();
    assert_eq!(by_phone.len(), 2);
    let by_cat = svc.get_complaints_by_category("water").await.unwrap();
    assert_eq!(by_cat.len(), 2);

    let now = Utc::now();
    let all = svc
      .get_complaints_by_date_range(now - Duration::hours(1), now + Duration::hours(1))
      .await
      .unwrap();
    assert_eq!(all.len(), 3);
    let none = svc
      .get_complaints_by_date_range(now - Duration::days(2), now - Duration::days(1))
      .await
      .unwrap();
    assert!(none.is_empty());
  }

  #[tokio::test]
  async fn newest_complaint_is_listed_first() {
    let (_, svc) = service();
    let first = svc.add_complaint(water("1")).await.unwrap();
    let second = svc.add_complaint(roads("1")).await.unwrap();
    let listed = svc.list_complaints(&ComplaintQuery::default()).await.unwrap();
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);
  }

  #[tokio::test]
  async fn details_patch_leaves_history_alone() {
    let (_, svc) = service();
    let c = svc.add_complaint(water("1")).await.unwrap();
    let patched = svc
      .update_details(&c.id, &ComplaintPatch {
        assigned_to: Some("AE Ward 4".into()),
        priority: Some(Priority::Low),
        ..Default::default()
      })
      .await
      .unwrap()
      .unwrap();
    assert_eq!(patched.assigned_to.as_deref(), Some("AE Ward 4"));
    assert_eq!(patched.priority, Priority::Low);
    assert_eq!(patched.status, ComplaintStatus::Pending);
    assert_eq!(patched.history, c.history);
  }
}
