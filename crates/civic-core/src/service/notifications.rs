//! Notification storage and per-viewer reads.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  notification::{NewNotification, Notification, NotificationSink, Viewer},
  store::PortalStore,
  user::Role,
};

pub struct NotificationService<S> {
  store: Arc<S>,
}

impl<S: PortalStore> NotificationService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn add_notification(&self, input: NewNotification) -> Result<Notification> {
    let notification = input.into_notification(Utc::now());
    self
      .store
      .insert_notification(notification.clone())
      .await
      .map_err(Error::store)?;
    tracing::info!(
      notification_id = %notification.id,
      kind = %notification.kind,
      target = %notification.user_id,
      "notification queued"
    );
    Ok(notification)
  }

  /// Everything `user_id` in `role` may see, newest first.
  pub async fn get_notifications_by_user(
    &self,
    user_id: &str,
    role: Role,
  ) -> Result<Vec<Notification>> {
    self
      .visible_to(&Viewer::new(user_id, role))
      .await
  }

  pub async fn visible_to(&self, viewer: &Viewer) -> Result<Vec<Notification>> {
    let all = self.store.list_notifications().await.map_err(Error::store)?;
    Ok(all.into_iter().filter(|n| n.is_visible_to(viewer)).collect())
  }

  pub async fn unread_count(&self, viewer: &Viewer) -> Result<usize> {
    Ok(self.visible_to(viewer).await?.iter().filter(|n| !n.is_read).count())
  }

  /// Returns whether the notification existed.
  pub async fn mark_as_read(&self, id: Uuid) -> Result<bool> {
    let hit = self
      .store
      .mark_notifications_read(&[id])
      .await
      .map_err(Error::store)?;
    Ok(hit > 0)
  }

  /// Mark every unread notification the viewer can see; returns how many.
  pub async fn mark_all_as_read(&self, viewer: &Viewer) -> Result<usize> {
    let ids: Vec<Uuid> = self
      .visible_to(viewer)
      .await?
      .into_iter()
      .filter(|n| !n.is_read)
      .map(|n| n.id)
      .collect();
    if ids.is_empty() {
      return Ok(0);
    }
    self
      .store
      .mark_notifications_read(&ids)
      .await
      .map_err(Error::store)
  }

  /// Returns whether the notification existed.
  pub async fn delete_notification(&self, id: Uuid) -> Result<bool> {
    let hit = self
      .store
      .delete_notifications(&[id])
      .await
      .map_err(Error::store)?;
    Ok(hit > 0)
  }

  /// Delete everything the viewer can see; returns how many.
  pub async fn clear_all_notifications(&self, viewer: &Viewer) -> Result<usize> {
    let ids: Vec<Uuid> = self.visible_to(viewer).await?.into_iter().map(|n| n.id).collect();
    if ids.is_empty() {
      return Ok(0);
    }
    self
      .store
      .delete_notifications(&ids)
      .await
      .map_err(Error::store)
  }
}

impl<S: PortalStore> NotificationSink for NotificationService<S> {
  async fn notify(&self, notification: NewNotification) -> Result<Notification> {
    self.add_notification(notification).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    memory::MemoryStore,
    notification::{ALL_USERS, NotificationPriority, NotificationType},
  };

  fn note(user_id: &str, role: Option<Role>) -> NewNotification {
    NewNotification {
      kind: NotificationType::System,
      title: "Maintenance".into(),
      message: "Portal down at midnight".into(),
      complaint_id: None,
      user_id: user_id.into(),
      user_role: role,
      priority: NotificationPriority::Low,
      action_url: None,
    }
  }

  fn viewer(id: &str, role: Role) -> Viewer { Viewer::new(id, role) }

  async fn populated() -> NotificationService<MemoryStore> {
    let svc = NotificationService::new(Arc::new(MemoryStore::new()));
    svc.add_notification(note(ALL_USERS, None)).await.unwrap();
    svc.add_notification(note("admin-1", None)).await.unwrap();
    svc.add_notification(note("nobody", Some(Role::Official))).await.unwrap();
    svc.add_notification(note("citizen-1", None)).await.unwrap();
    svc
  }

  #[tokio::test]
  async fn viewers_see_broadcast_own_and_role_targets() {
    let svc = populated().await;

    let admin = svc.get_notifications_by_user("admin-1", Role::Admin).await.unwrap();
    assert_eq!(admin.len(), 2);

    let official = svc.visible_to(&viewer("official-9", Role::Official)).await.unwrap();
    assert_eq!(official.len(), 2);

    let stranger = svc.visible_to(&viewer("citizen-2", Role::Citizen)).await.unwrap();
    assert_eq!(stranger.len(), 1);
    assert_eq!(stranger[0].user_id, ALL_USERS);
  }

  #[tokio::test]
  async fn new_notifications_are_unread_and_newest_first() {
    let svc = populated().await;
    let mine = svc.visible_to(&viewer("citizen-1", Role::Citizen)).await.unwrap();
    assert_eq!(mine[0].user_id, "citizen-1");
    assert!(mine.iter().all(|n| !n.is_read));
    assert_eq!(svc.unread_count(&viewer("citizen-1", Role::Citizen)).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn mark_all_as_read_is_scoped_to_viewer() {
    let svc = populated().await;
    let admin = viewer("admin-1", Role::Admin);
    assert_eq!(svc.mark_all_as_read(&admin).await.unwrap(), 2);
    assert_eq!(svc.unread_count(&admin).await.unwrap(), 0);

    // The broadcast is now read for everyone; the citizen's own one is not.
    let citizen = viewer("citizen-1", Role::Citizen);
    assert_eq!(svc.unread_count(&citizen).await.unwrap(), 1);
    assert_eq!(svc.mark_all_as_read(&admin).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn mark_and_delete_single_report_existence() {
    let svc = populated().await;
    let target = svc.visible_to(&viewer("citizen-1", Role::Citizen)).await.unwrap()[0].id;

    assert!(svc.mark_as_read(target).await.unwrap());
    assert!(!svc.mark_as_read(Uuid::new_v4()).await.unwrap());

    assert!(svc.delete_notification(target).await.unwrap());
    assert!(!svc.delete_notification(target).await.unwrap());
  }

  #[tokio::test]
  async fn clear_all_leaves_other_viewers_notifications() {
    let svc = populated().await;
    let official = viewer("official-9", Role::Official);
    assert_eq!(svc.clear_all_notifications(&official).await.unwrap(), 2);
    assert!(svc.visible_to(&official).await.unwrap().is_empty());

    let admin = svc.visible_to(&viewer("admin-1", Role::Admin)).await.unwrap();
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].user_id, "admin-1");
  }

  #[tokio::test]
  async fn sink_stores_notification() {
    let svc = NotificationService::new(Arc::new(MemoryStore::new()));
    let sent = svc.notify(note("9876543210", Some(Role::Citizen))).await.unwrap();
    let seen = svc.visible_to(&viewer("9876543210", Role::Citizen)).await.unwrap();
    assert_eq!(seen, vec![sent]);
  }
}
