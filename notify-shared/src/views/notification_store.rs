use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::notifications::{Notification, NotificationCategory, NotificationDetail, NotificationSnapshot};

/// Holds the last fetched snapshot and derives views from it.
///
/// The snapshot sits behind an `Arc` that is swapped under the write lock, so
/// a reader holds either the old snapshot or the new one in full.
#[derive(Default)]
pub struct NotificationStore {
    current: RwLock<Option<Arc<NotificationSnapshot>>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, snapshot: NotificationSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(snapshot);
    }

    pub async fn snapshot(&self) -> Option<Arc<NotificationSnapshot>> {
        self.current.read().await.clone()
    }

    /// Notifications in the order the service returned them.
    pub async fn all(&self) -> Vec<Notification> {
        self.snapshot()
            .await
            .map(|snapshot| snapshot.notifications.clone())
            .unwrap_or_default()
    }

    pub async fn unread_count(&self) -> usize {
        self.snapshot().await.map(|s| s.unread_count()).unwrap_or(0)
    }

    pub async fn get(&self, id: &str) -> Option<Notification> {
        let snapshot = self.snapshot().await?;
        snapshot.notifications.iter().find(|n| n.id == id).cloned()
    }

    /// Flips one notification to read. Unknown ids and already-read
    /// notifications are left alone; returns whether anything changed.
    pub async fn mark_read(&self, id: &str) -> bool {
        let mut guard = self.current.write().await;
        let Some(snapshot) = guard.as_mut() else {
            return false;
        };

        let Some(index) = snapshot.notifications.iter().position(|n| n.id == id && !n.is_read) else {
            return false;
        };

        // Copy-on-write: readers still holding the previous Arc keep an unchanged view.
        Arc::make_mut(snapshot).notifications[index].is_read = true;
        debug!(notification_id = id, "Marked notification read locally");
        true
    }

    pub async fn filtered<P>(&self, predicate: P) -> Vec<Notification>
    where
        P: Fn(&Notification) -> bool,
    {
        self.snapshot()
            .await
            .map(|snapshot| snapshot.notifications.iter().filter(|n| predicate(n)).cloned().collect())
            .unwrap_or_default()
    }

    pub async fn unread(&self) -> Vec<Notification> {
        self.filtered(|n| !n.is_read).await
    }

    pub async fn overdue(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.filtered(|n| n.is_overdue(now)).await
    }

    /// Groups by source in first-seen order; entries keep fetch order.
    pub async fn by_source(&self) -> Vec<NotificationCategory> {
        let Some(snapshot) = self.snapshot().await else {
            return Vec::new();
        };

        let mut categories: Vec<NotificationCategory> = Vec::new();
        for notification in &snapshot.notifications {
            let title = notification.category();
            match categories.iter_mut().find(|c| c.title == title) {
                Some(category) => category.entries.push(notification.clone()),
                None => categories.push(NotificationCategory {
                    title: title.to_string(),
                    entries: vec![notification.clone()],
                }),
            }
        }
        categories
    }

    pub async fn detail(&self, id: &str) -> Option<NotificationDetail> {
        self.get(id).await.as_ref().map(NotificationDetail::from)
    }
}
