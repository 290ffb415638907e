use chrono::{DateTime, Utc};
use notify_shared::models::notifications::{NotificationCategory, NotificationDetail};
use notify_shared::{SyncController, SyncState};
use serde_json::json;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSummary {
    pub total: usize,
    pub unread: usize,
    pub overdue: usize,
    pub categories: Vec<(String, usize)>,
}

/// Counts for the headless view: totals, unread, overdue and entries per category.
pub fn summarize(categories: &[NotificationCategory], now: DateTime<Utc>) -> ViewSummary {
    let entries = || categories.iter().flat_map(|c| c.entries.iter());

    ViewSummary {
        total: entries().count(),
        unread: entries().filter(|n| !n.is_read).count(),
        overdue: entries().filter(|n| n.is_overdue(now)).count(),
        categories: categories
            .iter()
            .map(|c| (c.title.clone(), c.entries.len()))
            .collect(),
    }
}

/// Logs the current view every time the controller settles.
pub async fn log_view_changes(controller: SyncController) {
    let mut states = controller.subscribe();

    while states.changed().await.is_ok() {
        let state = *states.borrow_and_update();
        match state {
            SyncState::Ready => {
                let categories = controller.store().by_source().await;
                let summary = summarize(&categories, Utc::now());
                info!("{}", json!({
                    "event": "notifications_ready",
                    "total": summary.total,
                    "unread": summary.unread,
                    "overdue": summary.overdue,
                    "categories": summary.categories,
                }));

                for notification in categories.iter().flat_map(|c| c.entries.iter()).filter(|n| !n.is_read) {
                    let detail = NotificationDetail::from(notification);
                    debug!("{}", json!(detail));
                }
            }
            SyncState::Error(kind) => warn!(%kind, "⚠️ Sync failed, previous notifications still shown"),
            fetching if fetching.is_fetching() => debug!(state = ?fetching, "Sync in progress"),
            other => debug!(state = ?other, "Sync state changed"),
        }
    }
}
