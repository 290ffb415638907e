use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::errors::FetchError;

pub const READ_ATTRIBUTE: &str = "READ";
pub const MARK_READ_AND_REDIRECT_ACTION: &str = "MarkAsReadAndRedirectAction";
pub const DEFAULT_CATEGORY: &str = "Notifications";

/// Notification as delivered by the notification endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    pub id: EntryId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub due_date: Option<DueDate>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub available_actions: Vec<ActionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Text(String),
    Number(i64),
}

impl EntryId {
    fn into_string(self) -> String {
        match self {
            EntryId::Text(id) => id,
            EntryId::Number(id) => id.to_string(),
        }
    }
}

/// Either plain epoch millis or the `{ "time": millis }` object older feeds send.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DueDate {
    Millis(i64),
    Wrapped { time: i64 },
}

impl DueDate {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let millis = match self {
            DueDate::Millis(ms) => *ms,
            DueDate::Wrapped { time } => *time,
        };
        DateTime::from_timestamp_millis(millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    pub id: String,
    pub api_url: String,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Redirect,
    MarkReadAndRedirect,
    Other(String),
}

impl ActionKind {
    fn from_id(id: &str) -> Self {
        match id {
            MARK_READ_AND_REDIRECT_ACTION => ActionKind::MarkReadAndRedirect,
            other => ActionKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: String,
    pub kind: ActionKind,
    pub target_url: String,
    pub http_method: Method,
}

impl Action {
    /// Synthetic primary action for notifications without a mark-read action.
    pub fn redirect(url: &str) -> Self {
        Self {
            id: "Redirect".to_string(),
            kind: ActionKind::Redirect,
            target_url: url.to_string(),
            http_method: Method::GET,
        }
    }
}

impl From<ActionEntry> for Action {
    fn from(entry: ActionEntry) -> Self {
        let http_method = match entry.method.as_deref() {
            None => Method::POST,
            Some(raw) => match raw.trim().to_ascii_uppercase().as_str() {
                "GET" => Method::GET,
                "POST" => Method::POST,
                "PUT" => Method::PUT,
                "PATCH" => Method::PATCH,
                "DELETE" => Method::DELETE,
                _ => {
                    warn!(action = %entry.id, method = raw, "Unknown action method, falling back to POST");
                    Method::POST
                }
            },
        };

        Self {
            kind: ActionKind::from_id(&entry.id),
            id: entry.id,
            target_url: entry.api_url,
            http_method,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub source: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub attributes: HashMap<String, Vec<String>>,
    pub available_actions: Vec<Action>,
}

impl Notification {
    /// The action triggered by a default click: the first mark-read-and-redirect
    /// action if there is one, otherwise a plain redirect to `url`.
    pub fn primary_action(&self) -> Action {
        self.available_actions
            .iter()
            .find(|action| action.kind == ActionKind::MarkReadAndRedirect)
            .cloned()
            .unwrap_or_else(|| Action::redirect(&self.url))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| due < now)
    }

    pub fn category(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

impl From<NotificationEntry> for Notification {
    fn from(entry: NotificationEntry) -> Self {
        let is_read = read_state(&entry.attributes);
        Self {
            id: entry.id.into_string(),
            title: entry.title,
            body: entry.body,
            url: entry.url,
            source: entry.source,
            due_date: entry.due_date.as_ref().and_then(DueDate::to_datetime),
            is_read,
            attributes: entry.attributes,
            available_actions: entry.available_actions.into_iter().map(Action::from).collect(),
        }
    }
}

/// Read state from the attribute bag.
///
/// No `READ` attribute means unread. A present attribute is read unless its
/// first value parses as `false`; empty or malformed values count as read.
pub fn read_state(attributes: &HashMap<String, Vec<String>>) -> bool {
    let Some(values) = attributes.get(READ_ATTRIBUTE) else {
        return false;
    };

    let first = values.first().map(|value| value.trim().to_ascii_lowercase());
    first.as_deref() != Some("false")
}

/// Full-replace result of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub fetched_at: DateTime<Utc>,
}

impl NotificationSnapshot {
    pub fn new(notifications: Vec<Notification>, fetched_at: DateTime<Utc>) -> Self {
        Self { notifications, fetched_at }
    }

    /// Parses the endpoint's JSON array, keeping the order it was received in.
    pub fn from_json(body: &str, fetched_at: DateTime<Utc>) -> Result<Self, FetchError> {
        let entries: Vec<NotificationEntry> =
            serde_json::from_str(body).map_err(|e| FetchError::MalformedPayload(e.to_string()))?;

        let notifications: Vec<Notification> = entries.into_iter().map(Notification::from).collect();

        let mut seen = HashSet::with_capacity(notifications.len());
        for notification in &notifications {
            if !seen.insert(notification.id.as_str()) {
                return Err(FetchError::MalformedPayload(format!(
                    "duplicate notification id {}",
                    notification.id
                )));
            }
        }

        Ok(Self::new(notifications, fetched_at))
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }
}

/// Date window forwarded to the notification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFilter {
    pub days: Option<u32>,
}

impl NotificationFilter {
    pub fn today() -> Self {
        Self { days: Some(1) }
    }

    pub fn all() -> Self {
        Self { days: None }
    }
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self::today()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub days: Option<u32>,
    /// Ask the service to refresh its upstream feeds before answering.
    pub refresh: bool,
}

impl FetchOptions {
    pub fn new(filter: NotificationFilter, refresh: bool) -> Self {
        Self {
            days: filter.days,
            refresh,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(days) = self.days {
            pairs.push(("days", days.to_string()));
        }
        if self.refresh {
            pairs.push(("refresh", "true".to_string()));
        }
        pairs
    }
}

/// Notifications sharing a source, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationCategory {
    pub title: String,
    pub entries: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationDetail {
    pub id: String,
    pub title: String,
    pub body: String,
    pub source: String,
    pub link: String,
}

impl From<&Notification> for NotificationDetail {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id.clone(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            source: notification.category().to_string(),
            link: notification.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Plain redirect; nothing was sent.
    NavigateTo(String),
    /// Mark-as-read was confirmed by the server; the caller performs the navigation.
    Navigated { id: String, url: String },
}
