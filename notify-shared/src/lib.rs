//! Notification sync core: credential handling, snapshot fetching, read-state
//! and primary-action dispatch for a notification widget, driven by a small
//! state machine.

pub mod models;
pub mod services;
pub mod state_machine;
pub mod utilities;
pub mod views;

pub use models::errors::{ActionError, AuthError, ConfigError, FetchError, SyncError, SyncErrorKind};
pub use models::notifications::{DispatchResult, Notification, NotificationFilter, NotificationSnapshot};
pub use state_machine::sync_controller::{SyncController, SyncState};
pub use utilities::config::SyncConfig;
