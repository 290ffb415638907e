use serde_json::json;
use log::{info, error};

/// Logs an informational notification event in JSON format.
pub fn log_info(event: &str, notification_id: &str, message: &str) {
    info!("{}", json!({
        "event": event,
        "notification_id": notification_id,
        "message": message
    }));
}

/// Logs a failed notification event in JSON format.
pub fn log_error(event: &str, notification_id: &str, error_message: &str) {
    error!("{}", json!({
        "event": event,
        "notification_id": notification_id,
        "error": error_message
    }));
}
