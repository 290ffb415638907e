use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::models::errors::ActionError;
use crate::models::notifications::{ActionKind, DispatchResult, Notification};
use crate::services::token_provider::TokenProvider;
use crate::services::transport::NotificationTransport;
use crate::utilities::logging::{log_error, log_info};
use crate::utilities::requests::resolve_action_url;
use crate::views::notification_store::NotificationStore;

/// Executes a notification's primary action.
pub struct ActionDispatcher {
    transport: Arc<dyn NotificationTransport>,
    tokens: Arc<TokenProvider>,
    store: Arc<NotificationStore>,
    base_url: Url,
}

impl ActionDispatcher {
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        tokens: Arc<TokenProvider>,
        store: Arc<NotificationStore>,
        base_url: Url,
    ) -> Self {
        Self {
            transport,
            tokens,
            store,
            base_url,
        }
    }

    pub async fn invoke(&self, notification: &Notification) -> Result<DispatchResult, ActionError> {
        let action = notification.primary_action();

        if action.kind != ActionKind::MarkReadAndRedirect {
            info!(notification_id = %notification.id, url = %notification.url, "➡️ Plain redirect");
            return Ok(DispatchResult::NavigateTo(notification.url.clone()));
        }

        let target = resolve_action_url(&self.base_url, &action.target_url)
            .map_err(|e| ActionError::InvalidUrl(format!("{}: {}", action.target_url, e)))?;
        let credential = self.tokens.get_valid_credential().await?;

        let response = match self
            .transport
            .send_action(&action.http_method, &target, credential.token())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log_error("mark_read_failed", &notification.id, &e.to_string());
                return Err(ActionError::Unreachable(e.to_string()));
            }
        };

        if !response.is_success() {
            if response.is_unauthorized() {
                self.tokens.invalidate_rejected(&credential).await;
            }
            log_error(
                "mark_read_failed",
                &notification.id,
                &format!("{} {} returned {}", action.http_method, target, response.status),
            );
            return Err(ActionError::Status(response.status));
        }

        // Only flipped once the server confirmed.
        self.store.mark_read(&notification.id).await;
        log_info("mark_read", &notification.id, &format!("{} {}", action.http_method, target));

        Ok(DispatchResult::Navigated {
            id: notification.id.clone(),
            url: notification.url.clone(),
        })
    }
}
