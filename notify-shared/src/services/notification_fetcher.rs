use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::models::auth::Credential;
use crate::models::errors::{AuthError, FetchError, SyncError};
use crate::models::notifications::{FetchOptions, NotificationSnapshot};
use crate::services::token_provider::TokenProvider;
use crate::services::transport::{NotificationTransport, TransportResponse};

pub struct NotificationFetcher {
    transport: Arc<dyn NotificationTransport>,
    tokens: Arc<TokenProvider>,
}

impl NotificationFetcher {
    pub fn new(transport: Arc<dyn NotificationTransport>, tokens: Arc<TokenProvider>) -> Self {
        Self { transport, tokens }
    }

    /// Fetches a full snapshot. A 401 invalidates the credential and is
    /// retried exactly once with a fresh one.
    pub async fn fetch_notifications(&self, options: &FetchOptions) -> Result<NotificationSnapshot, SyncError> {
        let credential = self.tokens.get_valid_credential().await?;
        let mut response = self.request(&credential, options).await?;

        if response.is_unauthorized() {
            self.tokens.invalidate_rejected(&credential).await;
            let fresh = self.tokens.get_valid_credential().await?;
            response = self.request(&fresh, options).await?;

            if response.is_unauthorized() {
                self.tokens.invalidate_rejected(&fresh).await;
                warn!("Notification service rejected a freshly issued credential");
                return Err(AuthError::CredentialRejected.into());
            }
        }

        if !response.is_ok() {
            warn!(status = response.status, "Notification fetch failed");
            return Err(FetchError::Status(response.status).into());
        }

        let snapshot = NotificationSnapshot::from_json(&response.body, Utc::now())?;
        info!(
            total = snapshot.notifications.len(),
            unread = snapshot.unread_count(),
            "📬 Fetched notifications"
        );
        Ok(snapshot)
    }

    async fn request(&self, credential: &Credential, options: &FetchOptions) -> Result<TransportResponse, FetchError> {
        self.transport
            .get_notifications(credential.token(), options)
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))
    }
}
