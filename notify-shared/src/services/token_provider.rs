use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::models::auth::Credential;
use crate::models::errors::AuthError;
use crate::services::transport::NotificationTransport;

#[derive(Default)]
struct TokenCache {
    credential: Option<Credential>,
    // Bumped on every issuance so a stale expiry timer never clears a newer credential.
    generation: u64,
    // Outcome of the last failed identity call, tagged with its attempt number.
    last_failure: Option<(u64, AuthError)>,
}

/// Obtains and caches the bearer credential.
///
/// The cache lock is held across the identity call, so concurrent callers
/// queue behind one in-flight request and then read its result: the cached
/// credential on success, the same `AuthError` on failure.
pub struct TokenProvider {
    transport: Arc<dyn NotificationTransport>,
    ttl: Duration,
    cached_token: Arc<Mutex<TokenCache>>,
    completed_attempts: AtomicU64,
    expiry_timer: StdMutex<Option<AbortHandle>>,
}

impl TokenProvider {
    pub fn new(transport: Arc<dyn NotificationTransport>, ttl: Duration) -> Self {
        Self {
            transport,
            ttl,
            cached_token: Arc::new(Mutex::new(TokenCache::default())),
            completed_attempts: AtomicU64::new(0),
            expiry_timer: StdMutex::new(None),
        }
    }

    pub async fn get_valid_credential(&self) -> Result<Credential, AuthError> {
        // Attempts finishing after this point were in flight while we queued.
        let seen = self.completed_attempts.load(Ordering::SeqCst);
        let mut guard = self.cached_token.lock().await;

        match guard.credential.as_ref() {
            Some(credential) if credential.is_valid() => {
                debug!(
                    remaining_ms = credential.expires_at().saturating_duration_since(Instant::now()).as_millis() as u64,
                    "Credential cache hit"
                );
                return Ok(credential.clone());
            }
            Some(_) => info!("Cached credential expired, requesting a new one"),
            None => info!("Credential cache miss, requesting a new one"),
        }
        guard.credential = None;

        if let Some((attempt, error)) = &guard.last_failure {
            if *attempt > seen {
                debug!(%error, "Sharing the failure of the identity call this caller waited on");
                return Err(error.clone());
            }
        }

        let outcome = self.request_token().await;
        let attempt = self.completed_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let token = match outcome {
            Ok(token) => {
                guard.last_failure = None;
                token
            }
            Err(error) => {
                guard.last_failure = Some((attempt, error.clone()));
                return Err(error);
            }
        };

        let credential = Credential::new(token, Instant::now(), self.ttl);
        guard.generation += 1;
        guard.credential = Some(credential.clone());
        self.schedule_expiry(guard.generation, credential.expires_at());

        info!(ttl_ms = self.ttl.as_millis() as u64, "New credential cached");
        Ok(credential)
    }

    async fn request_token(&self) -> Result<String, AuthError> {
        let response = self
            .transport
            .fetch_token()
            .await
            .map_err(|e| AuthError::IdentityUnreachable(e.to_string()))?;

        if !response.is_ok() {
            warn!(status = response.status, "Identity endpoint rejected the session");
            return Err(AuthError::IdentityRejected(response.status));
        }

        let token = response.body.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(token.to_string())
    }

    /// True when a cached credential exists and has not expired.
    pub async fn has_valid_credential(&self) -> bool {
        self.cached_token
            .lock()
            .await
            .credential
            .as_ref()
            .is_some_and(Credential::is_valid)
    }

    /// The cached credential, whether or not it is still valid.
    pub async fn cached(&self) -> Option<Credential> {
        self.cached_token.lock().await.credential.clone()
    }

    pub async fn invalidate(&self) {
        let mut guard = self.cached_token.lock().await;
        guard.credential = None;
        // Cancelled under the cache lock, where new timers are scheduled.
        self.cancel_expiry();
    }

    /// Drops the cached credential only if it is the one that was rejected;
    /// a newer credential obtained meanwhile by another caller is kept.
    pub async fn invalidate_rejected(&self, rejected: &Credential) {
        let mut guard = self.cached_token.lock().await;
        if guard.credential.as_ref() == Some(rejected) {
            warn!("Credential rejected by the notification service, invalidating");
            guard.credential = None;
            self.cancel_expiry();
        }
    }

    /// Cancels the pending expiry timer. The cached credential keeps being
    /// checked against its TTL on every read.
    pub fn shutdown(&self) {
        self.cancel_expiry();
    }

    fn schedule_expiry(&self, generation: u64, expires_at: Instant) {
        let cache = self.cached_token.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let mut guard = cache.lock().await;
            if guard.generation == generation {
                guard.credential = None;
                debug!("Credential expired and was dropped from the cache");
            }
        });

        let previous = self
            .expiry_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel_expiry(&self) {
        let pending = self
            .expiry_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = pending {
            timer.abort();
        }
    }
}

impl Drop for TokenProvider {
    fn drop(&mut self) {
        self.cancel_expiry();
    }
}
