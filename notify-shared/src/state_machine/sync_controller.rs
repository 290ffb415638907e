use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{watch, Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::models::errors::{ActionError, ConfigError, SyncError, SyncErrorKind};
use crate::models::notifications::{DispatchResult, FetchOptions, Notification, NotificationFilter};
use crate::services::action_dispatcher::ActionDispatcher;
use crate::services::notification_fetcher::NotificationFetcher;
use crate::services::token_provider::TokenProvider;
use crate::services::transport::{HttpTransport, NotificationTransport};
use crate::utilities::config::SyncConfig;
use crate::views::notification_store::NotificationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    FetchingToken,
    FetchingNotifications,
    Ready,
    Error(SyncErrorKind),
}

impl SyncState {
    pub fn can_transition_to(&self, next: &SyncState) -> bool {
        use SyncState::*;
        match (self, next) {
            (Idle, FetchingToken) => true,
            (FetchingToken, FetchingNotifications) => true,
            (FetchingNotifications, Ready) => true,
            (Ready, FetchingNotifications) | (Ready, FetchingToken) => true,
            (Error(_), FetchingToken) => true,
            (_, Error(_)) => true,
            // A cancelled cycle falls back to the last stable state.
            (FetchingToken | FetchingNotifications, Idle | Ready) => true,
            _ => false,
        }
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, SyncState::FetchingToken | SyncState::FetchingNotifications)
    }
}

type Cycle = Shared<BoxFuture<'static, Result<(), SyncError>>>;

struct ControllerInner {
    tokens: Arc<TokenProvider>,
    fetcher: NotificationFetcher,
    dispatcher: ActionDispatcher,
    store: Arc<NotificationStore>,
    filter: RwLock<NotificationFilter>,
    state: watch::Sender<SyncState>,
    in_flight: StdMutex<Option<Cycle>>,
    // Set by manual refreshes; consumed when the notification request is built.
    refresh_requested: AtomicBool,
    shutdown: Notify,
    closed: AtomicBool,
}

/// Orchestrates fetch cycles for one widget instance and exposes the current view.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<ControllerInner>,
}

impl SyncController {
    pub fn new(config: &SyncConfig) -> Result<Self, ConfigError> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Ok(Self::with_transport(transport, config))
    }

    pub fn with_transport(transport: Arc<dyn NotificationTransport>, config: &SyncConfig) -> Self {
        let tokens = Arc::new(TokenProvider::new(transport.clone(), config.token_ttl));
        let store = Arc::new(NotificationStore::new());
        let fetcher = NotificationFetcher::new(transport.clone(), tokens.clone());
        let dispatcher = ActionDispatcher::new(transport, tokens.clone(), store.clone(), config.base_url.clone());
        let (state, _) = watch::channel(SyncState::Idle);

        Self {
            inner: Arc::new(ControllerInner {
                tokens,
                fetcher,
                dispatcher,
                store,
                filter: RwLock::new(config.default_filter),
                state,
                in_flight: StdMutex::new(None),
                refresh_requested: AtomicBool::new(false),
                shutdown: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    pub fn store(&self) -> Arc<NotificationStore> {
        self.inner.store.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.inner.store.unread_count().await
    }

    pub async fn all(&self) -> Vec<Notification> {
        self.inner.store.all().await
    }

    pub async fn filter(&self) -> NotificationFilter {
        *self.inner.filter.read().await
    }

    /// Manual refresh. Joins the in-flight cycle if there is one; a joined
    /// cycle still asks the service to refresh unless its notification
    /// request was already sent.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.cycle(true).await
    }

    /// Changes the date window and fetches again once any in-flight cycle
    /// (started with the old filter) has finished.
    pub async fn set_filter(&self, filter: NotificationFilter) -> Result<(), SyncError> {
        *self.inner.filter.write().await = filter;
        info!(days = ?filter.days, "Notification filter changed");

        if let Some(stale) = self.current_cycle() {
            let _ = stale.await;
        }
        self.cycle(false).await
    }

    pub async fn invoke(&self, notification: &Notification) -> Result<DispatchResult, ActionError> {
        self.inner.dispatcher.invoke(notification).await
    }

    /// Fetches on a fixed cadence until `shutdown` is called.
    pub async fn run(&self, poll_interval: Duration) {
        loop {
            match self.cycle(false).await {
                Ok(()) => {
                    let unread = self.unread_count().await;
                    info!(unread, "🔔 Notifications in sync");
                }
                Err(SyncError::Cancelled) => break,
                Err(e) => error!(error = %e, "Notification sync failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {},
                _ = self.inner.cancelled() => break,
            }
        }
        info!("🛑 Notification polling stopped");
    }

    /// Tears down: cancels the in-flight cycle and the credential expiry timer.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
        self.inner.tokens.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn current_cycle(&self) -> Option<Cycle> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cycle(&self, manual: bool) -> Cycle {
        if manual {
            self.inner.refresh_requested.store(true, Ordering::SeqCst);
        }

        let mut slot = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cycle) = slot.as_ref() {
            debug!("Joining in-flight fetch cycle");
            return cycle.clone();
        }

        let inner = self.inner.clone();
        let cycle = async move {
            let result = inner.run_cycle().await;
            inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner).take();
            result
        }
        .boxed()
        .shared();

        *slot = Some(cycle.clone());
        cycle
    }
}

impl ControllerInner {
    async fn run_cycle(&self) -> Result<(), SyncError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SyncError::Cancelled);
        }

        let previous = *self.state.borrow();
        let filter = *self.filter.read().await;

        let result = tokio::select! {
            result = self.fetch(previous, filter) => result,
            _ = self.cancelled() => Err(SyncError::Cancelled),
        };

        match &result {
            Ok(()) => self.transition(SyncState::Ready),
            Err(SyncError::Cancelled) => {
                warn!("Fetch cycle cancelled");
                let fallback = if self.store.snapshot().await.is_some() { SyncState::Ready } else { SyncState::Idle };
                self.transition(fallback);
            }
            Err(e) => {
                error!(error = %e, "Fetch cycle failed, keeping previous snapshot");
                if let Some(kind) = e.kind() {
                    self.transition(SyncState::Error(kind));
                }
            }
        }
        result
    }

    async fn fetch(&self, previous: SyncState, filter: NotificationFilter) -> Result<(), SyncError> {
        let needs_token = !matches!(previous, SyncState::Ready) || !self.tokens.has_valid_credential().await;
        if needs_token {
            self.transition(SyncState::FetchingToken);
            self.tokens.get_valid_credential().await?;
        }

        self.transition(SyncState::FetchingNotifications);
        let options = FetchOptions::new(filter, self.refresh_requested.swap(false, Ordering::SeqCst));
        let snapshot = self.fetcher.fetch_notifications(&options).await?;
        self.store.replace(snapshot).await;
        Ok(())
    }

    fn transition(&self, next: SyncState) {
        let current = *self.state.borrow();
        if current == next {
            return;
        }
        if !current.can_transition_to(&next) {
            warn!(from = ?current, to = ?next, "Unexpected sync state transition");
        }
        debug!(from = ?current, to = ?next, "Sync state transition");
        self.state.send_replace(next);
    }

    async fn cancelled(&self) {
        let notified = self.shutdown.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }
}
