use std::fmt;
use thiserror::Error;

/// Failures obtaining or using the bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Identity endpoint unreachable: {0}")]
    IdentityUnreachable(String),

    #[error("Identity endpoint returned status {0}")]
    IdentityRejected(u16),

    #[error("Identity endpoint returned an empty token")]
    EmptyToken,

    #[error("Credential rejected by the notification service after refresh")]
    CredentialRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Notification endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Notification endpoint returned status {0}")]
    Status(u16),

    #[error("Malformed notification payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Action credential unavailable: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid action url: {0}")]
    InvalidUrl(String),

    #[error("Action endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Action endpoint returned status {0}")]
    Status(u16),
}

/// Error surfaced by a fetch cycle.
///
/// Clone so that every caller joined on a coalesced cycle receives the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Fetch cycle cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    Auth,
    Fetch,
}

impl SyncError {
    /// The kind exposed to the presentation layer; `None` for a cancelled cycle.
    pub fn kind(&self) -> Option<SyncErrorKind> {
        match self {
            SyncError::Auth(_) => Some(SyncErrorKind::Auth),
            SyncError::Fetch(_) => Some(SyncErrorKind::Fetch),
            SyncError::Cancelled => None,
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErrorKind::Auth => write!(f, "auth"),
            SyncErrorKind::Fetch => write!(f, "fetch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("Invalid url for {key}: {reason}")]
    InvalidUrl { key: String, reason: String },

    #[error("Cannot build http client: {0}")]
    Client(String),
}
