use std::io;
use thiserror::Error;
use tokio::task::JoinError;
use tracing_subscriber::util::TryInitError;
use notify_shared::ConfigError;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] JoinError),

    #[error("Cannot init: {0}")]
    InitializationError(String),
}

impl From<TryInitError> for WatcherError {
    fn from(e: TryInitError) -> Self {
        WatcherError::InitializationError(e.to_string())
    }
}
