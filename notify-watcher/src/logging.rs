use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::errors::WatcherError;

/// Installs the global subscriber and bridges `log` records into it, so the
/// JSON event lines from `notify_shared::utilities::logging` are not dropped.
pub fn init_logging() -> Result<(), WatcherError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish()
        .try_init()?;
    Ok(())
}
