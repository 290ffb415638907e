use notify_shared::utilities::config;
use notify_shared::{SyncConfig, SyncController};
use tokio::signal;
use tracing::info;

use crate::errors::WatcherError;
use crate::logging::init_logging;
use crate::view_logger::log_view_changes;

mod errors;
mod logging;
mod view_logger;

#[tokio::main]
async fn main() -> Result<(), WatcherError> {
    // Set up structured logging before anything logs
    init_logging()?;
    config::init();

    info!("🚀 Starting Notification Watcher...");

    let sync_config = SyncConfig::from_env()?;
    let controller = SyncController::new(&sync_config)?;
    info!(
        api = %sync_config.notification_api_url,
        poll_secs = sync_config.poll_interval.as_secs(),
        days = ?sync_config.default_filter.days,
        "Watching notifications"
    );

    let view_handle = tokio::spawn(log_view_changes(controller.clone()));

    let poll_handle = {
        let controller = controller.clone();
        let interval = sync_config.poll_interval;
        tokio::spawn(async move { controller.run(interval).await })
    };

    // Graceful shutdown
    signal::ctrl_c().await?;
    info!("🛑 Received shutdown signal, terminating...");
    controller.shutdown();

    poll_handle.await?;
    view_handle.abort();

    Ok(())
}
