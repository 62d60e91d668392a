//! Periodic position logging daemon for walk analysis.
//!
//! A background task that logs the latest published position at regular
//! intervals, useful for diagnosing mode flapping and dead-reckoning
//! drift after the fact. Logs are DEBUG level only; callers should check
//! whether DEBUG is enabled before spawning:
//!
//! ```ignore
//! if tracing::enabled!(tracing::Level::DEBUG) {
//!     spawn_position_logger(sink, cancel, DEFAULT_LOG_INTERVAL);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sink::LocationSink;

/// Default logging interval (20 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(20);

/// Spawns a background task that periodically logs the latest position.
///
/// Stops when the cancellation token is triggered.
pub fn spawn_position_logger(
    sink: Arc<LocationSink>,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    log_position(&sink);
                }
                _ = cancellation.cancelled() => {
                    tracing::debug!("position logger stopped");
                    break;
                }
            }
        }
    })
}

/// Logs the latest published position at DEBUG level.
fn log_position(sink: &LocationSink) {
    match sink.latest() {
        Some(update) => {
            tracing::debug!(
                lat = format!("{:.5}", update.point.latitude),
                lon = format!("{:.5}", update.point.longitude),
                mode = %update.mode,
                "position update"
            );
        }
        None => {
            tracing::debug!("position update (no position data)");
        }
    }
}
