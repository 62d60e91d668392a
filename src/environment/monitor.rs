//! Environment Monitor - bridges satellite status to indoor flags.
//!
//! Subscribes to the satellite-status collaborator, classifies each
//! snapshot, and forwards the resulting indoor flag to the tracking
//! controller over a channel.
//!
//! # Permission handling
//!
//! If the platform has not granted the sensing permission, the monitor
//! closes its output channel without emitting anything. Consumers must
//! treat channel termination - not a boolean value - as "unknown".

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::sources::SatelliteStatusSource;

use super::classifier::{ClassifierConfig, EnvironmentClassifier};

/// Environment monitor - classifies satellite snapshots as they arrive.
///
/// One monitor is constructed per tracking session and runs until the
/// session is cancelled, the source closes, or the consumer goes away.
pub struct EnvironmentMonitor {
    /// Satellite-status collaborator.
    source: Arc<dyn SatelliteStatusSource>,

    /// Classification rules.
    classifier: EnvironmentClassifier,

    /// Channel carrying indoor flags to the controller.
    indoor_tx: mpsc::Sender<bool>,

    /// Session-scoped cancellation.
    cancel: CancellationToken,
}

impl EnvironmentMonitor {
    /// Create a monitor with default classification thresholds.
    pub fn new(
        source: Arc<dyn SatelliteStatusSource>,
        indoor_tx: mpsc::Sender<bool>,
        cancel: CancellationToken,
    ) -> Self {
        Self::with_config(source, indoor_tx, cancel, ClassifierConfig::default())
    }

    /// Create a monitor with custom classification thresholds.
    pub fn with_config(
        source: Arc<dyn SatelliteStatusSource>,
        indoor_tx: mpsc::Sender<bool>,
        cancel: CancellationToken,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            source,
            classifier: EnvironmentClassifier::with_config(config),
            indoor_tx,
            cancel,
        }
    }

    /// Start the monitor task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the classification loop.
    async fn run(self) {
        if !self.source.permission_granted() {
            // Dropping the sender closes the stream without a value.
            tracing::debug!("sensing permission absent, environment stream closed");
            return;
        }

        tracing::debug!("environment monitor started");
        let mut status_rx = self.source.subscribe();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                result = status_rx.recv() => match result {
                    Ok(snapshot) => {
                        let indoor = self.classifier.classify(&snapshot);
                        tracing::trace!(
                            indoor,
                            satellites = snapshot.total(),
                            "environment classified"
                        );
                        if self.indoor_tx.send(indoor).await.is_err() {
                            // Controller gone, nothing left to feed.
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("satellite status stream closed");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "environment monitor lagged behind satellite status");
                    }
                },
            }
        }

        tracing::debug!("environment monitor stopped");
    }
}
