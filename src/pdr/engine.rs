//! Dead Reckoning Engine - step-triggered relative positioning.
//!
//! The engine consumes the raw-sensor collaborator's sample stream and
//! walks an anchor point forward: every detected step displaces the
//! anchor by one step length along the current smoothed azimuth, and the
//! new anchor is emitted to the controller. Orientation-only updates
//! never emit a position.
//!
//! # Lifecycle
//!
//! `start(seed)` resets all filter state and anchors displacement at the
//! seed point; calling it while already running is a no-op. `stop()`
//! drops the sensor subscription and is safe to call at any time. Each
//! start gets a fresh internal state, so a restarted engine behaves like
//! a brand-new one.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::geo::GeoPoint;
use crate::sources::SensorSource;

use super::heading::{HeadingConfig, HeadingFilter};
use super::sample::{SensorKind, SensorSample};
use super::step::{StepDetector, StepDetectorConfig};

/// Configuration for the dead-reckoning engine.
#[derive(Debug, Clone, Default)]
pub struct PdrConfig {
    /// Heading filter parameters.
    pub heading: HeadingConfig,
    /// Step detection parameters.
    pub step: StepDetectorConfig,
}

/// Synchronous dead-reckoning state: heading, step detection, anchor.
#[derive(Debug, Clone)]
pub(crate) struct PdrState {
    heading: HeadingFilter,
    steps: StepDetector,
    anchor: GeoPoint,
}

impl PdrState {
    pub(crate) fn new(config: &PdrConfig, seed: GeoPoint) -> Self {
        Self {
            heading: HeadingFilter::new(config.heading.clone()),
            steps: StepDetector::new(config.step.clone()),
            anchor: seed,
        }
    }

    /// Process one sensor sample; returns the new anchor when a step
    /// fired.
    ///
    /// The displacement uses the azimuth as of the previous sample; the
    /// current sample's orientation contribution lands afterwards.
    pub(crate) fn handle_sample(&mut self, sample: &SensorSample) -> Option<GeoPoint> {
        let mut emitted = None;

        if sample.kind == SensorKind::Accelerometer && self.steps.observe(sample) {
            self.anchor = self
                .anchor
                .displaced(self.steps.step_length_m(), self.heading.azimuth_rad() as f64);
            emitted = Some(self.anchor);
        }

        self.heading.observe(sample);
        emitted
    }
}

/// A running engine instance.
struct ActiveRun {
    cancel: CancellationToken,
}

/// Dead-reckoning engine handle.
///
/// Shared between the session and the controller; start/stop are
/// idempotent so the controller can re-derive its target state freely.
pub struct DeadReckoningEngine {
    /// Raw-sensor collaborator.
    sensors: Arc<dyn SensorSource>,

    /// Channel carrying displaced anchors to the controller.
    displacement_tx: mpsc::Sender<GeoPoint>,

    /// Configuration.
    config: PdrConfig,

    /// Currently running instance, if any.
    active: Mutex<Option<ActiveRun>>,
}

impl DeadReckoningEngine {
    /// Create an engine with default configuration.
    pub fn new(sensors: Arc<dyn SensorSource>, displacement_tx: mpsc::Sender<GeoPoint>) -> Self {
        Self::with_config(sensors, displacement_tx, PdrConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(
        sensors: Arc<dyn SensorSource>,
        displacement_tx: mpsc::Sender<GeoPoint>,
        config: PdrConfig,
    ) -> Self {
        Self {
            sensors,
            displacement_tx,
            config,
            active: Mutex::new(None),
        }
    }

    /// Whether a dead-reckoning run is currently active.
    pub fn is_running(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    /// Start dead reckoning from `seed`. No-op while already running.
    pub fn start(&self, seed: GeoPoint) {
        let mut active = self.active.lock().unwrap();
        if active.is_some() {
            tracing::debug!("dead reckoning already running");
            return;
        }

        tracing::info!(
            latitude = seed.latitude,
            longitude = seed.longitude,
            "dead reckoning started"
        );

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut sample_rx = self.sensors.subscribe();
        let mut state = PdrState::new(&self.config, seed);
        let displacement_tx = self.displacement_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    result = sample_rx.recv() => match result {
                        Ok(sample) => {
                            if let Some(point) = state.handle_sample(&sample) {
                                tracing::trace!(%point, "step displacement");
                                if displacement_tx.send(point).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "dead reckoning lagged behind sensor samples");
                        }
                    },
                }
            }
            tracing::debug!("dead reckoning task stopped");
        });

        *active = Some(ActiveRun { cancel });
    }

    /// Stop dead reckoning. Safe to call when not running.
    pub fn stop(&self) {
        let mut active = self.active.lock().unwrap();
        if let Some(run) = active.take() {
            tracing::info!("dead reckoning stopped");
            run.cancel.cancel();
        }
    }
}
