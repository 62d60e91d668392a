//! Tracking session facade.
//!
//! Wires the environment monitor, dead-reckoning engine, and tracking
//! controller together over the collaborator interfaces, and exposes one
//! handle for consumers: start/stop the session, toggle the zone gate,
//! subscribe to outputs, read the sink.
//!
//! # Usage
//!
//! ```ignore
//! use geostride::session::{SessionConfig, TrackingSession};
//!
//! let session = TrackingSession::new(config, satellites, provider, sensors);
//! session.start();
//! session.set_zone(true);
//!
//! let mut positions = session.subscribe();
//! while let Ok(update) = positions.recv().await {
//!     println!("{} ({})", update.point, update.mode);
//! }
//!
//! session.stop();
//! ```
//!
//! Each `start()` builds a fresh monitor, engine, and controller, so a
//! restarted session behaves exactly like a new one: no filter state,
//! counters, or timers survive a stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::environment::{ClassifierConfig, EnvironmentMonitor};
use crate::pdr::{DeadReckoningEngine, PdrConfig};
use crate::sink::LocationSink;
use crate::sources::{LocationProvider, SatelliteStatusSource, SensorSource};
use crate::tracking::{
    spawn_position_logger, ControllerConfig, PeriodicController, PositionUpdate, TrackingOutputs,
    TrackingPolicy, TrackingStatus, ZoneAwareController, DEFAULT_LOG_INTERVAL,
};

/// Capacity of the output broadcast channels.
const OUTPUT_CHANNEL_CAPACITY: usize = 16;

/// Capacity of the internal indoor-flag channel.
const INDOOR_CHANNEL_CAPACITY: usize = 16;

/// Capacity of the internal displacement channel.
const DISPLACEMENT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for a tracking session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Arbitration policy (zone-aware by default).
    pub policy: TrackingPolicy,
    /// Environment classification thresholds.
    pub classifier: ClassifierConfig,
    /// Dead-reckoning parameters.
    pub pdr: PdrConfig,
    /// Controller timing and thresholds.
    pub controller: ControllerConfig,
}

/// Handle to whichever controller policy is running.
enum ControllerHandle {
    ZoneAware(ZoneAwareController),
    Periodic(PeriodicController),
}

/// A running session's moving parts.
struct ActiveTracking {
    controller: ControllerHandle,
    /// Cancels the session-scoped helper tasks (monitor, logger).
    cancel: CancellationToken,
}

/// Tracking session - the crate's main entry point.
pub struct TrackingSession {
    satellites: Arc<dyn SatelliteStatusSource>,
    provider: Arc<dyn LocationProvider>,
    sensors: Arc<dyn SensorSource>,
    config: SessionConfig,
    outputs: TrackingOutputs,
    /// Zone gate as last told to us; replayed into a freshly started
    /// controller so the external state survives restarts.
    in_zone: AtomicBool,
    active: Mutex<Option<ActiveTracking>>,
}

impl TrackingSession {
    /// Create a session over the given collaborators.
    pub fn new(
        config: SessionConfig,
        satellites: Arc<dyn SatelliteStatusSource>,
        provider: Arc<dyn LocationProvider>,
        sensors: Arc<dyn SensorSource>,
    ) -> Self {
        Self {
            satellites,
            provider,
            sensors,
            config,
            outputs: TrackingOutputs::new(OUTPUT_CHANNEL_CAPACITY),
            in_zone: AtomicBool::new(false),
            active: Mutex::new(None),
        }
    }

    /// Start tracking. No-op while already running.
    ///
    /// Builds a fresh environment monitor, dead-reckoning engine, and
    /// controller, so every session starts from clean state.
    pub fn start(&self) {
        let mut active = self.active.lock().unwrap();
        if active.is_some() {
            tracing::debug!("tracking session already running");
            return;
        }
        tracing::info!(policy = ?self.config.policy, "tracking session starting");

        let cancel = CancellationToken::new();
        let (displacement_tx, displacement_rx) = mpsc::channel(DISPLACEMENT_CHANNEL_CAPACITY);
        let engine = Arc::new(DeadReckoningEngine::with_config(
            self.sensors.clone(),
            displacement_tx,
            self.config.pdr.clone(),
        ));

        let controller = match self.config.policy {
            TrackingPolicy::ZoneAware => {
                let (indoor_tx, indoor_rx) = mpsc::channel(INDOOR_CHANNEL_CAPACITY);
                EnvironmentMonitor::with_config(
                    self.satellites.clone(),
                    indoor_tx,
                    cancel.child_token(),
                    self.config.classifier.clone(),
                )
                .start();

                let (controller, _task) = ZoneAwareController::spawn(
                    self.provider.clone(),
                    engine,
                    indoor_rx,
                    displacement_rx,
                    self.outputs.clone(),
                    self.config.controller.clone(),
                );
                if self.in_zone.load(Ordering::Acquire) {
                    controller.set_zone(true);
                }
                ControllerHandle::ZoneAware(controller)
            }
            TrackingPolicy::Periodic => {
                let (controller, _task) = PeriodicController::spawn(
                    self.provider.clone(),
                    engine,
                    displacement_rx,
                    self.outputs.clone(),
                    self.config.controller.clone(),
                );
                ControllerHandle::Periodic(controller)
            }
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            spawn_position_logger(
                self.outputs.sink.clone(),
                cancel.child_token(),
                DEFAULT_LOG_INTERVAL,
            );
        }

        *active = Some(ActiveTracking { controller, cancel });
    }

    /// Stop tracking. Safe to call when not running.
    pub fn stop(&self) {
        let mut active = self.active.lock().unwrap();
        if let Some(run) = active.take() {
            tracing::info!("tracking session stopping");
            match &run.controller {
                ControllerHandle::ZoneAware(controller) => controller.stop(),
                ControllerHandle::Periodic(controller) => controller.stop(),
            }
            run.cancel.cancel();
        }
    }

    /// Whether a session is currently running.
    pub fn is_running(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    /// Update the zone gate (e.g. on geofence entry/exit).
    ///
    /// Remembered across restarts; the periodic policy ignores it.
    pub fn set_zone(&self, in_zone: bool) {
        self.in_zone.store(in_zone, Ordering::Release);
        let active = self.active.lock().unwrap();
        if let Some(run) = active.as_ref() {
            match &run.controller {
                ControllerHandle::ZoneAware(controller) => controller.set_zone(in_zone),
                ControllerHandle::Periodic(_) => {
                    tracing::debug!("zone gate not used by the periodic policy");
                }
            }
        }
    }

    /// Subscribe to published positions.
    pub fn subscribe(&self) -> broadcast::Receiver<PositionUpdate> {
        self.outputs.positions.subscribe()
    }

    /// Subscribe to status events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<TrackingStatus> {
        self.outputs.status.subscribe()
    }

    /// The shared latest-position sink.
    pub fn sink(&self) -> Arc<LocationSink> {
        self.outputs.sink.clone()
    }
}
