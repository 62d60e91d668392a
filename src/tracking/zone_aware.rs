//! Zone-aware tracking controller (default policy).
//!
//! A reactive state machine over indoor flags, the zone gate, location
//! fixes, and dead-reckoning displacements. All inputs funnel into one
//! actor task, so no two transition evaluations ever interleave.
//!
//! # Decision table
//!
//! - indoor and in zone, seed point known: dead reckoning owns the
//!   output; satellite updates stop.
//! - indoor and in zone, no seed point: satellite updates keep running
//!   for a bounded acquisition window; when it elapses the decision is
//!   re-derived (a fix may have arrived meanwhile).
//! - otherwise: satellite updates own the output; dead reckoning stops.
//!
//! Every re-evaluation derives the full target state from current inputs
//! rather than patching deltas, and every entry is guarded so repeating
//! it is a no-op. The pending acquisition timer carries a generation
//! number: a timer that fires after being superseded or after shutdown is
//! discarded by the actor, not merely ignored by luck.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::geo::GeoPoint;
use crate::pdr::DeadReckoningEngine;
use crate::sources::{Fix, LocationProvider, UpdateProfile};

use super::config::{ControllerConfig, TrackingOutputs};
use super::state::{PositioningMode, PositionUpdate, TrackingStatus};

/// Commands delivered to the actor alongside the input streams.
enum Command {
    /// The zone gate flipped.
    SetZone(bool),
    /// An acquisition window elapsed (with its generation).
    AcquisitionElapsed(u64),
}

/// Handle to a running zone-aware controller.
pub struct ZoneAwareController {
    cmd_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
}

impl ZoneAwareController {
    /// Spawn the controller actor.
    ///
    /// `indoor_rx` carries environment flags (the channel closing means
    /// the environment is unknown, not indoor or outdoor), `pdr_rx`
    /// carries dead-reckoning displacements.
    pub fn spawn(
        provider: Arc<dyn LocationProvider>,
        engine: Arc<DeadReckoningEngine>,
        indoor_rx: mpsc::Receiver<bool>,
        pdr_rx: mpsc::Receiver<GeoPoint>,
        outputs: TrackingOutputs,
        config: ControllerConfig,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let fix_rx = provider.subscribe();

        let actor = Actor {
            provider,
            engine,
            outputs,
            config,
            cmd_tx: cmd_tx.clone(),
            cancel: cancel.clone(),
            mode: PositioningMode::Stopped,
            indoor: false,
            in_zone: false,
            last_known: None,
            acquiring: false,
            acquire_gen: 0,
            gps_streaming: false,
        };
        let handle = tokio::spawn(actor.run(cmd_rx, indoor_rx, pdr_rx, fix_rx));

        (Self { cmd_tx, cancel }, handle)
    }

    /// Update the zone gate.
    pub fn set_zone(&self, in_zone: bool) {
        let _ = self.cmd_tx.send(Command::SetZone(in_zone));
    }

    /// Stop the controller; the actor emits a terminal status on its way
    /// out.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// The controller actor. Owns every piece of mutable tracking state and
/// is the only code that touches it.
struct Actor {
    provider: Arc<dyn LocationProvider>,
    engine: Arc<DeadReckoningEngine>,
    outputs: TrackingOutputs,
    config: ControllerConfig,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,

    mode: PositioningMode,
    indoor: bool,
    in_zone: bool,
    last_known: Option<GeoPoint>,
    /// Whether an acquisition window is pending.
    acquiring: bool,
    /// Generation of the newest acquisition timer; stale firings are
    /// discarded.
    acquire_gen: u64,
    /// Whether continuous satellite updates are currently requested.
    gps_streaming: bool,
}

impl Actor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut indoor_rx: mpsc::Receiver<bool>,
        mut pdr_rx: mpsc::Receiver<GeoPoint>,
        mut fix_rx: broadcast::Receiver<Fix>,
    ) {
        tracing::debug!("zone-aware controller started");
        let cancel = self.cancel.clone();
        let mut fixes_open = true;
        let mut indoor_open = true;
        let mut displacements_open = true;

        // A fresh session starts on satellite updates.
        self.enter_gps();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(command) = cmd_rx.recv() => match command {
                    Command::SetZone(in_zone) => self.set_zone(in_zone),
                    Command::AcquisitionElapsed(gen) => self.acquisition_elapsed(gen),
                },

                indoor = indoor_rx.recv(), if indoor_open => match indoor {
                    Some(flag) => self.set_indoor(flag),
                    None => {
                        // Permission absent or monitor gone; the last flag
                        // stands but no further reclassification happens.
                        tracing::debug!("environment stream terminated");
                        indoor_open = false;
                    }
                },

                result = fix_rx.recv(), if fixes_open => match result {
                    Ok(fix) => self.ingest_fix(fix),
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("fix stream closed");
                        fixes_open = false;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "controller lagged behind location fixes");
                    }
                },

                point = pdr_rx.recv(), if displacements_open => match point {
                    Some(point) => self.ingest_displacement(point),
                    None => displacements_open = false,
                },
            }
        }

        self.shutdown();
    }

    /// Zone gate changed; re-derive the target mode if it actually moved.
    fn set_zone(&mut self, in_zone: bool) {
        if self.in_zone == in_zone {
            return;
        }
        self.in_zone = in_zone;
        tracing::info!(in_zone, "zone status changed");
        self.reevaluate();
    }

    /// Environment flag arrived; status subscribers always hear about it.
    fn set_indoor(&mut self, indoor: bool) {
        self.indoor = indoor;
        tracing::debug!(indoor, "environment update");
        self.emit_status();
        self.reevaluate();
    }

    /// Derive the full target state from current inputs.
    fn reevaluate(&mut self) {
        if self.indoor && self.in_zone {
            if self.last_known.is_some() {
                self.enter_pdr();
            } else if !self.acquiring {
                self.begin_acquisition();
            }
        } else {
            if self.acquiring {
                // Supersede any pending window; its timer becomes a no-op.
                self.acquiring = false;
                self.acquire_gen += 1;
            }
            self.enter_gps();
        }
    }

    /// Hand the output over to dead reckoning. No-op when already there.
    fn enter_pdr(&mut self) {
        if self.mode == PositioningMode::PdrActive {
            return;
        }
        let Some(seed) = self.last_known else {
            tracing::warn!("no known location, dead reckoning not started");
            return;
        };

        tracing::info!("switching to dead reckoning (indoor, in zone)");
        if self.gps_streaming {
            self.provider.stop_updates();
            self.gps_streaming = false;
        }
        self.engine.start(seed);
        self.set_mode(PositioningMode::PdrActive);
    }

    /// Hand the output over to satellite updates. No-op when the
    /// satellite stream is already the active producer.
    fn enter_gps(&mut self) {
        let pdr_active = self.mode == PositioningMode::PdrActive;
        if !pdr_active && self.gps_streaming {
            // Already the active producer; just settle the mode label.
            if self.mode != PositioningMode::GpsActive {
                self.set_mode(PositioningMode::GpsActive);
            }
            return;
        }

        tracing::info!("switching to satellite tracking");
        self.engine.stop();
        if !self.gps_streaming {
            self.provider.start_updates(UpdateProfile::HIGH_ACCURACY);
            self.gps_streaming = true;
        }
        self.set_mode(PositioningMode::GpsActive);
    }

    /// Indoors with no seed point: keep satellite updates running for one
    /// acquisition window, then re-derive.
    fn begin_acquisition(&mut self) {
        tracing::info!(
            window = ?self.config.acquisition_window,
            "indoor without a known location, holding satellite updates for acquisition"
        );
        self.acquiring = true;
        if !self.gps_streaming {
            self.provider.start_updates(UpdateProfile::HIGH_ACCURACY);
            self.gps_streaming = true;
        }

        self.acquire_gen += 1;
        let gen = self.acquire_gen;
        let window = self.config.acquisition_window;
        let cmd_tx = self.cmd_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    let _ = cmd_tx.send(Command::AcquisitionElapsed(gen));
                }
            }
        });

        self.set_mode(PositioningMode::AcquiringInitialFix);
    }

    /// An acquisition timer fired. Stale generations are discarded.
    fn acquisition_elapsed(&mut self, gen: u64) {
        if gen != self.acquire_gen || !self.acquiring {
            return;
        }
        tracing::debug!("acquisition window elapsed, re-deriving mode");
        self.acquiring = false;
        self.reevaluate();
    }

    /// A satellite/network fix arrived: always refreshes the seed point,
    /// but only drives the output while dead reckoning does not own it.
    fn ingest_fix(&mut self, fix: Fix) {
        self.last_known = Some(fix.point);
        if self.mode != PositioningMode::PdrActive {
            self.publish(fix.point);
        }
    }

    /// A dead-reckoning displacement arrived: refreshes the seed point and
    /// drives the output whenever dead reckoning is active.
    fn ingest_displacement(&mut self, point: GeoPoint) {
        self.last_known = Some(point);
        if self.mode == PositioningMode::PdrActive {
            self.publish(point);
        }
    }

    fn publish(&self, point: GeoPoint) {
        let update = PositionUpdate {
            point,
            mode: self.mode,
            timestamp: Instant::now(),
        };
        self.outputs.sink.ingest(update);
        let _ = self.outputs.positions.send(update);
    }

    fn set_mode(&mut self, mode: PositioningMode) {
        if self.mode == mode {
            return;
        }
        tracing::debug!(from = %self.mode, to = %mode, "mode transition");
        self.mode = mode;
        self.emit_status();
    }

    fn emit_status(&self) {
        let _ = self.outputs.status.send(TrackingStatus {
            indoor: self.indoor,
            pdr_active: self.mode == PositioningMode::PdrActive,
        });
    }

    /// Tear the session down and emit a terminal status.
    fn shutdown(&mut self) {
        tracing::debug!("zone-aware controller shutting down");
        self.acquiring = false;
        self.acquire_gen += 1;
        self.engine.stop();
        if self.gps_streaming {
            self.provider.stop_updates();
            self.gps_streaming = false;
        }
        self.mode = PositioningMode::Stopped;
        self.emit_status();
    }
}
