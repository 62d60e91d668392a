//! Periodic tracking controller (alternate policy).
//!
//! Instead of reacting to environment changes, this policy re-decides on
//! a fixed cadence: every tick it requests one fresh high-priority fix
//! with a bounded wait. A fix with good accuracy keeps satellite tracking
//! active; anything else falls back to balanced-power network fixes plus
//! dead reckoning, seeded from the best point available. There is no zone
//! gate, and the decision runs every tick whether or not anything
//! changed.
//!
//! Request failures are not errors here: they simply mean "fix
//! unavailable" and select the fallback branch.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::geo::GeoPoint;
use crate::pdr::DeadReckoningEngine;
use crate::sources::{Fix, LocationProvider, UpdateProfile};

use super::config::{ControllerConfig, TrackingOutputs};
use super::state::{PositioningMode, PositionUpdate, TrackingStatus};

/// Handle to a running periodic controller.
pub struct PeriodicController {
    cancel: CancellationToken,
}

impl PeriodicController {
    /// Spawn the controller actor.
    pub fn spawn(
        provider: Arc<dyn LocationProvider>,
        engine: Arc<DeadReckoningEngine>,
        pdr_rx: mpsc::Receiver<GeoPoint>,
        outputs: TrackingOutputs,
        config: ControllerConfig,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let cancel = CancellationToken::new();
        let fix_rx = provider.subscribe();

        let actor = Actor {
            provider,
            engine,
            outputs,
            config,
            cancel: cancel.clone(),
            mode: PositioningMode::Stopped,
            last_known: None,
            profile: None,
        };
        let handle = tokio::spawn(actor.run(pdr_rx, fix_rx));

        (Self { cancel }, handle)
    }

    /// Stop the controller; the actor emits a terminal status on its way
    /// out.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// The periodic controller actor.
struct Actor {
    provider: Arc<dyn LocationProvider>,
    engine: Arc<DeadReckoningEngine>,
    outputs: TrackingOutputs,
    config: ControllerConfig,
    cancel: CancellationToken,

    mode: PositioningMode,
    last_known: Option<GeoPoint>,
    /// Continuous-update profile currently requested, if any.
    profile: Option<UpdateProfile>,
}

impl Actor {
    async fn run(
        mut self,
        mut pdr_rx: mpsc::Receiver<GeoPoint>,
        mut fix_rx: broadcast::Receiver<Fix>,
    ) {
        tracing::debug!("periodic controller started");
        let cancel = self.cancel.clone();
        let mut fixes_open = true;
        let mut displacements_open = true;

        let mut ticker = tokio::time::interval(self.config.recheck_interval);
        // The first tick fires immediately so a new session decides right
        // away; missed ticks must not pile up behind a slow fix request.
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => self.recheck().await,

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

    /// One cadence tick: probe fix quality and re-derive the mode.
    async fn recheck(&mut self) {
        let fresh = self.request_fresh_fix().await;

        match fresh {
            Some(fix) if fix.accuracy_m < self.config.good_fix_accuracy_m => {
                tracing::info!(accuracy_m = fix.accuracy_m, "fresh fix is tight, satellite tracking");
                self.engine.stop();
                self.set_profile(UpdateProfile::HIGH_ACCURACY);
                self.last_known = Some(fix.point);
                self.set_mode(PositioningMode::GpsActive);
                self.publish(fix.point);
            }
            fresh => {
                // Best available point: the fresh fix even if loose, else
                // whatever we knew before.
                let fallback = fresh.map(|fix| fix.point).or(self.last_known);
                tracing::info!(
                    fresh = fresh.is_some(),
                    seeded = fallback.is_some(),
                    "no tight fix, falling back to network and dead reckoning"
                );
                self.set_profile(UpdateProfile::BALANCED_POWER);
                self.set_mode(PositioningMode::NetworkPdr);
                match fallback {
                    Some(point) => {
                        self.last_known = Some(point);
                        // No-op while a run is already active.
                        self.engine.start(point);
                        self.publish(point);
                    }
                    None => {
                        tracing::warn!("no fallback point available, dead reckoning not started");
                    }
                }
            }
        }
    }

    /// Request one fresh fix with a bounded, cancellable wait. Every
    /// failure shape maps to `None`.
    async fn request_fresh_fix(&self) -> Option<Fix> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.provider.request_current_fix(reply_tx);

        tokio::select! {
            _ = self.cancel.cancelled() => None,

            outcome = tokio::time::timeout(self.config.fix_request_timeout, reply_rx) => {
                match outcome {
                    Ok(Ok(Ok(fix))) => Some(fix),
                    Ok(Ok(Err(err))) => {
                        tracing::warn!(error = %err, "fresh fix unavailable");
                        None
                    }
                    Ok(Err(_)) => {
                        tracing::warn!("location provider dropped the fix request");
                        None
                    }
                    Err(_) => {
                        tracing::debug!("fresh fix request timed out");
                        None
                    }
                }
            }
        }
    }

    /// A continuous fix arrived between ticks.
    fn ingest_fix(&mut self, fix: Fix) {
        self.last_known = Some(fix.point);
        self.publish(fix.point);
    }

    /// A dead-reckoning displacement arrived.
    fn ingest_displacement(&mut self, point: GeoPoint) {
        self.last_known = Some(point);
        if self.mode == PositioningMode::NetworkPdr {
            self.publish(point);
        }
    }

    /// Request continuous updates at `profile`, unless already there.
    fn set_profile(&mut self, profile: UpdateProfile) {
        if self.profile == Some(profile) {
            return;
        }
        self.provider.start_updates(profile);
        self.profile = Some(profile);
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
            indoor: false,
            pdr_active: matches!(
                self.mode,
                PositioningMode::PdrActive | PositioningMode::NetworkPdr
            ),
        });
    }

    /// Tear the session down and emit a terminal status.
    fn shutdown(&mut self) {
        tracing::debug!("periodic controller shutting down");
        self.engine.stop();
        if self.profile.take().is_some() {
            self.provider.stop_updates();
        }
        self.mode = PositioningMode::Stopped;
        self.emit_status();
    }
}
