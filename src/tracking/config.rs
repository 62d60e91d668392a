//! Controller configuration shared by both policies.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::sink::LocationSink;

use super::state::{PositionUpdate, TrackingStatus};

/// Which arbitration policy a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingPolicy {
    /// React to indoor/zone changes; dead reckoning activates only inside
    /// a designated zone.
    #[default]
    ZoneAware,
    /// Re-decide on a fixed cadence from a fresh fix's accuracy, with no
    /// zone gate.
    Periodic,
}

/// Timing and threshold knobs for the tracking controllers.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How long to keep satellite updates running while indoors without a
    /// usable seed point, before re-deriving the mode.
    pub acquisition_window: Duration,

    /// Cadence of the periodic policy's re-evaluation.
    pub recheck_interval: Duration,

    /// Bounded wait for the periodic policy's single fresh fix.
    pub fix_request_timeout: Duration,

    /// A fresh fix with accuracy strictly below this keeps satellite
    /// tracking active (periodic policy).
    pub good_fix_accuracy_m: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            acquisition_window: Duration::from_secs(60),
            recheck_interval: Duration::from_secs(60),
            fix_request_timeout: Duration::from_secs(10),
            good_fix_accuracy_m: 5.0,
        }
    }
}

/// Output side shared by both controller policies.
///
/// The controller is the only writer: published points land in the sink
/// and on the position channel, transitions land on the status channel.
#[derive(Clone)]
pub struct TrackingOutputs {
    /// Latest-position sink.
    pub sink: Arc<LocationSink>,
    /// Broadcast channel for published positions.
    pub positions: broadcast::Sender<PositionUpdate>,
    /// Broadcast channel for status events.
    pub status: broadcast::Sender<TrackingStatus>,
}

impl TrackingOutputs {
    /// Create an output bundle with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (positions, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self {
            sink: LocationSink::new(),
            positions,
            status,
        }
    }
}
