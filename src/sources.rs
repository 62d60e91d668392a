//! Collaborator interfaces feeding the tracking engine.
//!
//! The engine itself owns no platform bindings: satellite status, location
//! fixes, and raw sensor samples are all pushed in by external
//! collaborators behind these traits. Tests substitute mock
//! implementations; production code wraps the platform's location and
//! sensor stacks.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

use crate::environment::SatelliteSnapshot;
use crate::geo::GeoPoint;
use crate::pdr::SensorSample;

/// Satellite-status collaborator (pull of permission state, push of
/// snapshots).
pub trait SatelliteStatusSource: Send + Sync {
    /// Whether the platform granted the sensing permission. Without it,
    /// the source supplies nothing and derived streams close silently.
    fn permission_granted(&self) -> bool;

    /// Subscribe to satellite-status snapshots at provider cadence.
    fn subscribe(&self) -> broadcast::Receiver<SatelliteSnapshot>;
}

/// Update cadence requested from the location collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateProfile {
    /// Desired interval between fixes.
    pub interval: Duration,
    /// Minimum displacement before a new fix is delivered (meters).
    pub min_displacement_m: f32,
}

impl UpdateProfile {
    /// Tight cadence for active satellite tracking.
    pub const HIGH_ACCURACY: Self = Self {
        interval: Duration::from_secs(2),
        min_displacement_m: 2.0,
    };

    /// Relaxed cadence while dead reckoning carries the position.
    pub const BALANCED_POWER: Self = Self {
        interval: Duration::from_secs(5),
        min_displacement_m: 5.0,
    };
}

/// One location estimate from the provider, with its accuracy radius.
#[derive(Debug, Clone, Copy)]
pub struct Fix {
    /// Estimated position.
    pub point: GeoPoint,
    /// Accuracy radius in meters (lower is better).
    pub accuracy_m: f32,
    /// When the provider produced this fix.
    pub timestamp: Instant,
}

impl Fix {
    /// Create a fix stamped now.
    pub fn new(point: GeoPoint, accuracy_m: f32) -> Self {
        Self {
            point,
            accuracy_m,
            timestamp: Instant::now(),
        }
    }
}

/// Errors from a single-fix request.
#[derive(Debug, Error)]
pub enum FixError {
    /// The platform denied the location permission.
    #[error("location permission denied")]
    PermissionDenied,

    /// The provider could not produce a fix.
    #[error("no fix available: {0}")]
    Unavailable(String),

    /// The provider did not answer within the allowed wait.
    #[error("fix request timed out")]
    Timeout,
}

/// Location-fix collaborator.
///
/// Continuous updates are controlled with `start_updates`/`stop_updates`;
/// fixes flow through the broadcast subscription regardless of which
/// profile is active.
pub trait LocationProvider: Send + Sync {
    /// Start (or re-profile) continuous location updates.
    fn start_updates(&self, profile: UpdateProfile);

    /// Stop continuous location updates. Safe to call when not running.
    fn stop_updates(&self);

    /// Subscribe to incoming fixes.
    fn subscribe(&self) -> broadcast::Receiver<Fix>;

    /// Request one fresh high-priority fix.
    ///
    /// The reply is delivered through `reply`; dropping the sender without
    /// answering is treated as "fix unavailable" by callers.
    fn request_current_fix(&self, reply: oneshot::Sender<Result<Fix, FixError>>);
}

/// Raw-sensor collaborator pushing accelerometer and magnetometer samples
/// at a fast, fixed cadence.
pub trait SensorSource: Send + Sync {
    /// Subscribe to the sample stream.
    fn subscribe(&self) -> broadcast::Receiver<SensorSample>;
}
