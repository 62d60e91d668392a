//! Core state types for position tracking.
//!
//! - [`PositioningMode`] - which strategy currently produces positions
//! - [`TrackingStatus`] - status event emitted on every transition
//! - [`PositionUpdate`] - unified output carrying point, mode, timestamp

use std::time::Instant;

use crate::geo::GeoPoint;

/// Which positioning strategy currently owns the published position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositioningMode {
    /// Continuous satellite/network updates drive the output.
    GpsActive,
    /// Indoors without a usable seed point: satellite updates keep
    /// running for a bounded window hoping for a first fix.
    AcquiringInitialFix,
    /// Dead reckoning drives the output; satellite updates are stopped.
    PdrActive,
    /// Balanced-power network fixes and dead reckoning drive the output
    /// together (periodic policy fallback).
    NetworkPdr,
    /// No tracking session is active.
    #[default]
    Stopped,
}

impl std::fmt::Display for PositioningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GpsActive => write!(f, "GPS"),
            Self::AcquiringInitialFix => write!(f, "Acquiring"),
            Self::PdrActive => write!(f, "PDR"),
            Self::NetworkPdr => write!(f, "Network+PDR"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Status event pushed to subscribers on every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackingStatus {
    /// Latest environment classification.
    pub indoor: bool,
    /// Whether dead reckoning currently owns the output.
    pub pdr_active: bool,
}

/// One published position with the mode that produced it.
#[derive(Debug, Clone, Copy)]
pub struct PositionUpdate {
    /// Estimated position.
    pub point: GeoPoint,
    /// Strategy that produced this position.
    pub mode: PositioningMode,
    /// When the update was published.
    pub timestamp: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_stopped() {
        assert_eq!(PositioningMode::default(), PositioningMode::Stopped);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(PositioningMode::GpsActive.to_string(), "GPS");
        assert_eq!(PositioningMode::AcquiringInitialFix.to_string(), "Acquiring");
        assert_eq!(PositioningMode::PdrActive.to_string(), "PDR");
        assert_eq!(PositioningMode::NetworkPdr.to_string(), "Network+PDR");
        assert_eq!(PositioningMode::Stopped.to_string(), "Stopped");
    }

    #[test]
    fn test_default_status() {
        let status = TrackingStatus::default();
        assert!(!status.indoor);
        assert!(!status.pdr_active);
    }
}
