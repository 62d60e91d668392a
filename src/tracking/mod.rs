//! Positioning mode arbitration.
//!
//! The tracking controller is the decision core of the crate: it watches
//! the environment classification, the zone gate, incoming fixes, and
//! dead-reckoning displacements, and decides which strategy owns the
//! published position at any moment.
//!
//! # Policies
//!
//! Two interchangeable policies sit behind the same output surface:
//!
//! - [`ZoneAwareController`] (default) reacts to indoor/zone changes and
//!   only activates dead reckoning inside a designated zone.
//! - [`PeriodicController`] re-decides on a fixed cadence from the
//!   accuracy of a freshly requested fix, with no zone gate.
//!
//! Both are single-task actors: every input stream funnels into one
//! `select!` loop, so transition evaluations never interleave and all
//! mutable tracking state stays private to the actor.
//!
//! # Components
//!
//! - [`state`] - `PositioningMode`, `TrackingStatus`, `PositionUpdate`
//! - [`config`] - `ControllerConfig`, `TrackingPolicy`, `TrackingOutputs`
//! - [`zone_aware`] / [`periodic`] - the two controller actors
//! - [`logger`] - DEBUG-level periodic position dump

mod config;
mod logger;
mod periodic;
mod state;
mod zone_aware;

pub use config::{ControllerConfig, TrackingOutputs, TrackingPolicy};
pub use logger::{spawn_position_logger, DEFAULT_LOG_INTERVAL};
pub use periodic::PeriodicController;
pub use state::{PositioningMode, PositionUpdate, TrackingStatus};
pub use zone_aware::ZoneAwareController;
