//! GeoStride - hybrid satellite / dead-reckoning positioning
//!
//! This library maintains a continuous position estimate for a walking
//! user by fusing satellite/network location with inertial dead
//! reckoning, automatically choosing the best-available strategy as
//! signal conditions change.
//!
//! # Architecture
//!
//! Raw streams flow leaf-first through four components:
//!
//! - [`environment`] classifies satellite-signal snapshots as
//!   indoor/outdoor.
//! - [`pdr`] turns accelerometer/magnetometer samples into step-triggered
//!   displacements anchored at a seed point.
//! - [`tracking`] arbitrates between satellite positioning and dead
//!   reckoning with a single-task state machine (zone-aware by default,
//!   with a periodic alternative).
//! - [`sink`] holds the latest published position for pull-style
//!   consumers.
//!
//! Platform bindings stay outside the crate: satellite status, location
//! fixes, and sensor samples are pushed in through the [`sources`]
//! traits, and results come back as broadcast subscriptions.
//!
//! # High-Level API
//!
//! Most users only need the [`session`] facade:
//!
//! ```ignore
//! use geostride::session::{SessionConfig, TrackingSession};
//!
//! let session = TrackingSession::new(
//!     SessionConfig::default(),
//!     satellites,
//!     location_provider,
//!     sensors,
//! );
//! session.start();
//! session.set_zone(true);
//!
//! let mut positions = session.subscribe();
//! while let Ok(update) = positions.recv().await {
//!     println!("{} via {}", update.point, update.mode);
//! }
//! ```

pub mod environment;
pub mod geo;
pub mod pdr;
pub mod session;
pub mod sink;
pub mod sources;
pub mod tracking;

/// Version of the GeoStride library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
