//! Indoor/outdoor environment detection from satellite signal statistics.
//!
//! A phone that can see many satellites with strong carrier-to-noise
//! ratios is almost certainly outdoors; one that sees few weak satellites
//! (or none) is almost certainly under a roof. This module turns raw
//! satellite-status snapshots into a stream of indoor flags that the
//! tracking controller uses to arbitrate between satellite positioning
//! and dead reckoning.
//!
//! # Components
//!
//! - [`classifier`] - `EnvironmentClassifier` with per-snapshot rules and
//!   `ClassifierConfig` thresholds
//! - [`monitor`] - `EnvironmentMonitor` task bridging the satellite-status
//!   collaborator to the controller
//!
//! There is no temporal smoothing here: every snapshot is judged on its
//! own, and hysteresis (if any) belongs to the consumer.

mod classifier;
mod monitor;

pub use classifier::{ClassifierConfig, EnvironmentClassifier, SatelliteInfo, SatelliteSnapshot};
pub use monitor::EnvironmentMonitor;
