//! Latest-position sink for downstream consumers.
//!
//! Holds the most recently published position and mode behind a lock.
//! The sink contains no decision logic: it is mutated only through the
//! single `ingest` entry point fed by the tracking controller, and read
//! by anyone holding the shared handle.

use std::sync::{Arc, RwLock};

use crate::geo::GeoPoint;
use crate::tracking::{PositioningMode, PositionUpdate};

/// Most recently published position, shared across consumers.
#[derive(Debug, Default)]
pub struct LocationSink {
    inner: RwLock<Option<PositionUpdate>>,
}

impl LocationSink {
    /// Create an empty shared sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a published update. Called only by the controller.
    pub(crate) fn ingest(&self, update: PositionUpdate) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = Some(update);
        }
    }

    /// The latest published update, if any.
    pub fn latest(&self) -> Option<PositionUpdate> {
        self.inner.read().ok().and_then(|inner| *inner)
    }

    /// The latest published point, if any.
    pub fn position(&self) -> Option<GeoPoint> {
        self.latest().map(|update| update.point)
    }

    /// The mode that produced the latest published point, if any.
    pub fn mode(&self) -> Option<PositioningMode> {
        self.latest().map(|update| update.mode)
    }
}
