//! Satellite-signal environment classification rules.
//!
//! Classifies a single satellite-status snapshot as indoor or outdoor from
//! raw carrier-to-noise statistics. Each snapshot is judged independently;
//! any temporal smoothing is the caller's responsibility.

/// Per-satellite signal record from a status snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteInfo {
    /// Whether this satellite contributed to the current fix.
    pub used_in_fix: bool,
    /// Carrier-to-noise density in dB-Hz.
    pub snr_db_hz: f32,
}

impl SatelliteInfo {
    /// Create a satellite record.
    pub const fn new(used_in_fix: bool, snr_db_hz: f32) -> Self {
        Self {
            used_in_fix,
            snr_db_hz,
        }
    }
}

/// One satellite-status update from the platform's location stack.
#[derive(Debug, Clone, Default)]
pub struct SatelliteSnapshot {
    /// Per-satellite records, in provider order.
    pub satellites: Vec<SatelliteInfo>,
}

impl SatelliteSnapshot {
    /// Create a snapshot from satellite records.
    pub fn new(satellites: Vec<SatelliteInfo>) -> Self {
        Self { satellites }
    }

    /// Total number of visible satellites.
    pub fn total(&self) -> usize {
        self.satellites.len()
    }
}

/// Thresholds for the indoor/outdoor decision.
///
/// The defaults are tuned for phone-grade GNSS receivers: a weak average
/// signal over few used satellites reads as indoor, a strong average over
/// many used satellites reads as outdoor.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Average SNR at or below this reads as indoor (dB-Hz).
    pub indoor_snr_threshold: f32,
    /// Average SNR at or above this reads as outdoor (dB-Hz).
    pub outdoor_snr_threshold: f32,
    /// Maximum used-in-fix satellites for the indoor rule.
    pub max_indoor_satellites: usize,
    /// Minimum used-in-fix satellites for the outdoor rule.
    pub min_outdoor_satellites: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            indoor_snr_threshold: 18.0,
            outdoor_snr_threshold: 28.0,
            max_indoor_satellites: 3,
            min_outdoor_satellites: 7,
        }
    }
}

/// Stateless indoor/outdoor classifier over satellite snapshots.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentClassifier {
    config: ClassifierConfig,
}

impl EnvironmentClassifier {
    /// Create a classifier with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with custom thresholds.
    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify a snapshot: `true` means indoor.
    ///
    /// Decision order:
    /// 1. No visible satellites: indoor (no sky view).
    /// 2. No satellites used in a fix: indoor (no fix).
    /// 3. Weak average SNR over few used satellites: indoor.
    /// 4. Strong average SNR over many used satellites: outdoor.
    /// 5. Neither rule fires: fall back to the indoor SNR threshold alone,
    ///    biasing ambiguous conditions toward indoor detection.
    pub fn classify(&self, snapshot: &SatelliteSnapshot) -> bool {
        if snapshot.satellites.is_empty() {
            return true;
        }

        let used: Vec<&SatelliteInfo> = snapshot
            .satellites
            .iter()
            .filter(|s| s.used_in_fix)
            .collect();
        if used.is_empty() {
            return true;
        }

        let avg_snr = used.iter().map(|s| s.snr_db_hz).sum::<f32>() / used.len() as f32;

        let is_indoor = avg_snr <= self.config.indoor_snr_threshold
            && used.len() <= self.config.max_indoor_satellites;
        let is_outdoor = avg_snr >= self.config.outdoor_snr_threshold
            && used.len() >= self.config.min_outdoor_satellites;

        if is_indoor {
            true
        } else if is_outdoor {
            false
        } else {
            avg_snr <= self.config.indoor_snr_threshold
        }
    }
}
