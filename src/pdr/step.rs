//! Step detection from acceleration magnitude.
//!
//! A step is a rising edge of the total acceleration magnitude through a
//! fixed threshold, rate-limited so the rebound of a single footfall is
//! not counted twice.

use super::sample::SensorSample;

/// Configuration for step detection.
#[derive(Debug, Clone)]
pub struct StepDetectorConfig {
    /// Acceleration magnitude a sample must rise above to fire (m/s²).
    pub step_threshold: f32,
    /// Minimum time between fired steps in milliseconds.
    pub min_step_interval_ms: u64,
    /// Distance covered by one step in meters.
    pub step_length_m: f64,
}

impl Default for StepDetectorConfig {
    fn default() -> Self {
        Self {
            step_threshold: 10.5,
            min_step_interval_ms: 350,
            step_length_m: 0.5,
        }
    }
}

/// Rising-edge step detector over accelerometer samples.
#[derive(Debug, Clone)]
pub struct StepDetector {
    config: StepDetectorConfig,
    last_magnitude: f32,
    last_step_ms: Option<u64>,
}

impl StepDetector {
    /// Create a detector with the given configuration.
    pub fn new(config: StepDetectorConfig) -> Self {
        Self {
            config,
            last_magnitude: 0.0,
            last_step_ms: None,
        }
    }

    /// Distance attributed to one detected step.
    pub fn step_length_m(&self) -> f64 {
        self.config.step_length_m
    }

    /// Process one accelerometer sample; returns `true` when it fires a
    /// step.
    ///
    /// A step fires when the magnitude crosses above the threshold while
    /// the previous sample was at or below it, and enough time has passed
    /// since the last fired step. The magnitude history advances on every
    /// sample, so a rate-limited crossing is consumed, not deferred.
    pub fn observe(&mut self, sample: &SensorSample) -> bool {
        let magnitude = sample.magnitude();

        let rising = magnitude > self.config.step_threshold
            && self.last_magnitude <= self.config.step_threshold;
        let rate_ok = self.last_step_ms.map_or(true, |last| {
            sample.timestamp_ms.saturating_sub(last) > self.config.min_step_interval_ms
        });

        let fired = rising && rate_ok;
        if fired {
            self.last_step_ms = Some(sample.timestamp_ms);
        }
        self.last_magnitude = magnitude;

        fired
    }
}
