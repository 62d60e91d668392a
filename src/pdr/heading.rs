//! Heading estimation from gravity and geomagnetic vectors.
//!
//! The azimuth is derived by building a rotation matrix from the latest
//! accelerometer (gravity) and magnetometer (geomagnetic) readings, then
//! heavily smoothed with a complementary filter so individual noisy
//! samples barely move the estimate.

use super::sample::{SensorKind, SensorSample};

/// Small tri-axis vector helper for the rotation computation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Vec3 {
    fn from_sample(sample: &SensorSample) -> Self {
        Self {
            x: sample.x,
            y: sample.y,
            z: sample.z,
        }
    }

    fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    fn scaled(&self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
}

/// Minimum magnitude of the horizontal field axis before the rotation is
/// considered degenerate (free fall, or field parallel to gravity).
const MIN_HORIZONTAL_NORM: f32 = 0.1;

/// Raw azimuth in radians from a gravity/geomagnetic pair.
///
/// Builds the device-to-world rotation basis: `h` points east
/// (field × gravity), `m` points north (gravity × east), and the azimuth
/// is the angle of the device y-axis within that horizontal plane.
/// Returns `None` when the basis is degenerate.
fn raw_azimuth(gravity: Vec3, geomagnetic: Vec3) -> Option<f32> {
    let h = geomagnetic.cross(&gravity);
    let h_norm = h.magnitude();
    if h_norm < MIN_HORIZONTAL_NORM {
        return None;
    }

    let h = h.scaled(1.0 / h_norm);
    let a = gravity.scaled(1.0 / gravity.magnitude());
    let m = a.cross(&h);

    Some(h.y.atan2(m.y))
}

/// Configuration for the heading filter.
#[derive(Debug, Clone)]
pub struct HeadingConfig {
    /// Complementary filter weight on the previous estimate (0-1).
    ///
    /// The default keeps 97% of the old azimuth per sample, so the heading
    /// turns slowly even under magnetic noise.
    pub smoothing_alpha: f32,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.97,
        }
    }
}

/// Smoothed azimuth estimator.
///
/// Feed it every sensor sample, whichever sensor fired; once both a
/// gravity and a geomagnetic vector have been seen, each subsequent
/// sample refines the azimuth.
#[derive(Debug, Clone)]
pub struct HeadingFilter {
    config: HeadingConfig,
    gravity: Option<Vec3>,
    geomagnetic: Option<Vec3>,
    azimuth_rad: f32,
}

impl HeadingFilter {
    /// Create a filter with the given configuration.
    pub fn new(config: HeadingConfig) -> Self {
        Self {
            config,
            gravity: None,
            geomagnetic: None,
            azimuth_rad: 0.0,
        }
    }

    /// Current smoothed azimuth in radians (clockwise from north).
    pub fn azimuth_rad(&self) -> f32 {
        self.azimuth_rad
    }

    /// Record a sensor sample and refine the azimuth if possible.
    pub fn observe(&mut self, sample: &SensorSample) {
        match sample.kind {
            SensorKind::Accelerometer => self.gravity = Some(Vec3::from_sample(sample)),
            SensorKind::Magnetometer => self.geomagnetic = Some(Vec3::from_sample(sample)),
        }

        if let (Some(gravity), Some(geomagnetic)) = (self.gravity, self.geomagnetic) {
            if let Some(raw) = raw_azimuth(gravity, geomagnetic) {
                let alpha = self.config.smoothing_alpha;
                self.azimuth_rad = alpha * self.azimuth_rad + (1.0 - alpha) * raw;
            }
        }
    }
}
