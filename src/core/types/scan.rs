//! LiDAR scan type.

use serde::{Deserialize, Serialize};

/// Raw LiDAR scan in polar coordinates.
///
/// Represents a single 360° (or partial) scan from a 2D LiDAR sensor.
/// Each measurement is a range value at a uniformly spaced angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Start angle in radians
    pub angle_min: f32,
    /// End angle in radians
    pub angle_max: f32,
    /// Angular resolution (radians between consecutive readings)
    pub angle_increment: f32,
    /// Minimum valid range in meters
    pub range_min: f32,
    /// Maximum valid range in meters
    pub range_max: f32,
    /// Range measurements in meters
    pub ranges: Vec<f32>,
}

impl LaserScan {
    /// Create a new laser scan with the given parameters.
    pub fn new(
        angle_min: f32,
        angle_max: f32,
        angle_increment: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Self {
        Self {
            angle_min,
            angle_max,
            angle_increment,
            range_min,
            range_max,
            ranges,
        }
    }

    /// Number of beams in the scan.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True if the scan has no beams.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Beam angle in the sensor frame for beam index `i`.
    #[inline]
    pub fn beam_angle(&self, i: usize) -> f32 {
        i as f32 * self.angle_increment + self.angle_min
    }

    /// True if `range` lies within the sensor's valid interval.
    #[inline]
    pub fn is_range_valid(&self, range: f32) -> bool {
        self.range_min <= range && range <= self.range_max
    }

    /// Fraction of beams with an in-range reading.
    ///
    /// Returns 0.0 for an empty scan.
    pub fn valid_fraction(&self) -> f32 {
        if self.ranges.is_empty() {
            return 0.0;
        }
        let valid = self
            .ranges
            .iter()
            .filter(|&&r| self.is_range_valid(r))
            .count();
        valid as f32 / self.ranges.len() as f32
    }
}
