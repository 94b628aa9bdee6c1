//! Orientation-histogram descriptors for distance-field keypoints.
//!
//! For every keypoint a square window of the surrounding distance field is
//! sampled. Gradient angles over the window vote into a 36-bin (10°)
//! orientation histogram whose strict-maximum bin sets the dominant
//! orientation; the same samples are then re-expressed relative to that
//! orientation into a 17-bin absolute-deviation histogram (0°–170°).
//!
//! The descriptor is rotation-sensitive (the dominant orientation rotates
//! with the map) while the relative histogram is rotation-invariant, which
//! is exactly what the matcher and pose recovery need: the relative
//! histogram finds the correspondence, the dominant orientations recover
//! the rotation between frames.

use serde::{Deserialize, Serialize};

use crate::algorithms::distance_field::DistanceField;
use crate::algorithms::keypoints::Keypoint;
use crate::core::math::{wrap_degrees, wrap_degrees_signed};

/// Number of bins in the absolute orientation histogram (10° each).
const ORIENT_BINS: usize = 36;
/// Number of bins in the relative orientation histogram (10° each, 0°–170°).
pub const REL_ORIENT_BINS: usize = 17;

/// Orientation feature describing the distance-field shape around a keypoint.
///
/// One feature per keypoint, associated 1:1 by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdfOrientationFeature {
    /// Dominant gradient orientation in radians.
    pub dominant_orientation: f32,
    /// Mean distance-field value over the window, in meters.
    pub average_sdf: f32,
    /// Counts of gradient samples per 10° band of deviation from the
    /// dominant orientation.
    pub relative_orientation_hist: [u32; REL_ORIENT_BINS],
}

impl SdfOrientationFeature {
    /// L1 distance between two relative orientation histograms.
    pub fn l1_distance(&self, other: &SdfOrientationFeature) -> u32 {
        self.relative_orientation_hist
            .iter()
            .zip(other.relative_orientation_hist.iter())
            .map(|(&a, &b)| a.abs_diff(b))
            .sum()
    }

    /// True if the descriptor window held no samples (border/degenerate
    /// windows). Degenerate features are excluded from matching.
    pub fn is_degenerate(&self) -> bool {
        self.relative_orientation_hist.iter().all(|&c| c == 0)
    }
}

/// Configuration for descriptor computation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureDescriptorConfig {
    /// Half-width of the sampling window in meters (converted to cells by
    /// the source map's resolution).
    /// Typical: 1.0 m.
    pub window_size: f32,
}

impl Default for FeatureDescriptorConfig {
    fn default() -> Self {
        Self { window_size: 1.0 }
    }
}

/// Computes orientation features for detected keypoints.
#[derive(Debug, Clone)]
pub struct FeatureDescriptor {
    config: FeatureDescriptorConfig,
}

impl FeatureDescriptor {
    /// Create a descriptor with the given configuration.
    pub fn new(config: FeatureDescriptorConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FeatureDescriptorConfig {
        &self.config
    }

    /// Compute one feature per keypoint.
    ///
    /// `resolution` is the meters-per-cell of the field's source map and
    /// sets the window half-width in cells. Windows are clipped to the
    /// strict interior of the raster; a window with no interior samples
    /// yields a degenerate feature (zero average, all-zero histogram).
    pub fn describe(
        &self,
        field: &DistanceField,
        keypoints: &[Keypoint],
        resolution: f32,
    ) -> Vec<SdfOrientationFeature> {
        let r = (self.config.window_size / resolution) as i32;
        keypoints
            .iter()
            .map(|kp| self.describe_one(field, kp, r))
            .collect()
    }

    fn describe_one(
        &self,
        field: &DistanceField,
        keypoint: &Keypoint,
        r: i32,
    ) -> SdfOrientationFeature {
        let width = field.width() as i32;
        let height = field.height() as i32;
        let uo = keypoint.u as i32;
        let vo = keypoint.v as i32;

        let mut dist_sum = 0.0f32;
        let mut cell_num = 0u32;
        let mut orient_hist = [0u32; ORIENT_BINS];
        let mut orientations: Vec<f32> = Vec::new();

        for u in (uo - r)..=(uo + r) {
            for v in (vo - r)..=(vo + r) {
                if u < 1 || u >= width - 1 || v < 1 || v >= height - 1 {
                    continue;
                }
                let (uu, vv) = (u as usize, v as usize);

                dist_sum += field.get(uu, vv);
                cell_num += 1;

                let (dx, dy) = field.gradient(uu, vv);
                let t = wrap_degrees(dy.atan2(dx).to_degrees());
                let orient_idx = (t / 10.0) as usize;
                if orient_idx < ORIENT_BINS {
                    orient_hist[orient_idx] += 1;
                    orientations.push(t);
                }
            }
        }

        if cell_num == 0 {
            // Border/degenerate window: no samples, nothing to average.
            return SdfOrientationFeature {
                dominant_orientation: 0.0,
                average_sdf: 0.0,
                relative_orientation_hist: [0; REL_ORIENT_BINS],
            };
        }

        let average_sdf = dist_sum / cell_num as f32;

        // Strict maximum; the first such bin wins ties
        let mut max_count = orient_hist[0];
        let mut dominant_deg = bin_center_deg(0);
        for (j, &count) in orient_hist.iter().enumerate().skip(1) {
            if count > max_count {
                max_count = count;
                dominant_deg = bin_center_deg(j);
            }
        }

        let mut relative_orientation_hist = [0u32; REL_ORIENT_BINS];
        for &t in &orientations {
            let dt = wrap_degrees_signed(dominant_deg - t).abs();
            let rel_idx = (dt / 10.0) as usize;
            if rel_idx < REL_ORIENT_BINS {
                relative_orientation_hist[rel_idx] += 1;
            }
        }

        SdfOrientationFeature {
            dominant_orientation: dominant_deg.to_radians(),
            average_sdf,
            relative_orientation_hist,
        }
    }
}

/// Center of a 10° histogram bin, in degrees.
#[inline]
fn bin_center_deg(bin: usize) -> f32 {
    bin as f32 * 10.0 + 5.0
}
