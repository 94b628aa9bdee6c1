//! Descriptor matching between local and global landmark sets.
//!
//! For every local keypoint the matcher runs one linear pass over the global
//! set, gated by keypoint type and average-SDF similarity, tracking the best
//! and second-best relative-histogram L1 distances. A best/second-best ratio
//! test rejects ambiguous correspondences: in repetitive indoor layouts many
//! distinct places look alike, and a near-tie between two global candidates
//! is worth less than no match at all.

use serde::{Deserialize, Serialize};

use crate::algorithms::keypoints::{Keypoint, SdfOrientationFeature};

/// Index of the matched global keypoint, or `None` when unmatched.
pub type Correspondence = Option<usize>;

/// Configuration for feature matching.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureMatcherConfig {
    /// Maximum |average_sdf difference| between a candidate pair, in meters.
    /// Typical: 1.0 m.
    pub average_sdf_delta_threshold: f32,

    /// Ratio test factor: the best distance scaled by this must still beat
    /// the second-best for the match to be accepted.
    /// Typical: 1.5.
    pub ratio: f32,
}

impl Default for FeatureMatcherConfig {
    fn default() -> Self {
        Self {
            average_sdf_delta_threshold: 1.0,
            ratio: 1.5,
        }
    }
}

/// Nearest-neighbor descriptor matcher with ambiguity rejection.
#[derive(Debug, Clone)]
pub struct FeatureMatcher {
    config: FeatureMatcherConfig,
}

impl FeatureMatcher {
    /// Create a matcher with the given configuration.
    pub fn new(config: FeatureMatcherConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FeatureMatcherConfig {
        &self.config
    }

    /// Find the corresponding global keypoint for every local keypoint.
    ///
    /// Returns one [`Correspondence`] per local keypoint, in order.
    /// Keypoints and features associate 1:1 by index on both sides.
    pub fn find_correspondences(
        &self,
        local_keypoints: &[Keypoint],
        local_features: &[SdfOrientationFeature],
        global_keypoints: &[Keypoint],
        global_features: &[SdfOrientationFeature],
    ) -> Vec<Correspondence> {
        debug_assert_eq!(local_keypoints.len(), local_features.len());
        debug_assert_eq!(global_keypoints.len(), global_features.len());

        local_keypoints
            .iter()
            .zip(local_features.iter())
            .map(|(kp, feature)| {
                self.match_one(kp, feature, global_keypoints, global_features)
            })
            .collect()
    }

    fn match_one(
        &self,
        local_keypoint: &Keypoint,
        local_feature: &SdfOrientationFeature,
        global_keypoints: &[Keypoint],
        global_features: &[SdfOrientationFeature],
    ) -> Correspondence {
        if local_feature.is_degenerate() {
            return None;
        }

        // Best and second-best L1 distances; strict less-than replacement
        // keeps the earliest-seen index on ties.
        let mut best: Option<(u32, usize)> = None;
        let mut second: Option<u32> = None;

        for (j, (global_kp, global_feature)) in global_keypoints
            .iter()
            .zip(global_features.iter())
            .enumerate()
        {
            if global_kp.kind != local_keypoint.kind || global_feature.is_degenerate() {
                continue;
            }
            let d_average = local_feature.average_sdf - global_feature.average_sdf;
            if d_average.abs() > self.config.average_sdf_delta_threshold {
                continue;
            }

            let sum = local_feature.l1_distance(global_feature);
            match best {
                None => best = Some((sum, j)),
                Some((best_sum, _)) if sum < best_sum => {
                    second = Some(best_sum);
                    best = Some((sum, j));
                }
                Some(_) => match second {
                    Some(second_sum) if sum >= second_sum => {}
                    _ => second = Some(sum),
                },
            }
        }

        match (best, second) {
            (Some((best_sum, idx)), Some(second_sum)) => {
                if (best_sum as f32) * self.config.ratio < second_sum as f32 {
                    Some(idx)
                } else {
                    None
                }
            }
            // A single candidate is unambiguous by definition
            (Some((_, idx)), None) => Some(idx),
            (None, _) => None,
        }
    }
}
