//! Pose hypothesis generation from keypoint correspondences.
//!
//! Every accepted correspondence pins down a rigid transform between the
//! odometry frame and the map frame: the dominant orientations give the
//! rotation, the keypoint positions give the translation. Keypoint geometry
//! alone cannot disambiguate heading by 180° in symmetric layouts, so the
//! generator can optionally emit reversed-heading alternates, and Gaussian
//! perturbation spreads each recovered pose into a small cloud for the
//! downstream tracker to sort out.

use serde::{Deserialize, Serialize};

use crate::algorithms::keypoints::{Keypoint, SdfOrientationFeature};
use crate::algorithms::matching::Correspondence;
use crate::algorithms::sampling::{MatchingRateEvaluator, NoiseGenerator};
use crate::core::types::{LaserScan, OccupancyGrid, Pose2D, FREE};

/// Configuration for hypothesis generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseSamplingConfig {
    /// Expand each recovered pose into random perturbations.
    pub add_random_samples: bool,

    /// Make every other perturbation hypothesize the reversed heading.
    pub add_opposite_samples: bool,

    /// Perturbations per correspondence when expansion is on.
    /// Typical: 10.
    pub random_samples_num: usize,

    /// Standard deviation of positional noise, in meters.
    /// Typical: 0.5.
    pub positional_random_noise: f32,

    /// Standard deviation of yaw noise, in radians.
    /// Typical: 0.3.
    pub angular_random_noise: f32,

    /// Minimum matching rate for a candidate to survive; <= 0 disables
    /// validation. Typical: 0.1.
    pub matching_rate_threshold: f32,

    /// RNG seed; 0 draws from entropy.
    pub seed: u64,
}

impl Default for PoseSamplingConfig {
    fn default() -> Self {
        Self {
            add_random_samples: true,
            add_opposite_samples: true,
            random_samples_num: 10,
            positional_random_noise: 0.5,
            angular_random_noise: 0.3,
            matching_rate_threshold: 0.1,
            seed: 0,
        }
    }
}

/// Generates validated pose hypotheses from correspondences.
#[derive(Debug)]
pub struct PoseHypothesisGenerator {
    config: PoseSamplingConfig,
    sensor_offset: Pose2D,
    noise: NoiseGenerator,
}

impl PoseHypothesisGenerator {
    /// Create a generator.
    ///
    /// `sensor_offset` is the fixed sensor-to-body transform acquired at
    /// startup.
    pub fn new(config: PoseSamplingConfig, sensor_offset: Pose2D) -> Self {
        let noise = NoiseGenerator::new(config.seed);
        Self {
            config,
            sensor_offset,
            noise,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PoseSamplingConfig {
        &self.config
    }

    /// Generate the hypothesis set for one cycle.
    ///
    /// `current_odom_pose` is the odometry pose at the most recent key-scan
    /// admission; `validation_scan` is the most recent key scan, projected
    /// by `evaluator` to gate candidates. All accepted poses across all
    /// correspondences are returned in one flat set, in the map frame.
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        &mut self,
        current_odom_pose: &Pose2D,
        local_keypoints: &[Keypoint],
        local_features: &[SdfOrientationFeature],
        correspondences: &[Correspondence],
        global_keypoints: &[Keypoint],
        global_features: &[SdfOrientationFeature],
        grid: &OccupancyGrid,
        evaluator: &MatchingRateEvaluator<'_>,
        validation_scan: &LaserScan,
    ) -> Vec<Pose2D> {
        let mut poses = Vec::new();

        for (i, correspondence) in correspondences.iter().enumerate() {
            let Some(target_idx) = *correspondence else {
                continue;
            };

            let local_kp = &local_keypoints[i];
            let local_orient = local_features[i].dominant_orientation;
            let target_kp = &global_keypoints[target_idx];
            let target_orient = global_features[target_idx].dominant_orientation;

            // Rotation between frames from the dominant orientations,
            // translation from the keypoint pair
            let dx = local_kp.x - current_odom_pose.x;
            let dy = local_kp.y - current_odom_pose.y;
            let d_orient = current_odom_pose.theta - local_orient;
            let d_dom_orient = local_orient - target_orient;
            let (sin_d, cos_d) = d_dom_orient.sin_cos();
            let sensor_pose = Pose2D::new(
                dx * cos_d - dy * sin_d + target_kp.x,
                dx * sin_d + dy * cos_d + target_kp.y,
                target_orient + d_orient,
            );

            // The sensor must sit on known free space
            let (u, v) = grid.xy_to_uv(sensor_pose.x, sensor_pose.y);
            if !grid.contains(u, v) || grid.get(u as usize, v as usize) != FREE {
                continue;
            }

            let base_pose = sensor_pose.compose(&self.sensor_offset.inverse());

            if !self.config.add_random_samples {
                if self.passes_validation(&base_pose, evaluator, validation_scan) {
                    poses.push(base_pose);
                }
                continue;
            }

            for j in 0..self.config.random_samples_num {
                let x = base_pose.x + self.noise.gaussian(self.config.positional_random_noise);
                let y = base_pose.y + self.noise.gaussian(self.config.positional_random_noise);
                let mut yaw = base_pose.theta + self.noise.gaussian(self.config.angular_random_noise);
                if self.config.add_opposite_samples && j % 2 == 1 {
                    yaw += std::f32::consts::PI;
                }
                let candidate = Pose2D::new(x, y, yaw);
                if self.passes_validation(&candidate, evaluator, validation_scan) {
                    poses.push(candidate);
                }
            }
        }
        poses
    }

    fn passes_validation(
        &self,
        pose: &Pose2D,
        evaluator: &MatchingRateEvaluator<'_>,
        scan: &LaserScan,
    ) -> bool {
        if self.config.matching_rate_threshold <= 0.0 {
            return true;
        }
        evaluator.evaluate(pose, scan) >= self.config.matching_rate_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::keypoints::{KeypointType, REL_ORIENT_BINS};
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn free_grid() -> OccupancyGrid {
        let size = 100;
        OccupancyGrid::from_raw(
            size,
            size,
            0.5,
            Pose2D::new(-25.0, -25.0, 0.0),
            vec![FREE; size * size],
        )
    }

    fn keypoint(x: f32, y: f32) -> Keypoint {
        Keypoint {
            u: 0,
            v: 0,
            x,
            y,
            kind: KeypointType::Saddle,
        }
    }

    fn feature(orientation: f32) -> SdfOrientationFeature {
        let mut hist = [0u32; REL_ORIENT_BINS];
        hist[0] = 10;
        SdfOrientationFeature {
            dominant_orientation: orientation,
            average_sdf: 1.0,
            relative_orientation_hist: hist,
        }
    }

    fn noiseless_config() -> PoseSamplingConfig {
        PoseSamplingConfig {
            add_random_samples: false,
            add_opposite_samples: false,
            random_samples_num: 0,
            positional_random_noise: 0.0,
            angular_random_noise: 0.0,
            matching_rate_threshold: 0.0,
            seed: 42,
        }
    }

    /// One beam so the evaluator has something well-defined to chew on.
    fn dummy_scan() -> LaserScan {
        LaserScan::new(0.0, 0.0, 0.1, 0.1, 10.0, vec![2.0])
    }

    /// Construct a local/global pair related by rotation `delta` and check
    /// the generator recovers the ground-truth pose exactly.
    fn check_recovery(delta: f32, sensor_offset: Pose2D) {
        let grid = free_grid();
        let odom_pose = Pose2D::new(1.0, -2.0, 0.7);
        let local_kp = keypoint(3.0, 0.5);
        let local_orient = 0.9f32;

        // Ground truth by construction: the map-frame sensor position
        let true_sensor = Pose2D::new(-4.0, 6.0, odom_pose.theta - delta);
        let (sin_d, cos_d) = delta.sin_cos();
        let dx = local_kp.x - odom_pose.x;
        let dy = local_kp.y - odom_pose.y;
        let global_kp = keypoint(
            true_sensor.x - (dx * cos_d - dy * sin_d),
            true_sensor.y - (dx * sin_d + dy * cos_d),
        );
        let global_orient = local_orient - delta;

        let evaluator = MatchingRateEvaluator::new(&grid, sensor_offset, 0.0);
        let mut gen = PoseHypothesisGenerator::new(noiseless_config(), sensor_offset);
        let poses = gen.generate(
            &odom_pose,
            &[local_kp],
            &[feature(local_orient)],
            &[Some(0)],
            &[global_kp],
            &[feature(global_orient)],
            &grid,
            &evaluator,
            &dummy_scan(),
        );

        assert_eq!(poses.len(), 1);
        let expected = true_sensor.compose(&sensor_offset.inverse());
        assert_relative_eq!(poses[0].x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(poses[0].y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(poses[0].theta, expected.theta, epsilon = 1e-5);
    }

    #[test]
    fn test_pose_recovery_exactness_identity_offset() {
        check_recovery(FRAC_PI_2, Pose2D::identity());
        check_recovery(-0.3, Pose2D::identity());
    }

    #[test]
    fn test_pose_recovery_with_sensor_offset() {
        check_recovery(0.8, Pose2D::new(0.2, -0.1, 0.1));
    }

    #[test]
    fn test_unmatched_correspondences_are_skipped() {
        let grid = free_grid();
        let evaluator = MatchingRateEvaluator::new(&grid, Pose2D::identity(), 0.0);
        let mut gen = PoseHypothesisGenerator::new(noiseless_config(), Pose2D::identity());
        let poses = gen.generate(
            &Pose2D::identity(),
            &[keypoint(1.0, 1.0)],
            &[feature(0.0)],
            &[None],
            &[keypoint(2.0, 2.0)],
            &[feature(0.0)],
            &grid,
            &evaluator,
            &dummy_scan(),
        );
        assert!(poses.is_empty());
    }

    #[test]
    fn test_candidate_on_occupied_cell_rejected() {
        let mut grid = free_grid();
        // Occupy everything: every candidate sensor cell is non-free
        for v in 0..grid.height() {
            for u in 0..grid.width() {
                grid.set(u, v, crate::core::types::OCCUPIED);
            }
        }
        let evaluator = MatchingRateEvaluator::new(&grid, Pose2D::identity(), 0.0);
        let mut gen = PoseHypothesisGenerator::new(noiseless_config(), Pose2D::identity());
        let poses = gen.generate(
            &Pose2D::identity(),
            &[keypoint(1.0, 1.0)],
            &[feature(0.0)],
            &[Some(0)],
            &[keypoint(2.0, 2.0)],
            &[feature(0.0)],
            &grid,
            &evaluator,
            &dummy_scan(),
        );
        assert!(poses.is_empty());
    }

    #[test]
    fn test_random_expansion_sample_count() {
        let grid = free_grid();
        let evaluator = MatchingRateEvaluator::new(&grid, Pose2D::identity(), 0.0);
        let config = PoseSamplingConfig {
            add_random_samples: true,
            add_opposite_samples: false,
            random_samples_num: 8,
            positional_random_noise: 0.1,
            angular_random_noise: 0.05,
            matching_rate_threshold: 0.0,
            seed: 42,
        };
        let mut gen = PoseHypothesisGenerator::new(config, Pose2D::identity());
        let poses = gen.generate(
            &Pose2D::identity(),
            &[keypoint(1.0, 1.0)],
            &[feature(0.0)],
            &[Some(0)],
            &[keypoint(2.0, 2.0)],
            &[feature(0.0)],
            &grid,
            &evaluator,
            &dummy_scan(),
        );
        // Validation disabled: every perturbation survives
        assert_eq!(poses.len(), 8);
    }

    #[test]
    fn test_opposite_samples_flip_heading() {
        let grid = free_grid();
        let evaluator = MatchingRateEvaluator::new(&grid, Pose2D::identity(), 0.0);
        let config = PoseSamplingConfig {
            add_random_samples: true,
            add_opposite_samples: true,
            random_samples_num: 2,
            positional_random_noise: 0.0,
            angular_random_noise: 0.0,
            matching_rate_threshold: 0.0,
            seed: 42,
        };
        let mut gen = PoseHypothesisGenerator::new(config, Pose2D::identity());
        let poses = gen.generate(
            &Pose2D::identity(),
            &[keypoint(1.0, 1.0)],
            &[feature(0.0)],
            &[Some(0)],
            &[keypoint(2.0, 2.0)],
            &[feature(0.0)],
            &grid,
            &evaluator,
            &dummy_scan(),
        );
        assert_eq!(poses.len(), 2);
        // With zero noise the pair differs by exactly π
        let diff = crate::core::math::angle_diff(poses[0].theta, poses[1].theta);
        assert_relative_eq!(diff.abs(), PI, epsilon = 1e-6);
    }

    #[test]
    fn test_seeded_expansion_is_reproducible() {
        let grid = free_grid();
        let evaluator = MatchingRateEvaluator::new(&grid, Pose2D::identity(), 0.0);
        let config = PoseSamplingConfig {
            add_random_samples: true,
            add_opposite_samples: false,
            random_samples_num: 5,
            positional_random_noise: 0.3,
            angular_random_noise: 0.1,
            matching_rate_threshold: 0.0,
            seed: 99,
        };
        let run = |config: PoseSamplingConfig| {
            let mut gen = PoseHypothesisGenerator::new(config, Pose2D::identity());
            gen.generate(
                &Pose2D::identity(),
                &[keypoint(1.0, 1.0)],
                &[feature(0.0)],
                &[Some(0)],
                &[keypoint(2.0, 2.0)],
                &[feature(0.0)],
                &grid,
                &evaluator,
                &dummy_scan(),
            )
        };
        assert_eq!(run(config), run(config));
    }
}
