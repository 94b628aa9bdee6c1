//! Message-driven relocalization pipeline.
//!
//! [`Relocalizer`] owns the full pipeline state: the frozen global
//! landmark set, the latest odometry pose, the key-scan window, and the
//! per-cycle extraction and sampling machinery. Hosts feed it map, odometry
//! and scan messages; whenever an admitted scan fills the window, one
//! sampling cycle runs and the resulting pose hypotheses come back as a
//! [`CycleOutput`].

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::algorithms::distance_field::DistanceFieldConfig;
use crate::algorithms::keypoints::{
    FeatureDescriptor, FeatureDescriptorConfig, Keypoint, KeypointDetector, KeypointDetectorConfig,
};
use crate::algorithms::matching::{FeatureMatcher, FeatureMatcherConfig};
use crate::algorithms::sampling::{
    MatchingRateEvaluator, PoseHypothesisGenerator, PoseSamplingConfig,
};
use crate::core::types::{LaserScan, OccupancyGrid, Pose2D};
use crate::engine::landmarks::LandmarkSet;
use crate::engine::local_map::{LocalMapBuilder, LocalMapConfig};
use crate::engine::window::{KeyScanWindow, KeyScanWindowConfig};
use crate::engine::EngineError;

/// Scans whose valid-return fraction does not exceed this are dropped.
const MIN_VALID_SCAN_FRACTION: f32 = 0.1;

/// Configuration for the relocalization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocalizerConfig {
    /// Number of key scans retained in the window.
    pub key_scans_num: usize,
    /// Translation since the last key scan that admits a new one, meters.
    pub key_scan_interval_dist: f32,
    /// Rotation since the last key scan that admits a new one, degrees.
    pub key_scan_interval_yaw: f32,
    /// Squared-gradient flatness gate for keypoint candidates.
    pub gradient_square_threshold: f32,
    /// Minimum obstacle clearance for keypoints, meters. Also floors the
    /// beam length used for local mapping and hypothesis validation.
    pub keypoints_min_dist_from_map: f32,
    /// Descriptor sampling window half-width, meters.
    pub sdf_feature_window_size: f32,
    /// Maximum average-distance gap between matchable features, meters.
    pub average_sdf_delta_threshold: f32,
    /// Expand each accepted correspondence with Gaussian perturbations.
    pub add_random_samples: bool,
    /// Rotate every other perturbation by pi to hedge orientation flips.
    pub add_opposite_samples: bool,
    /// Perturbations per correspondence when expansion is on.
    pub random_samples_num: usize,
    /// Positional perturbation stddev, meters.
    pub positional_random_noise: f32,
    /// Angular perturbation stddev, radians.
    pub angular_random_noise: f32,
    /// Minimum matching rate for a candidate to survive validation.
    pub matching_rate_threshold: f32,
    /// Perturbation RNG seed; 0 seeds from entropy.
    pub seed: u64,
    /// Distance field construction options.
    pub distance_field: DistanceFieldConfig,
}

impl Default for RelocalizerConfig {
    fn default() -> Self {
        Self {
            key_scans_num: 5,
            key_scan_interval_dist: 0.5,
            key_scan_interval_yaw: 5.0,
            gradient_square_threshold: 1e-3,
            keypoints_min_dist_from_map: 1.0,
            sdf_feature_window_size: 1.0,
            average_sdf_delta_threshold: 1.0,
            add_random_samples: true,
            add_opposite_samples: true,
            random_samples_num: 10,
            positional_random_noise: 0.5,
            angular_random_noise: 0.3,
            matching_rate_threshold: 0.1,
            seed: 0,
            distance_field: DistanceFieldConfig::default(),
        }
    }
}

impl RelocalizerConfig {
    fn window_config(&self) -> KeyScanWindowConfig {
        KeyScanWindowConfig {
            capacity: self.key_scans_num,
            interval_dist: self.key_scan_interval_dist,
            interval_yaw: self.key_scan_interval_yaw.to_radians(),
        }
    }

    fn detector_config(&self) -> KeypointDetectorConfig {
        KeypointDetectorConfig {
            gradient_square_threshold: self.gradient_square_threshold,
            min_dist_from_map: self.keypoints_min_dist_from_map,
        }
    }

    fn descriptor_config(&self) -> FeatureDescriptorConfig {
        FeatureDescriptorConfig {
            window_size: self.sdf_feature_window_size,
        }
    }

    fn matcher_config(&self) -> FeatureMatcherConfig {
        FeatureMatcherConfig {
            average_sdf_delta_threshold: self.average_sdf_delta_threshold,
            ..Default::default()
        }
    }

    fn sampling_config(&self) -> PoseSamplingConfig {
        PoseSamplingConfig {
            add_random_samples: self.add_random_samples,
            add_opposite_samples: self.add_opposite_samples,
            random_samples_num: self.random_samples_num,
            positional_random_noise: self.positional_random_noise,
            angular_random_noise: self.angular_random_noise,
            matching_rate_threshold: self.matching_rate_threshold,
            seed: self.seed,
        }
    }

    fn local_map_config(&self) -> LocalMapConfig {
        LocalMapConfig {
            min_beam_range: self.keypoints_min_dist_from_map,
        }
    }
}

/// How far the pipeline has come toward processing scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// No global map received yet.
    AwaitingMap,
    /// Map frozen, no odometry received yet.
    AwaitingOdometry,
    /// All inputs present, scans are being processed.
    Ready,
}

/// Result of feeding one scan to [`Relocalizer::on_scan`].
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Map or odometry has not arrived yet; the scan was discarded.
    NotReady,
    /// Too few valid returns; the scan was discarded.
    Dropped,
    /// The scan was considered but no sampling cycle ran, either because
    /// the robot has not moved enough or the window is still filling.
    Buffered,
    /// The scan filled the window and a sampling cycle ran.
    Cycle(CycleOutput),
}

/// Everything one sampling cycle produces.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    /// Validated pose hypotheses, in the map frame.
    pub poses: Vec<Pose2D>,
    /// The local map the cycle was extracted from, for diagnostics.
    pub local_map: OccupancyGrid,
    /// Keypoints detected in the local map, in the odometry frame.
    pub local_keypoints: Vec<Keypoint>,
}

/// The relocalization pipeline.
pub struct Relocalizer {
    config: RelocalizerConfig,
    sensor_offset: Pose2D,
    global_map: Option<OccupancyGrid>,
    global_landmarks: LandmarkSet,
    latest_odom: Option<Pose2D>,
    window: KeyScanWindow,
    detector: KeypointDetector,
    descriptor: FeatureDescriptor,
    matcher: FeatureMatcher,
    local_map_builder: LocalMapBuilder,
    generator: PoseHypothesisGenerator,
}

impl Relocalizer {
    /// Create a pipeline with the fixed sensor-to-body offset.
    pub fn new(config: RelocalizerConfig, sensor_offset: Pose2D) -> Self {
        let detector = KeypointDetector::new(config.detector_config());
        let descriptor = FeatureDescriptor::new(config.descriptor_config());
        let matcher = FeatureMatcher::new(config.matcher_config());
        let local_map_builder = LocalMapBuilder::new(config.local_map_config(), sensor_offset);
        let generator = PoseHypothesisGenerator::new(config.sampling_config(), sensor_offset);
        let window = KeyScanWindow::new(config.window_config());
        Self {
            config,
            sensor_offset,
            global_map: None,
            global_landmarks: LandmarkSet::default(),
            latest_odom: None,
            window,
            detector,
            descriptor,
            matcher,
            local_map_builder,
            generator,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RelocalizerConfig {
        &self.config
    }

    /// The sensor pose in the body frame.
    pub fn sensor_offset(&self) -> Pose2D {
        self.sensor_offset
    }

    /// Current initialization state.
    pub fn state(&self) -> InitState {
        if self.global_map.is_none() {
            InitState::AwaitingMap
        } else if self.latest_odom.is_none() {
            InitState::AwaitingOdometry
        } else {
            InitState::Ready
        }
    }

    /// Report which required input is still missing, if any.
    pub fn check_liveness(&self) -> Result<(), EngineError> {
        match self.state() {
            InitState::AwaitingMap => Err(EngineError::MapUnavailable),
            InitState::AwaitingOdometry => Err(EngineError::OdometryUnavailable),
            InitState::Ready => Ok(()),
        }
    }

    /// Landmarks extracted from the global map, empty before the map arrives.
    pub fn global_landmarks(&self) -> &LandmarkSet {
        &self.global_landmarks
    }

    /// Freeze the global map and extract its landmark set.
    ///
    /// Only the first map is used; later maps are ignored with a warning.
    pub fn on_map(&mut self, grid: OccupancyGrid) {
        if self.global_map.is_some() {
            warn!("Global map already frozen, ignoring new map");
            return;
        }
        self.global_landmarks = LandmarkSet::extract(
            &grid,
            &self.config.distance_field,
            &self.detector,
            &self.descriptor,
        );
        info!(
            "Global map frozen: {}x{} cells, {} landmarks",
            grid.width(),
            grid.height(),
            self.global_landmarks.len()
        );
        self.global_map = Some(grid);
    }

    /// Record the latest odometry pose.
    pub fn on_odometry(&mut self, pose: Pose2D) {
        self.latest_odom = Some(pose);
    }

    /// Feed one scan through the pipeline.
    ///
    /// The scan is stamped with the latest odometry pose and offered to
    /// the key-scan window; when it is admitted and fills the window, a
    /// full sampling cycle runs.
    pub fn on_scan(&mut self, scan: &LaserScan) -> ScanOutcome {
        let (Some(grid), Some(odom)) = (self.global_map.as_ref(), self.latest_odom) else {
            return ScanOutcome::NotReady;
        };

        let valid = scan.valid_fraction();
        if valid <= MIN_VALID_SCAN_FRACTION {
            warn!(
                "Dropping scan: only {:.0}% of {} returns valid",
                valid * 100.0,
                scan.len()
            );
            return ScanOutcome::Dropped;
        }

        if !self.window.try_admit(scan, odom) || !self.window.is_full() {
            return ScanOutcome::Buffered;
        }

        let Some(local_map) = self.local_map_builder.build(&self.window, grid.resolution()) else {
            return ScanOutcome::Buffered;
        };
        let local = LandmarkSet::extract(
            &local_map,
            &self.config.distance_field,
            &self.detector,
            &self.descriptor,
        );

        let correspondences = self.matcher.find_correspondences(
            &local.keypoints,
            &local.features,
            &self.global_landmarks.keypoints,
            &self.global_landmarks.features,
        );

        let evaluator = MatchingRateEvaluator::new(
            grid,
            self.sensor_offset,
            self.config.keypoints_min_dist_from_map,
        );
        // Window full implies newest() exists; clone so the generator can
        // borrow the window-free parts of self mutably.
        let newest = match self.window.newest() {
            Some(key_scan) => key_scan.clone(),
            None => return ScanOutcome::Buffered,
        };
        let poses = self.generator.generate(
            &newest.pose,
            &local.keypoints,
            &local.features,
            &correspondences,
            &self.global_landmarks.keypoints,
            &self.global_landmarks.features,
            grid,
            &evaluator,
            &newest.scan,
        );

        let matched = correspondences.iter().filter(|c| c.is_some()).count();
        info!(
            "Sampling cycle: {} local landmarks, {} matched, {} poses",
            local.len(),
            matched,
            poses.len()
        );

        ScanOutcome::Cycle(CycleOutput {
            poses,
            local_map,
            local_keypoints: local.keypoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FREE, OCCUPIED};

    fn walled_map(n: usize) -> OccupancyGrid {
        let mut grid = OccupancyGrid::new(n, n, 0.1, Pose2D::identity());
        for v in 0..n {
            for u in 0..n {
                let wall = u == 0 || v == 0 || u == n - 1 || v == n - 1;
                grid.set(u, v, if wall { OCCUPIED } else { FREE });
            }
        }
        grid
    }

    fn test_scan() -> LaserScan {
        LaserScan::new(0.0, 0.0, 0.1, 0.1, 10.0, vec![2.0; 8])
    }

    #[test]
    fn test_scans_discarded_before_inputs_arrive() {
        let mut reloc = Relocalizer::new(RelocalizerConfig::default(), Pose2D::identity());
        assert_eq!(reloc.state(), InitState::AwaitingMap);
        assert!(matches!(reloc.on_scan(&test_scan()), ScanOutcome::NotReady));

        reloc.on_map(walled_map(41));
        assert_eq!(reloc.state(), InitState::AwaitingOdometry);
        assert!(matches!(reloc.on_scan(&test_scan()), ScanOutcome::NotReady));

        reloc.on_odometry(Pose2D::identity());
        assert_eq!(reloc.state(), InitState::Ready);
        assert!(matches!(reloc.on_scan(&test_scan()), ScanOutcome::Buffered));
    }

    #[test]
    fn test_liveness_names_the_missing_input() {
        let mut reloc = Relocalizer::new(RelocalizerConfig::default(), Pose2D::identity());
        assert!(matches!(
            reloc.check_liveness(),
            Err(EngineError::MapUnavailable)
        ));
        reloc.on_map(walled_map(41));
        assert!(matches!(
            reloc.check_liveness(),
            Err(EngineError::OdometryUnavailable)
        ));
        reloc.on_odometry(Pose2D::identity());
        assert!(reloc.check_liveness().is_ok());
    }

    #[test]
    fn test_first_map_wins() {
        let mut reloc = Relocalizer::new(RelocalizerConfig::default(), Pose2D::identity());
        reloc.on_map(walled_map(41));
        let count = reloc.global_landmarks().len();
        reloc.on_map(walled_map(81));
        assert_eq!(reloc.global_landmarks().len(), count);
    }

    #[test]
    fn test_sparse_scan_dropped() {
        let mut reloc = Relocalizer::new(RelocalizerConfig::default(), Pose2D::identity());
        reloc.on_map(walled_map(41));
        reloc.on_odometry(Pose2D::identity());
        // 1 valid return out of 20
        let mut ranges = vec![f32::NAN; 20];
        ranges[0] = 2.0;
        let sparse = LaserScan::new(0.0, 0.0, 0.1, 0.1, 10.0, ranges);
        assert!(matches!(reloc.on_scan(&sparse), ScanOutcome::Dropped));
    }

    #[test]
    fn test_stationary_robot_never_cycles() {
        let mut reloc = Relocalizer::new(RelocalizerConfig::default(), Pose2D::identity());
        reloc.on_map(walled_map(41));
        reloc.on_odometry(Pose2D::identity());
        for _ in 0..20 {
            assert!(matches!(reloc.on_scan(&test_scan()), ScanOutcome::Buffered));
        }
    }

    #[test]
    fn test_window_fills_then_cycles() {
        let mut reloc = Relocalizer::new(RelocalizerConfig::default(), Pose2D::identity());
        reloc.on_map(walled_map(61));
        let scan = test_scan();
        // Drive forward in 0.6 m steps; the 5th admitted scan fills the window
        for i in 0..4 {
            reloc.on_odometry(Pose2D::new(i as f32 * 0.6, 0.0, 0.0));
            assert!(matches!(reloc.on_scan(&scan), ScanOutcome::Buffered));
        }
        reloc.on_odometry(Pose2D::new(2.4, 0.0, 0.0));
        assert!(matches!(reloc.on_scan(&scan), ScanOutcome::Cycle(_)));
    }
}
