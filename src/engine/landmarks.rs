//! Landmark extraction chain.
//!
//! Runs distance field construction, keypoint detection and descriptor
//! computation over an occupancy grid and bundles the result. The same
//! chain serves the frozen global map and every per-cycle local map.

use log::info;

use crate::algorithms::distance_field::{DistanceField, DistanceFieldConfig};
use crate::algorithms::keypoints::{
    FeatureDescriptor, Keypoint, KeypointDetector, SdfOrientationFeature,
};
use crate::core::types::OccupancyGrid;

/// Keypoints and their descriptors, associated 1:1 by index.
#[derive(Debug, Clone, Default)]
pub struct LandmarkSet {
    /// Detected keypoints, in the grid's world frame.
    pub keypoints: Vec<Keypoint>,
    /// One descriptor per keypoint.
    pub features: Vec<SdfOrientationFeature>,
}

impl LandmarkSet {
    /// Run the full extraction chain over `grid`.
    pub fn extract(
        grid: &OccupancyGrid,
        field_config: &DistanceFieldConfig,
        detector: &KeypointDetector,
        descriptor: &FeatureDescriptor,
    ) -> Self {
        let field = DistanceField::from_grid(grid, field_config);
        let keypoints = detector.detect(grid, &field);
        let features = descriptor.describe(&field, &keypoints, grid.resolution());
        info!(
            "Extracted {} landmarks from {}x{} grid",
            keypoints.len(),
            grid.width(),
            grid.height()
        );
        Self {
            keypoints,
            features,
        }
    }

    /// Number of landmarks.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}
