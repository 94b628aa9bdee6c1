//! Critical-point detection on distance fields.
//!
//! Scans every interior cell of a distance field for near-zero gradient,
//! then classifies the critical point by the sign pattern of the discrete
//! Hessian determinant:
//!
//! ```text
//! det = dxx·dyy − dxy²
//! det > 0, dxx < 0  →  local maximum (ridge peak, e.g. room center)
//! det > 0, dxx > 0  →  local minimum (valley floor)
//! det < 0           →  saddle (e.g. doorway between rooms)
//! det = 0           →  degenerate, not a keypoint
//! ```

use serde::{Deserialize, Serialize};

use crate::algorithms::distance_field::DistanceField;
use crate::core::types::{OccupancyGrid, FREE};

/// Classification of a detected keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeypointType {
    /// Not a usable keypoint.
    Invalid,
    /// Local minimum of the distance field.
    LocalMinimum,
    /// Saddle point of the distance field.
    Saddle,
    /// Local maximum of the distance field.
    LocalMaximum,
}

/// A geometrically distinctive location in a map.
///
/// Grid coordinates index the source raster; world coordinates are derived
/// from them through the source map's origin pose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keypoint {
    /// Grid column.
    pub u: usize,
    /// Grid row.
    pub v: usize,
    /// World X in meters.
    pub x: f32,
    /// World Y in meters.
    pub y: f32,
    /// Critical-point classification.
    pub kind: KeypointType,
}

/// Configuration for keypoint detection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeypointDetectorConfig {
    /// Flatness gate: a cell qualifies as a critical point only if both
    /// squared first derivatives fall below this.
    /// Typical: 1e-3.
    pub gradient_square_threshold: f32,

    /// Minimum metric clearance from the nearest obstacle.
    /// Keypoints hugging walls are unstable under viewpoint change.
    /// Typical: 1.0 m.
    pub min_dist_from_map: f32,
}

impl Default for KeypointDetectorConfig {
    fn default() -> Self {
        Self {
            gradient_square_threshold: 1e-3,
            min_dist_from_map: 1.0,
        }
    }
}

/// Detector for distance-field critical points.
#[derive(Debug, Clone)]
pub struct KeypointDetector {
    config: KeypointDetectorConfig,
}

impl KeypointDetector {
    /// Create a detector with the given configuration.
    pub fn new(config: KeypointDetectorConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &KeypointDetectorConfig {
        &self.config
    }

    /// Detect keypoints in `field`, using `grid` for the free-space gate and
    /// the grid-to-world transform.
    ///
    /// Only strictly interior cells are considered; cells that are not free
    /// in the source grid or closer than the clearance gate are skipped.
    pub fn detect(&self, grid: &OccupancyGrid, field: &DistanceField) -> Vec<Keypoint> {
        let mut keypoints = Vec::new();
        let width = grid.width();
        let height = grid.height();
        if width < 3 || height < 3 {
            return keypoints;
        }

        for u in 1..width - 1 {
            for v in 1..height - 1 {
                if grid.get(u, v) != FREE || field.get(u, v) < self.config.min_dist_from_map {
                    continue;
                }

                let (dx, dy) = field.gradient(u, v);
                if dx * dx >= self.config.gradient_square_threshold
                    || dy * dy >= self.config.gradient_square_threshold
                {
                    continue;
                }

                let d = |uu: usize, vv: usize| field.get(uu, vv);
                let dxx = d(u - 1, v) - 2.0 * d(u, v) + d(u + 1, v);
                let dyy = d(u, v - 1) - 2.0 * d(u, v) + d(u, v + 1);
                let dxy = d(u - 1, v - 1) - d(u, v - 1) - d(u - 1, v) + 2.0 * d(u, v)
                    - d(u + 1, v)
                    - d(u, v + 1)
                    + d(u + 1, v + 1);
                let det = dxx * dyy - dxy * dxy;

                let kind = if det > 0.0 && dxx < 0.0 {
                    KeypointType::LocalMaximum
                } else if det > 0.0 && dxx > 0.0 {
                    KeypointType::LocalMinimum
                } else if det < 0.0 {
                    KeypointType::Saddle
                } else {
                    continue;
                };

                let (x, y) = grid.uv_to_xy(u as i32, v as i32);
                keypoints.push(Keypoint { u, v, x, y, kind });
            }
        }
        keypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Pose2D;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const SIZE: usize = 21;

    fn free_grid() -> OccupancyGrid {
        OccupancyGrid::from_raw(
            SIZE,
            SIZE,
            1.0,
            Pose2D::identity(),
            vec![FREE; SIZE * SIZE],
        )
    }

    fn field_from_fn(f: impl Fn(f32, f32) -> f32) -> DistanceField {
        let mut values = vec![0.0f32; SIZE * SIZE];
        for v in 0..SIZE {
            for u in 0..SIZE {
                values[v * SIZE + u] = f(u as f32 - 10.0, v as f32 - 10.0);
            }
        }
        DistanceField::from_raw(SIZE, SIZE, values)
    }

    fn detector() -> KeypointDetector {
        KeypointDetector::new(KeypointDetectorConfig {
            gradient_square_threshold: 1e-3,
            min_dist_from_map: 0.0,
        })
    }

    fn kind_at(keypoints: &[Keypoint], u: usize, v: usize) -> Option<KeypointType> {
        keypoints.iter().find(|k| k.u == u && k.v == v).map(|k| k.kind)
    }

    #[test]
    fn test_radial_bump_yields_local_maximum() {
        // Distance increasing toward the center
        let field = field_from_fn(|du, dv| 500.0 - (du * du + dv * dv));
        let keypoints = detector().detect(&free_grid(), &field);
        assert_eq!(kind_at(&keypoints, 10, 10), Some(KeypointType::LocalMaximum));
    }

    #[test]
    fn test_radial_pit_yields_local_minimum() {
        let field = field_from_fn(|du, dv| du * du + dv * dv + 1.0);
        let keypoints = detector().detect(&free_grid(), &field);
        assert_eq!(kind_at(&keypoints, 10, 10), Some(KeypointType::LocalMinimum));
    }

    #[test]
    fn test_saddle_field_yields_saddle() {
        let field = field_from_fn(|du, dv| du * du - dv * dv + 500.0);
        let keypoints = detector().detect(&free_grid(), &field);
        assert_eq!(kind_at(&keypoints, 10, 10), Some(KeypointType::Saddle));
    }

    #[test]
    fn test_occupied_and_unknown_cells_skipped() {
        let field = field_from_fn(|du, dv| 500.0 - (du * du + dv * dv));
        let mut grid = free_grid();
        grid.set(10, 10, crate::core::types::OCCUPIED);
        let keypoints = detector().detect(&grid, &field);
        assert_eq!(kind_at(&keypoints, 10, 10), None);

        grid.set(10, 10, crate::core::types::UNKNOWN);
        let keypoints = detector().detect(&grid, &field);
        assert_eq!(kind_at(&keypoints, 10, 10), None);
    }

    #[test]
    fn test_clearance_gate_skips_low_cells() {
        let field = field_from_fn(|du, dv| du * du + dv * dv + 1.0);
        let det = KeypointDetector::new(KeypointDetectorConfig {
            gradient_square_threshold: 1e-3,
            min_dist_from_map: 2.0, // center value is 1.0
        });
        let keypoints = det.detect(&free_grid(), &field);
        assert_eq!(kind_at(&keypoints, 10, 10), None);
    }

    #[test]
    fn test_world_coordinates_follow_origin_yaw() {
        let field = field_from_fn(|du, dv| 500.0 - (du * du + dv * dv));
        let grid = OccupancyGrid::from_raw(
            SIZE,
            SIZE,
            1.0,
            Pose2D::new(2.0, 3.0, FRAC_PI_2),
            vec![FREE; SIZE * SIZE],
        );
        let keypoints = detector().detect(&grid, &field);
        let kp = keypoints.iter().find(|k| k.u == 10 && k.v == 10).unwrap();
        // (10, 10) rotated by 90° then translated by (2, 3)
        assert_relative_eq!(kp.x, -8.0, epsilon = 1e-4);
        assert_relative_eq!(kp.y, 13.0, epsilon = 1e-4);
    }

    #[test]
    fn test_border_cells_never_inspected() {
        let field = field_from_fn(|du, dv| 500.0 - (du * du + dv * dv));
        let keypoints = detector().detect(&free_grid(), &field);
        assert!(keypoints
            .iter()
            .all(|k| k.u >= 1 && k.u < SIZE - 1 && k.v >= 1 && k.v < SIZE - 1));
    }
}
