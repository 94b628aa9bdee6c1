//! Local occupancy grid construction from the key-scan window.
//!
//! Rasterizes every retained scan into a square odometry-frame grid:
//! free space is carved along each beam in resolution-sized steps up to
//! just short of the measured range, the endpoint cell is marked occupied,
//! and cells no beam ever touches stay unknown.

use serde::{Deserialize, Serialize};

use crate::core::types::{OccupancyGrid, Pose2D, FREE, OCCUPIED};
use crate::engine::window::KeyScanWindow;

/// Configuration for local map construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocalMapConfig {
    /// Beams shorter than this are ignored, meters.
    ///
    /// Shares the keypoint clearance value: returns closer than the
    /// clearance gate can never support a keypoint anyway.
    pub min_beam_range: f32,
}

impl Default for LocalMapConfig {
    fn default() -> Self {
        Self { min_beam_range: 1.0 }
    }
}

/// Builds odometry-frame local grids from key-scan windows.
#[derive(Debug, Clone)]
pub struct LocalMapBuilder {
    config: LocalMapConfig,
    sensor_offset: Pose2D,
}

impl LocalMapBuilder {
    /// Create a builder with the fixed sensor-to-body offset.
    pub fn new(config: LocalMapConfig, sensor_offset: Pose2D) -> Self {
        Self {
            config,
            sensor_offset,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &LocalMapConfig {
        &self.config
    }

    /// Rasterize the window into a local grid at `resolution` meters/cell.
    ///
    /// The grid is a square spanning 3x the sensor's maximum range,
    /// centered near the oldest retained pose, axis-aligned with the
    /// odometry frame. Returns `None` for an empty window.
    pub fn build(&self, window: &KeyScanWindow, resolution: f32) -> Option<OccupancyGrid> {
        let oldest = window.oldest()?;
        let range_max = oldest.scan.range_max;
        let side = (range_max * 3.0 / resolution) as usize;
        let origin = Pose2D::new(
            oldest.pose.x - range_max * 1.5,
            oldest.pose.y - range_max * 1.5,
            0.0,
        );
        let mut grid = OccupancyGrid::new(side, side, resolution, origin);

        for key_scan in window.iter() {
            let sensor_pose = key_scan.pose.compose(&self.sensor_offset);
            let scan = &key_scan.scan;
            for (i, &range) in scan.ranges.iter().enumerate() {
                if !scan.is_range_valid(range) || range < self.config.min_beam_range {
                    continue;
                }
                let t = scan.beam_angle(i) + sensor_pose.theta;
                let (dx, dy) = (resolution * t.cos(), resolution * t.sin());

                // Carve free space up to just short of the return
                let mut x = sensor_pose.x;
                let mut y = sensor_pose.y;
                let mut r = 0.0f32;
                while r < range - resolution {
                    let (u, v) = grid.xy_to_uv(x, y);
                    if grid.contains(u, v) {
                        grid.set(u as usize, v as usize, FREE);
                    }
                    x += dx;
                    y += dy;
                    r += resolution;
                }

                let hx = range * t.cos() + sensor_pose.x;
                let hy = range * t.sin() + sensor_pose.y;
                let (u, v) = grid.xy_to_uv(hx, hy);
                if grid.contains(u, v) {
                    grid.set(u as usize, v as usize, OCCUPIED);
                }
            }
        }
        Some(grid)
    }
}
