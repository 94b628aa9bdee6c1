//! Raster validation of pose candidates against the global map.
//!
//! Projects a scan from a candidate body pose into the global grid and
//! scores the fraction of valid beams whose endpoint lands on or next to an
//! occupied cell. Cheap compared to full scan matching, and enough to throw
//! out grossly wrong hypotheses before a downstream tracker sees them.

use crate::core::types::{LaserScan, OccupancyGrid, Pose2D, OCCUPIED};

/// Scores candidate poses by scan-to-map agreement.
#[derive(Debug, Clone)]
pub struct MatchingRateEvaluator<'a> {
    grid: &'a OccupancyGrid,
    sensor_offset: Pose2D,
    min_beam_range: f32,
}

impl<'a> MatchingRateEvaluator<'a> {
    /// Create an evaluator over the global grid.
    ///
    /// `sensor_offset` is the fixed sensor-to-body transform;
    /// `min_beam_range` drops beams shorter than the clearance floor
    /// (the same floor used for local map construction).
    pub fn new(grid: &'a OccupancyGrid, sensor_offset: Pose2D, min_beam_range: f32) -> Self {
        Self {
            grid,
            sensor_offset,
            min_beam_range,
        }
    }

    /// Matching rate of `scan` taken from candidate body pose `pose`.
    ///
    /// A beam matches when its hit cell or any of the four axis-neighbors is
    /// occupied. Returns matches / valid beams, or 0.0 when the scan has no
    /// valid beam at all.
    pub fn evaluate(&self, pose: &Pose2D, scan: &LaserScan) -> f32 {
        let sensor_pose = pose.compose(&self.sensor_offset);

        let mut valid_num = 0u32;
        let mut matching_num = 0u32;
        for (i, &range) in scan.ranges.iter().enumerate() {
            if !scan.is_range_valid(range) || range < self.min_beam_range {
                continue;
            }
            valid_num += 1;

            let t = scan.beam_angle(i) + sensor_pose.theta;
            let x = range * t.cos() + sensor_pose.x;
            let y = range * t.sin() + sensor_pose.y;
            let (u, v) = self.grid.xy_to_uv(x, y);
            // Neighbor lookups need the full 3x3 stencil in bounds
            if !self.grid.is_interior(u, v) {
                continue;
            }
            let (u, v) = (u as usize, v as usize);
            if self.grid.get(u, v) == OCCUPIED
                || self.grid.get(u, v - 1) == OCCUPIED
                || self.grid.get(u - 1, v) == OCCUPIED
                || self.grid.get(u + 1, v) == OCCUPIED
                || self.grid.get(u, v + 1) == OCCUPIED
            {
                matching_num += 1;
            }
        }

        if valid_num == 0 {
            return 0.0;
        }
        matching_num as f32 / valid_num as f32
    }
}
