//! Occupancy grid map with ternary cell values.
//!
//! Cells hold the raw signed values of the map schema:
//! `-1` unknown, `0` free, `100` occupied. Storage is row-major with the
//! origin at grid cell (0, 0); the origin pose (including yaw) places cell
//! (0, 0) in the world frame.

use serde::{Deserialize, Serialize};

use super::pose::Pose2D;

/// Raw cell value for an occupied cell.
pub const OCCUPIED: i8 = 100;
/// Raw cell value for a free cell.
pub const FREE: i8 = 0;
/// Raw cell value for an unobserved cell.
pub const UNKNOWN: i8 = -1;

/// Interpreted state of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    /// Never observed.
    Unknown,
    /// Observed free space.
    Free,
    /// Observed obstacle.
    Occupied,
}

impl CellState {
    /// Interpret a raw signed cell value.
    #[inline]
    pub fn from_raw(value: i8) -> CellState {
        match value {
            OCCUPIED => CellState::Occupied,
            FREE => CellState::Free,
            _ => CellState::Unknown,
        }
    }
}

/// 2D occupancy grid map.
///
/// Same schema whether it is the global map consumed once at startup or the
/// per-cycle local map rasterized from the key-scan window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyGrid {
    /// Grid width in cells.
    width: usize,
    /// Grid height in cells.
    height: usize,
    /// Meters per cell.
    resolution: f32,
    /// World pose of grid cell (0, 0).
    origin: Pose2D,
    /// Raw cell values, row-major: index = v * width + u.
    cells: Vec<i8>,
}

impl OccupancyGrid {
    /// Create a grid filled with unknown cells.
    pub fn new(width: usize, height: usize, resolution: f32, origin: Pose2D) -> Self {
        Self {
            width,
            height,
            resolution,
            origin,
            cells: vec![UNKNOWN; width * height],
        }
    }

    /// Create a grid from raw cell data.
    ///
    /// `cells` must hold exactly `width * height` values.
    pub fn from_raw(
        width: usize,
        height: usize,
        resolution: f32,
        origin: Pose2D,
        cells: Vec<i8>,
    ) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            resolution,
            origin,
            cells,
        }
    }

    /// Grid width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Meters per cell.
    #[inline]
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// World pose of grid cell (0, 0).
    #[inline]
    pub fn origin(&self) -> Pose2D {
        self.origin
    }

    /// Raw cell values, row-major.
    #[inline]
    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// Row-major index of a cell.
    #[inline]
    pub fn index(&self, u: usize, v: usize) -> usize {
        v * self.width + u
    }

    /// Half-open containment check: 0 ≤ u < width, 0 ≤ v < height.
    #[inline]
    pub fn contains(&self, u: i32, v: i32) -> bool {
        u >= 0 && (u as usize) < self.width && v >= 0 && (v as usize) < self.height
    }

    /// Strict-interior check: 1 ≤ u < width-1, 1 ≤ v < height-1.
    ///
    /// A full 3x3 stencil around (u, v) stays in bounds iff this holds.
    #[inline]
    pub fn is_interior(&self, u: i32, v: i32) -> bool {
        u >= 1 && (u as usize) < self.width - 1 && v >= 1 && (v as usize) < self.height - 1
    }

    /// Raw value of a cell. Caller guarantees bounds.
    #[inline]
    pub fn get(&self, u: usize, v: usize) -> i8 {
        self.cells[v * self.width + u]
    }

    /// Interpreted state of a cell. Caller guarantees bounds.
    #[inline]
    pub fn state(&self, u: usize, v: usize) -> CellState {
        CellState::from_raw(self.get(u, v))
    }

    /// Set the raw value of a cell. Caller guarantees bounds.
    #[inline]
    pub fn set(&mut self, u: usize, v: usize, value: i8) {
        self.cells[v * self.width + u] = value;
    }

    /// Convert world coordinates to grid coordinates.
    ///
    /// Undoes the origin translation and yaw, then floors to the containing
    /// cell. The result may lie outside the grid; check with [`contains`].
    ///
    /// [`contains`]: OccupancyGrid::contains
    #[inline]
    pub fn xy_to_uv(&self, x: f32, y: f32) -> (i32, i32) {
        let dx = x - self.origin.x;
        let dy = y - self.origin.y;
        let (sin_t, cos_t) = (-self.origin.theta).sin_cos();
        let xx = dx * cos_t - dy * sin_t;
        let yy = dx * sin_t + dy * cos_t;
        (
            (xx / self.resolution).floor() as i32,
            (yy / self.resolution).floor() as i32,
        )
    }

    /// Convert grid coordinates to world coordinates (cell corner).
    #[inline]
    pub fn uv_to_xy(&self, u: i32, v: i32) -> (f32, f32) {
        let xx = u as f32 * self.resolution;
        let yy = v as f32 * self.resolution;
        let (sin_t, cos_t) = self.origin.theta.sin_cos();
        (
            xx * cos_t - yy * sin_t + self.origin.x,
            xx * sin_t + yy * cos_t + self.origin.y,
        )
    }

    /// Fraction of cells that are occupied. Diagnostic helper.
    pub fn occupied_fraction(&self) -> f32 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let occupied = self.cells.iter().filter(|&&c| c == OCCUPIED).count();
        occupied as f32 / self.cells.len() as f32
    }
}
