//! Euclidean distance field over an occupancy grid.
//!
//! Binarizes the grid (occupied vs. everything else), runs an exact two-pass
//! Euclidean distance transform, scales to metric units, and optionally
//! smooths the result with a small separable Gaussian to suppress
//! discretization noise before derivative-based feature detection.
//!
//! # Algorithm
//!
//! The transform is the Felzenszwalb & Huttenlocher lower-envelope-of-
//! parabolas method: a 1D squared-distance transform applied first along
//! columns, then along rows, followed by a square root. Exact distances
//! matter here because the keypoint detector takes second derivatives of
//! this field; the coarse propagation used by likelihood-field sensor models
//! is too lumpy for that.

use serde::{Deserialize, Serialize};

use crate::core::types::{OccupancyGrid, OCCUPIED};

/// Effectively infinite squared distance for transform seeding.
const INF: f32 = 1e20;

/// Configuration for distance field construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DistanceFieldConfig {
    /// Apply a 5-tap separable Gaussian blur after the transform.
    pub blur: bool,

    /// Standard deviation of the blur kernel, in cells.
    /// Typical: 5.0 (wide kernel, close to a box filter over the 5 taps).
    pub blur_sigma: f32,
}

impl Default for DistanceFieldConfig {
    fn default() -> Self {
        Self {
            blur: true,
            blur_sigma: 5.0,
        }
    }
}

/// Metric distance-to-nearest-obstacle raster.
///
/// Same extents as the source grid; every value is >= 0 meters.
#[derive(Debug, Clone)]
pub struct DistanceField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl DistanceField {
    /// Build the distance field of an occupancy grid.
    ///
    /// Cells with raw value 100 are obstacles; free and unknown cells both
    /// count as non-obstacle, so a map with no occupied cell yields a field
    /// of large finite distances rather than a failure.
    pub fn from_grid(grid: &OccupancyGrid, config: &DistanceFieldConfig) -> Self {
        let width = grid.width();
        let height = grid.height();

        // Squared cell distances, seeded with 0 at obstacles
        let mut values: Vec<f32> = grid
            .cells()
            .iter()
            .map(|&c| if c == OCCUPIED { 0.0 } else { INF })
            .collect();

        squared_edt(&mut values, width, height);

        let resolution = grid.resolution();
        for v in values.iter_mut() {
            *v = v.sqrt() * resolution;
        }

        let mut field = Self {
            width,
            height,
            values,
        };
        if config.blur {
            field.gaussian_blur(config.blur_sigma);
        }
        field
    }

    /// Build a field directly from raw values (synthetic fields in tests,
    /// precomputed rasters from a map server).
    pub fn from_raw(width: usize, height: usize, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            values,
        }
    }

    /// Raster width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Metric distance at cell (u, v). Caller guarantees bounds.
    #[inline]
    pub fn get(&self, u: usize, v: usize) -> f32 {
        self.values[v * self.width + u]
    }

    /// First derivatives (dx, dy) at an interior cell, as signed sums over
    /// the 3x3 neighborhood (Sobel-like, unit weights).
    ///
    /// Caller guarantees `1 <= u < width-1` and `1 <= v < height-1`.
    #[inline]
    pub fn gradient(&self, u: usize, v: usize) -> (f32, f32) {
        let d = |uu: usize, vv: usize| self.get(uu, vv);
        let dx = -d(u - 1, v - 1) - d(u - 1, v) - d(u - 1, v + 1)
            + d(u + 1, v - 1)
            + d(u + 1, v)
            + d(u + 1, v + 1);
        let dy = -d(u - 1, v - 1) - d(u, v - 1) - d(u + 1, v - 1)
            + d(u - 1, v + 1)
            + d(u, v + 1)
            + d(u + 1, v + 1);
        (dx, dy)
    }

    /// In-place separable 5-tap Gaussian blur with edge replication.
    fn gaussian_blur(&mut self, sigma: f32) {
        if sigma <= 0.0 {
            return;
        }
        let kernel = gaussian_kernel_5(sigma);
        let w = self.width as i32;
        let h = self.height as i32;

        let mut tmp = vec![0.0f32; self.values.len()];
        // Horizontal pass
        for v in 0..h {
            for u in 0..w {
                let mut acc = 0.0;
                for (k, &wk) in kernel.iter().enumerate() {
                    let uu = (u + k as i32 - 2).clamp(0, w - 1);
                    acc += wk * self.values[(v * w + uu) as usize];
                }
                tmp[(v * w + u) as usize] = acc;
            }
        }
        // Vertical pass
        for v in 0..h {
            for u in 0..w {
                let mut acc = 0.0;
                for (k, &wk) in kernel.iter().enumerate() {
                    let vv = (v + k as i32 - 2).clamp(0, h - 1);
                    acc += wk * tmp[(vv * w + u) as usize];
                }
                self.values[(v * w + u) as usize] = acc;
            }
        }
    }
}

/// Normalized 5-tap Gaussian kernel.
fn gaussian_kernel_5(sigma: f32) -> [f32; 5] {
    let mut kernel = [0.0f32; 5];
    let denom = 2.0 * sigma * sigma;
    let mut sum = 0.0;
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = i as f32 - 2.0;
        *k = (-d * d / denom).exp();
        sum += *k;
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Exact squared Euclidean distance transform, in place.
///
/// `values` holds 0 at obstacle cells and a large sentinel elsewhere.
fn squared_edt(values: &mut [f32], width: usize, height: usize) {
    let n = width.max(height);
    let mut f = vec![0.0f32; n];
    let mut d = vec![0.0f32; n];
    let mut parabola = vec![0usize; n];
    let mut boundary = vec![0.0f32; n + 1];

    // Columns
    for u in 0..width {
        for v in 0..height {
            f[v] = values[v * width + u];
        }
        dt_1d(
            &f[..height],
            &mut d[..height],
            &mut parabola[..height],
            &mut boundary[..height + 1],
        );
        for v in 0..height {
            values[v * width + u] = d[v];
        }
    }

    // Rows
    for v in 0..height {
        let row = &values[v * width..(v + 1) * width];
        f[..width].copy_from_slice(row);
        dt_1d(
            &f[..width],
            &mut d[..width],
            &mut parabola[..width],
            &mut boundary[..width + 1],
        );
        values[v * width..(v + 1) * width].copy_from_slice(&d[..width]);
    }
}

/// 1D squared distance transform (lower envelope of parabolas).
fn dt_1d(f: &[f32], d: &mut [f32], parabola: &mut [usize], boundary: &mut [f32]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let mut k = 0usize;
    parabola[0] = 0;
    boundary[0] = -INF;
    boundary[1] = INF;

    for q in 1..n {
        let qf = q as f32;
        loop {
            let p = parabola[k] as f32;
            let s = ((f[q] + qf * qf) - (f[parabola[k]] + p * p)) / (2.0 * qf - 2.0 * p);
            if s <= boundary[k] {
                // Parabola k is fully dominated; pop it
                if k == 0 {
                    break;
                }
                k -= 1;
            } else {
                k += 1;
                parabola[k] = q;
                boundary[k] = s;
                boundary[k + 1] = INF;
                break;
            }
        }
    }

    let mut k = 0usize;
    for (q, out) in d.iter_mut().enumerate().take(n) {
        let qf = q as f32;
        while boundary[k + 1] < qf {
            k += 1;
        }
        let p = parabola[k] as f32;
        *out = (qf - p) * (qf - p) + f[parabola[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OccupancyGrid, Pose2D, FREE};
    use approx::assert_relative_eq;

    fn free_grid(width: usize, height: usize, resolution: f32) -> OccupancyGrid {
        OccupancyGrid::from_raw(
            width,
            height,
            resolution,
            Pose2D::identity(),
            vec![FREE; width * height],
        )
    }

    #[test]
    fn test_single_obstacle_distances() {
        let mut grid = free_grid(9, 9, 1.0);
        grid.set(4, 4, OCCUPIED);
        let field = DistanceField::from_grid(
            &grid,
            &DistanceFieldConfig {
                blur: false,
                blur_sigma: 0.0,
            },
        );

        assert_relative_eq!(field.get(4, 4), 0.0);
        assert_relative_eq!(field.get(5, 4), 1.0, epsilon = 1e-4);
        assert_relative_eq!(field.get(4, 6), 2.0, epsilon = 1e-4);
        // Diagonal neighbor is sqrt(2), exact transform not Manhattan
        assert_relative_eq!(field.get(5, 5), std::f32::consts::SQRT_2, epsilon = 1e-4);
    }

    #[test]
    fn test_distances_scale_with_resolution() {
        let mut grid = free_grid(9, 9, 0.05);
        grid.set(0, 0, OCCUPIED);
        let field = DistanceField::from_grid(
            &grid,
            &DistanceFieldConfig {
                blur: false,
                blur_sigma: 0.0,
            },
        );
        assert_relative_eq!(field.get(4, 0), 0.2, epsilon = 1e-4);
    }

    #[test]
    fn test_all_values_nonnegative_with_blur() {
        let mut grid = free_grid(21, 21, 0.1);
        grid.set(3, 3, OCCUPIED);
        grid.set(17, 12, OCCUPIED);
        let field = DistanceField::from_grid(&grid, &DistanceFieldConfig::default());
        for v in 0..21 {
            for u in 0..21 {
                assert!(field.get(u, v) >= 0.0);
            }
        }
    }

    #[test]
    fn test_blur_preserves_constant_field() {
        let mut field = DistanceField::from_raw(7, 7, vec![3.5; 49]);
        field.gaussian_blur(5.0);
        for v in 0..7 {
            for u in 0..7 {
                assert_relative_eq!(field.get(u, v), 3.5, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_unknown_cells_are_not_obstacles() {
        // Unknown (-1) must binarize as free space
        let grid = OccupancyGrid::new(5, 5, 1.0, Pose2D::identity());
        let field = DistanceField::from_grid(
            &grid,
            &DistanceFieldConfig {
                blur: false,
                blur_sigma: 0.0,
            },
        );
        assert!(field.get(2, 2) > 5.0);
    }

    #[test]
    fn test_gradient_of_linear_ramp() {
        // f(u, v) = u has Sobel-sum gradient (6, 0)
        let values: Vec<f32> = (0..25).map(|i| (i % 5) as f32).collect();
        let field = DistanceField::from_raw(5, 5, values);
        let (dx, dy) = field.gradient(2, 2);
        assert_relative_eq!(dx, 6.0, epsilon = 1e-5);
        assert_relative_eq!(dy, 0.0, epsilon = 1e-5);
    }
}
