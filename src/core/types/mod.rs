//! Value types shared across the pipeline.

mod grid;
mod pose;
mod scan;

pub use grid::{CellState, OccupancyGrid, FREE, OCCUPIED, UNKNOWN};
pub use pose::{Point2D, Pose2D};
pub use scan::LaserScan;
