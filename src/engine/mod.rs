//! Relocalization orchestration layer.
//!
//! Coordinates the algorithm stages into a message-driven pipeline:
//!
//! ```text
//! map ─────▶ global landmark set (built once, frozen)
//!
//! odometry ─▶ latest pose ─┐
//!                          ▼
//! scan ────▶ key-scan window ─▶ local map ─▶ local landmarks
//!                                               │
//!                                               ▼
//!                              match ─▶ sample ─▶ validate ─▶ poses
//! ```
//!
//! # Contents
//!
//! - [`relocalizer`]: Top-level message-driven pipeline
//! - [`window`]: Bounded, movement-triggered key-scan buffer
//! - [`local_map`]: Local occupancy grid rasterization
//! - [`landmarks`]: Distance field → keypoints → descriptors chain
//! - [`transform`]: Sensor mount offset acquisition

use std::time::Duration;

use thiserror::Error;

pub mod landmarks;
pub mod local_map;
pub mod relocalizer;
pub mod transform;
pub mod window;

pub use landmarks::LandmarkSet;
pub use local_map::{LocalMapBuilder, LocalMapConfig};
pub use relocalizer::{CycleOutput, InitState, Relocalizer, RelocalizerConfig, ScanOutcome};
pub use transform::{wait_for_sensor_offset, TransformProvider};
pub use window::{KeyScan, KeyScanWindow, KeyScanWindowConfig};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Sensor transform not available after {0:?}")]
    TransformTimeout(Duration),

    #[error("Global map not received")]
    MapUnavailable,

    #[error("Odometry not received")]
    OdometryUnavailable,
}
