//! DishaReloc - Global relocalization for 2D LiDAR robots on known maps.
//!
//! Given no prior pose estimate, this crate proposes plausible robot poses in
//! the map frame by matching geometric landmarks extracted from the global
//! occupancy grid against landmarks extracted from a locally built submap of
//! recent scans.
//!
//! # Architecture
//!
//! The crate is organized into 3 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │   (relocalizer, key-scan window, local map,         │
//! │    landmark building, transform acquisition)        │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │   (distance field, keypoints, descriptors,          │
//! │    matching, pose sampling)                         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! The global map arrives once and is frozen into a landmark set:
//! distance field → keypoint detection → orientation descriptors.
//!
//! Each accepted scan updates a bounded, movement-triggered key-scan window.
//! Whenever the window is full, the same extraction chain runs over a local
//! occupancy grid rasterized from the window, local landmarks are matched
//! against the global set with a best/second-best ratio test, and each
//! accepted correspondence is turned into one or more validated pose
//! hypotheses.
//!
//! The crate is a library: map, scan and odometry messages are delivered by
//! the host through [`Relocalizer::on_map`], [`Relocalizer::on_odometry`] and
//! [`Relocalizer::on_scan`]; hypothesis sets and diagnostic outputs come back
//! as plain values.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Algorithms (depends on core)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 3: Engine (depends on core, algorithms)
// ============================================================================
pub mod engine;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::types::{
    CellState, LaserScan, OccupancyGrid, Point2D, Pose2D, FREE, OCCUPIED, UNKNOWN,
};

// Algorithms
pub use algorithms::distance_field::{DistanceField, DistanceFieldConfig};
pub use algorithms::keypoints::{
    FeatureDescriptor, FeatureDescriptorConfig, Keypoint, KeypointDetector, KeypointDetectorConfig,
    KeypointType, SdfOrientationFeature,
};
pub use algorithms::matching::{Correspondence, FeatureMatcher, FeatureMatcherConfig};
pub use algorithms::sampling::{
    MatchingRateEvaluator, NoiseGenerator, PoseHypothesisGenerator, PoseSamplingConfig,
};

// Engine
pub use engine::{
    CycleOutput, EngineError, InitState, KeyScanWindow, KeyScanWindowConfig, LandmarkSet,
    LocalMapBuilder, LocalMapConfig, Relocalizer, RelocalizerConfig, ScanOutcome,
    TransformProvider,
};
