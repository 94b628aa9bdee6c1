//! Core relocalization algorithms.
//!
//! Everything here is pure computation over value types: distance fields,
//! keypoint detection and description, descriptor matching, and pose
//! hypothesis sampling. Orchestration lives in [`crate::engine`].

pub mod distance_field;
pub mod keypoints;
pub mod matching;
pub mod sampling;
