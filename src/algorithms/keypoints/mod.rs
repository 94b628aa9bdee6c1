//! Keypoint detection and description over distance fields.
//!
//! Keypoints are critical points of the map's distance field (ridge maxima,
//! valley minima, saddles); each one carries a rotation-sensitive
//! orientation-histogram descriptor used for local↔global matching.

mod descriptor;
mod detector;

pub use descriptor::{
    FeatureDescriptor, FeatureDescriptorConfig, SdfOrientationFeature, REL_ORIENT_BINS,
};
pub use detector::{Keypoint, KeypointDetector, KeypointDetectorConfig, KeypointType};
