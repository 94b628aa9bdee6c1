//! Pose hypothesis sampling and raster validation.

mod hypothesis;
mod matching_rate;
mod noise;

pub use hypothesis::{PoseHypothesisGenerator, PoseSamplingConfig};
pub use matching_rate::MatchingRateEvaluator;
pub use noise::NoiseGenerator;
