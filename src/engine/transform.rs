//! Sensor mount offset acquisition.
//!
//! The pipeline needs the fixed sensor-to-body transform before it can
//! interpret any scan. Hosts expose it through [`TransformProvider`];
//! [`wait_for_sensor_offset`] polls until it appears or a deadline passes.

use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::core::types::Pose2D;
use crate::engine::EngineError;

/// Source of the fixed sensor-to-body transform.
///
/// Implementations return `None` until the transform is known. The
/// transform is treated as static once observed.
pub trait TransformProvider {
    /// The sensor pose in the body frame, if known yet.
    fn sensor_to_body(&self) -> Option<Pose2D>;
}

impl TransformProvider for Pose2D {
    fn sensor_to_body(&self) -> Option<Pose2D> {
        Some(*self)
    }
}

/// Poll `provider` until it yields the sensor offset.
///
/// Checks every `poll_interval` and gives up after `timeout`, returning
/// [`EngineError::TransformTimeout`].
pub fn wait_for_sensor_offset(
    provider: &dyn TransformProvider,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Pose2D, EngineError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(offset) = provider.sensor_to_body() {
            return Ok(offset);
        }
        if Instant::now() >= deadline {
            warn!("Sensor transform not available after {:?}", timeout);
            return Err(EngineError::TransformTimeout(timeout));
        }
        thread::sleep(poll_interval);
    }
}
