//! Bounded, movement-triggered buffer of key scans.
//!
//! Not every scan is worth keeping: consecutive scans from a slow-moving
//! robot are nearly identical and would just smear the local map. The window
//! admits a scan only after the odometry pose has moved or turned enough
//! since the last admission, keeps the newest N entries, and evicts from
//! the back.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::math::angle_diff;
use crate::core::types::{LaserScan, Pose2D};

/// A retained scan with the odometry pose at admission time.
#[derive(Debug, Clone)]
pub struct KeyScan {
    /// The admitted scan.
    pub scan: LaserScan,
    /// Odometry body pose when the scan was admitted.
    pub pose: Pose2D,
}

/// Configuration for the key-scan window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyScanWindowConfig {
    /// Window capacity N.
    /// Typical: 5.
    pub capacity: usize,

    /// Translation since the last admission that triggers a new one, meters.
    /// Typical: 0.5.
    pub interval_dist: f32,

    /// Rotation since the last admission that triggers a new one, radians.
    /// Typical: 5° ≈ 0.087.
    pub interval_yaw: f32,
}

impl Default for KeyScanWindowConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            interval_dist: 0.5,
            interval_yaw: 5.0f32.to_radians(),
        }
    }
}

/// Newest-first ring of (scan, pose) pairs.
#[derive(Debug, Clone)]
pub struct KeyScanWindow {
    config: KeyScanWindowConfig,
    entries: VecDeque<KeyScan>,
    /// Odometry pose at the last admission; admission trigger reference.
    prev_pose: Option<Pose2D>,
}

impl KeyScanWindow {
    /// Create an empty window.
    pub fn new(config: KeyScanWindowConfig) -> Self {
        Self {
            config,
            entries: VecDeque::with_capacity(config.capacity + 1),
            prev_pose: None,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &KeyScanWindowConfig {
        &self.config
    }

    /// Number of retained key scans.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no scan has been admitted yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once exactly `capacity` scans are retained.
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.config.capacity
    }

    /// Newest-first iteration over retained key scans.
    pub fn iter(&self) -> impl Iterator<Item = &KeyScan> {
        self.entries.iter()
    }

    /// Most recently admitted key scan.
    pub fn newest(&self) -> Option<&KeyScan> {
        self.entries.front()
    }

    /// Oldest retained key scan.
    pub fn oldest(&self) -> Option<&KeyScan> {
        self.entries.back()
    }

    /// Offer a scan with the current odometry pose.
    ///
    /// The first scan seeds the window unconditionally; later scans are
    /// admitted only after sufficient translation or rotation since the
    /// previous admission. Returns true if the scan was admitted. On
    /// admission beyond capacity, the oldest entry is evicted.
    pub fn try_admit(&mut self, scan: &LaserScan, odom_pose: Pose2D) -> bool {
        let admit = match self.prev_pose {
            None => true,
            Some(prev) => {
                let dx = odom_pose.x - prev.x;
                let dy = odom_pose.y - prev.y;
                let dl = (dx * dx + dy * dy).sqrt();
                let dyaw = angle_diff(prev.theta, odom_pose.theta);
                dl > self.config.interval_dist || dyaw.abs() > self.config.interval_yaw
            }
        };
        if !admit {
            return false;
        }

        self.entries.push_front(KeyScan {
            scan: scan.clone(),
            pose: odom_pose,
        });
        self.entries.truncate(self.config.capacity);
        self.prev_pose = Some(odom_pose);
        true
    }
}
