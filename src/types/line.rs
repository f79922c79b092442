//! Classified serial lines

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::types::Finger;

/// One glove line after classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GloveLine {
    /// `thumb` | `index` | `middle` | `ring` | `pinkie`
    Finger(Finger),
    /// `flex b0 b1 b2 b3 b4`, each 0 or 1
    Flex([u8; 5]),
    /// `flexa v0 v1 v2 v3 v4`, raw sensor units
    FlexAnalog([i32; 5]),
    /// `shake`
    Shake,
    /// Three numbers, m/s²
    Accel(Vec3),
}

impl GloveLine {
    /// Short tag for logs
    pub fn kind(&self) -> &'static str {
        match self {
            GloveLine::Finger(_) => "finger",
            GloveLine::Flex(_) => "flex",
            GloveLine::FlexAnalog(_) => "flexa",
            GloveLine::Shake => "shake",
            GloveLine::Accel(_) => "accel",
        }
    }

    /// Gesture lines, as opposed to the accelerometer stream
    pub fn is_gesture(&self) -> bool {
        !matches!(self, GloveLine::Accel(_))
    }
}
