//! Hand pose labels and templates

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{DOWN_TEMPLATE, LEFT_TEMPLATE, NEUTRAL_TEMPLATE, RIGHT_TEMPLATE, UP_TEMPLATE};

/// Discrete hand orientation decoded from the accelerometer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pose {
    Neutral,
    Down,
    Left,
    Right,
    Up,
}

impl Pose {
    /// Template evaluation order; earlier wins an exact tie
    pub const EVALUATION_ORDER: [Pose; 5] = [Pose::Down, Pose::Neutral, Pose::Left, Pose::Right, Pose::Up];

    pub fn label(&self) -> &'static str {
        match self {
            Pose::Neutral => "NEUTRAL",
            Pose::Down => "DOWN",
            Pose::Left => "LEFT",
            Pose::Right => "RIGHT",
            Pose::Up => "UP",
        }
    }

    /// Parse a label, case-insensitive
    pub fn from_label(s: &str) -> Option<Pose> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEUTRAL" => Some(Pose::Neutral),
            "DOWN" => Some(Pose::Down),
            "LEFT" => Some(Pose::Left),
            "RIGHT" => Some(Pose::Right),
            "UP" => Some(Pose::Up),
            _ => None,
        }
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Expected smoothed reading for each pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseTemplates {
    pub neutral: Vec3,
    pub down: Vec3,
    pub left: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Default for PoseTemplates {
    fn default() -> Self {
        Self {
            neutral: Vec3::from_array(NEUTRAL_TEMPLATE),
            down: Vec3::from_array(DOWN_TEMPLATE),
            left: Vec3::from_array(LEFT_TEMPLATE),
            right: Vec3::from_array(RIGHT_TEMPLATE),
            up: Vec3::from_array(UP_TEMPLATE),
        }
    }
}

impl PoseTemplates {
    pub fn get(&self, pose: Pose) -> Vec3 {
        match pose {
            Pose::Neutral => self.neutral,
            Pose::Down => self.down,
            Pose::Left => self.left,
            Pose::Right => self.right,
            Pose::Up => self.up,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip_is_case_insensitive() {
        assert_eq!(Pose::from_label("right"), Some(Pose::Right));
        assert_eq!(Pose::from_label(" Neutral "), Some(Pose::Neutral));
        assert_eq!(Pose::from_label("sideways"), None);
    }

    #[test]
    fn test_serde_uses_upper_case() {
        let json = serde_json::to_string(&Pose::Left).unwrap();
        assert_eq!(json, "\"LEFT\"");
    }
}
