//! Tunables for the decoder, with JSON load/save

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GloveError;
use crate::types::{ModeTable, PoseTemplates};
use crate::{
    BEND_CONFIRM_COUNT, BENT_DELTA, CATCH_COOLDOWN_SECS, CATCH_RADIUS, CHOICE_COOLDOWN_SECS,
    DEFAULT_BAUD, DEFAULT_PORT, DWELL_TIME_SECS, FEEDBACK_DURATION_SECS, FIST_COOLDOWN_SECS,
    FIST_WINDOW_SECS, GESTURE_WINDOW_SECS, LANE_COOLDOWN_SECS, MINIGAME4_FIST_COOLDOWN_SECS,
    MINIGAME4_FIST_WINDOW_SECS, NAME_HOLD_SECS, NEUTRAL_REARM_DWELL_SECS, POSE_TOLERANCE,
    RAW_LOG_MAX, SMOOTHING_ALPHA, STRAIGHT_BASELINE, STRAIGHT_DELTA, THUMBS_UP_COOLDOWN_SECS,
    THUMBS_UP_HOLD_SECS,
};

/// How accelerometer lines are split into numbers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelFormat {
    /// Any three numbers, arbitrary separators, decimal point or comma
    #[default]
    Tolerant,
    /// Strict `x,y,z`
    Csv,
}

/// Full decoder configuration
///
/// Every field has a default; a JSON file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GloveConfig {
    // Serial
    pub port: String,
    pub baud: u32,
    pub accel_format: AccelFormat,

    // Poses
    pub templates: PoseTemplates,
    pub tolerance: f32,
    pub alpha: f32,
    pub dwell_time_secs: f32,
    pub neutral_rearm_dwell_secs: f32,

    // Finger window and patterns
    pub gesture_window_secs: f32,
    pub choice_cooldown_secs: f32,
    pub bend_confirm_count: u32,
    pub straight_baseline: [i32; 5],
    pub bent_delta: i32,
    pub straight_delta: i32,
    pub name_hold_secs: f32,
    pub thumbs_up_hold_secs: f32,
    pub thumbs_up_cooldown_secs: f32,
    /// Flip every incoming `flex` bit
    pub invert_flex_bits: bool,
    /// `finger_order[i]` is the wire position carrying finger `i`
    pub finger_order: [usize; 5],

    // Fist
    pub fist_window_secs: f32,
    pub fist_cooldown_secs: f32,
    pub minigame4_fist_window_secs: f32,
    pub minigame4_fist_cooldown_secs: f32,

    // Lanes and shake
    pub lane_cooldown_secs: f32,
    pub catch_cooldown_secs: f32,
    pub catch_radius: f32,

    // Feedback
    pub feedback_duration_secs: f32,

    // Debug
    pub log_raw_lines: bool,
    pub raw_log_max: usize,

    pub modes: ModeTable,
}

impl Default for GloveConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud: DEFAULT_BAUD,
            accel_format: AccelFormat::Tolerant,
            templates: PoseTemplates::default(),
            tolerance: POSE_TOLERANCE,
            alpha: SMOOTHING_ALPHA,
            dwell_time_secs: DWELL_TIME_SECS,
            neutral_rearm_dwell_secs: NEUTRAL_REARM_DWELL_SECS,
            gesture_window_secs: GESTURE_WINDOW_SECS,
            choice_cooldown_secs: CHOICE_COOLDOWN_SECS,
            bend_confirm_count: BEND_CONFIRM_COUNT,
            straight_baseline: STRAIGHT_BASELINE,
            bent_delta: BENT_DELTA,
            straight_delta: STRAIGHT_DELTA,
            name_hold_secs: NAME_HOLD_SECS,
            thumbs_up_hold_secs: THUMBS_UP_HOLD_SECS,
            thumbs_up_cooldown_secs: THUMBS_UP_COOLDOWN_SECS,
            invert_flex_bits: false,
            finger_order: [0, 1, 2, 3, 4],
            fist_window_secs: FIST_WINDOW_SECS,
            fist_cooldown_secs: FIST_COOLDOWN_SECS,
            minigame4_fist_window_secs: MINIGAME4_FIST_WINDOW_SECS,
            minigame4_fist_cooldown_secs: MINIGAME4_FIST_COOLDOWN_SECS,
            lane_cooldown_secs: LANE_COOLDOWN_SECS,
            catch_cooldown_secs: CATCH_COOLDOWN_SECS,
            catch_radius: CATCH_RADIUS,
            feedback_duration_secs: FEEDBACK_DURATION_SECS,
            log_raw_lines: true,
            raw_log_max: RAW_LOG_MAX,
            modes: ModeTable::default(),
        }
    }
}

/// Longest accepted duration setting
pub const MAX_DURATION_SECS: f32 = 3600.0;

/// Seconds → `Duration`, clamped to `0..=MAX_DURATION_SECS`; never panics
pub fn secs(v: f32) -> Duration {
    let v = if v.is_finite() {
        v.clamp(0.0, MAX_DURATION_SECS)
    } else if v > 0.0 {
        MAX_DURATION_SECS
    } else {
        0.0
    };
    Duration::from_secs_f32(v)
}

impl GloveConfig {
    /// Every duration setting, by field name
    fn durations(&self) -> [(&'static str, f32); 14] {
        [
            ("dwell_time_secs", self.dwell_time_secs),
            ("neutral_rearm_dwell_secs", self.neutral_rearm_dwell_secs),
            ("gesture_window_secs", self.gesture_window_secs),
            ("choice_cooldown_secs", self.choice_cooldown_secs),
            ("name_hold_secs", self.name_hold_secs),
            ("thumbs_up_hold_secs", self.thumbs_up_hold_secs),
            ("thumbs_up_cooldown_secs", self.thumbs_up_cooldown_secs),
            ("fist_window_secs", self.fist_window_secs),
            ("fist_cooldown_secs", self.fist_cooldown_secs),
            ("minigame4_fist_window_secs", self.minigame4_fist_window_secs),
            ("minigame4_fist_cooldown_secs", self.minigame4_fist_cooldown_secs),
            ("lane_cooldown_secs", self.lane_cooldown_secs),
            ("catch_cooldown_secs", self.catch_cooldown_secs),
            ("feedback_duration_secs", self.feedback_duration_secs),
        ]
    }

    /// Reject values the state machines cannot work with
    pub fn validate(&self) -> Result<(), GloveError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(GloveError::InvalidConfig(format!("alpha {} outside (0, 1]", self.alpha)));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(GloveError::InvalidConfig("tolerance must be positive".to_string()));
        }
        if !(self.catch_radius >= 0.0 && self.catch_radius.is_finite()) {
            return Err(GloveError::InvalidConfig("catch_radius must not be negative".to_string()));
        }
        for (name, v) in self.durations() {
            if let Err(e) = Duration::try_from_secs_f32(v) {
                return Err(GloveError::InvalidConfig(format!("{} = {}: {}", name, v, e)));
            }
            if v > MAX_DURATION_SECS {
                return Err(GloveError::InvalidConfig(format!(
                    "{} = {} exceeds {} s",
                    name, v, MAX_DURATION_SECS
                )));
            }
        }
        let windows = [
            ("gesture_window_secs", self.gesture_window_secs),
            ("fist_window_secs", self.fist_window_secs),
            ("minigame4_fist_window_secs", self.minigame4_fist_window_secs),
            ("thumbs_up_hold_secs", self.thumbs_up_hold_secs),
            ("feedback_duration_secs", self.feedback_duration_secs),
        ];
        for (name, v) in windows {
            if v <= 0.0 {
                return Err(GloveError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if self.bend_confirm_count == 0 {
            return Err(GloveError::InvalidConfig("bend_confirm_count must be at least 1".to_string()));
        }
        if self.straight_delta >= self.bent_delta {
            return Err(GloveError::InvalidConfig(
                "straight_delta must be below bent_delta".to_string(),
            ));
        }
        for (k, base) in self.straight_baseline.iter().enumerate() {
            if base.checked_add(self.bent_delta).is_none() || base.checked_add(self.straight_delta).is_none() {
                return Err(GloveError::InvalidConfig(format!(
                    "straight_baseline[{}] = {} overflows with the bend deltas",
                    k, base
                )));
            }
        }
        let mut seen = [false; 5];
        for &i in &self.finger_order {
            if i >= 5 || seen[i] {
                return Err(GloveError::InvalidConfig(format!(
                    "finger_order {:?} is not a permutation of 0..5",
                    self.finger_order
                )));
            }
            seen[i] = true;
        }
        if self.modes.rules.is_empty() {
            return Err(GloveError::InvalidConfig("mode table has no rules".to_string()));
        }
        Ok(())
    }
}

/// Load and validate a JSON config file
pub fn load_config(path: &str) -> Result<GloveConfig, GloveError> {
    let json = std::fs::read_to_string(path).map_err(|e| GloveError::ConfigRead {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let config: GloveConfig = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
}

/// Write a config as pretty JSON
pub fn save_config(config: &GloveConfig, path: &str) -> Result<(), GloveError> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GloveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides_only_named_fields() {
        let cfg: GloveConfig = serde_json::from_str(r#"{"port": "COM9", "tolerance": 3.5}"#).unwrap();
        assert_eq!(cfg.port, "COM9");
        assert_eq!(cfg.tolerance, 3.5);
        assert_eq!(cfg.baud, DEFAULT_BAUD);
        assert_eq!(cfg.straight_baseline, STRAIGHT_BASELINE);
    }

    #[test]
    fn test_rejects_bad_finger_order() {
        let cfg = GloveConfig {
            finger_order: [0, 1, 1, 3, 4],
            ..GloveConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GloveError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_alpha() {
        let cfg = GloveConfig {
            alpha: 0.0,
            ..GloveConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_cooldowns() {
        for json in [
            r#"{"choice_cooldown_secs": -0.5}"#,
            r#"{"catch_cooldown_secs": -1.0}"#,
            r#"{"lane_cooldown_secs": -0.1}"#,
            r#"{"name_hold_secs": -2.0}"#,
            r#"{"thumbs_up_cooldown_secs": -1.0}"#,
            r#"{"fist_cooldown_secs": -1.0}"#,
            r#"{"minigame4_fist_cooldown_secs": -1.0}"#,
            r#"{"dwell_time_secs": -0.1}"#,
        ] {
            let cfg: GloveConfig = serde_json::from_str(json).unwrap();
            assert!(matches!(cfg.validate(), Err(GloveError::InvalidConfig(_))), "accepted {}", json);
        }
    }

    #[test]
    fn test_rejects_huge_durations() {
        let cfg: GloveConfig = serde_json::from_str(r#"{"fist_cooldown_secs": 1e30}"#).unwrap();
        assert!(cfg.validate().is_err());
        let cfg: GloveConfig = serde_json::from_str(r#"{"name_hold_secs": 7200.0}"#).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_overflowing_baseline() {
        let cfg = GloveConfig {
            straight_baseline: [i32::MAX, 0, 0, 0, 0],
            ..GloveConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GloveError::InvalidConfig(_))));
    }

    #[test]
    fn test_secs_never_panics() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f32::NAN), Duration::ZERO);
        assert_eq!(secs(f32::INFINITY), Duration::from_secs(3600));
        assert_eq!(secs(0.25), Duration::from_secs_f32(0.25));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join("gloveline_config_test.json");
        let path = path.to_str().unwrap().to_string();
        let cfg = GloveConfig {
            baud: 115200,
            ..GloveConfig::default()
        };
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_file(&path);
    }
}
