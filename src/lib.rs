//! gloveline: serial sensor-glove decoder
//!
//! serial line → classifier → pose / finger-gesture engines → mode router → game sink

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use config::{load_config, save_config, GloveConfig};
pub use error::GloveError;

// =============================================================================
// POSE SETTINGS [C] - calibrated on the prototype glove
// =============================================================================

/// Per-axis tolerance around a pose template (m/s²)
pub const POSE_TOLERANCE: f32 = 4.0;

/// Exponential smoothing factor applied every tick
pub const SMOOTHING_ALPHA: f32 = 0.35;

/// How long a classification must repeat before it is emitted
pub const DWELL_TIME_SECS: f32 = 0.12;

/// NEUTRAL dwell needed to re-arm pose emission after a command
pub const NEUTRAL_REARM_DWELL_SECS: f32 = 0.25;

/// Templates, (ax, ay, az)
pub const NEUTRAL_TEMPLATE: [f32; 3] = [1.05, 1.90, 10.21];
pub const DOWN_TEMPLATE: [f32; 3] = [10.37, 0.24, 1.92];
pub const LEFT_TEMPLATE: [f32; 3] = [1.22, 10.36, 3.53];
pub const RIGHT_TEMPLATE: [f32; 3] = [-1.53, -9.02, 0.16];
pub const UP_TEMPLATE: [f32; 3] = [-9.53, 2.12, 1.73];

// =============================================================================
// FINGER GESTURES [C]
// =============================================================================

/// Gesture window lifetime without a pattern match
pub const GESTURE_WINDOW_SECS: f32 = 0.6;

/// Minimum gap between two choice events
pub const CHOICE_COOLDOWN_SECS: f32 = 0.25;

/// Consecutive `flex` samples needed before a finger counts as bent
pub const BEND_CONFIRM_COUNT: u32 = 2;

/// Streak counters saturate here
pub const BEND_STREAK_MAX: u32 = 1000;

/// Analog reading of each finger held straight (thumb → pinkie)
pub const STRAIGHT_BASELINE: [i32; 5] = [242, 258, 229, 274, 266];

/// Enter "bent" at baseline + BENT_DELTA
pub const BENT_DELTA: i32 = 180;

/// Leave "bent" at baseline + STRAIGHT_DELTA
pub const STRAIGHT_DELTA: i32 = 40;

/// Named-finger evidence stays in the posture vector this long
pub const NAME_HOLD_SECS: f32 = 2.0;

pub const THUMBS_UP_HOLD_SECS: f32 = 0.5;
pub const THUMBS_UP_COOLDOWN_SECS: f32 = 0.75;

// =============================================================================
// FIST, LANES AND SHAKE [C]
// =============================================================================

pub const FIST_WINDOW_SECS: f32 = 1.5;
pub const FIST_COOLDOWN_SECS: f32 = 0.75;

/// The sliding puzzle wants a snappier fist
pub const MINIGAME4_FIST_WINDOW_SECS: f32 = 1.25;
pub const MINIGAME4_FIST_COOLDOWN_SECS: f32 = 0.5;

pub const LANE_COOLDOWN_SECS: f32 = 0.15;
pub const CATCH_COOLDOWN_SECS: f32 = 0.25;

/// Catch radius around the player, world units
pub const CATCH_RADIUS: f32 = 0.8;

// =============================================================================
// SERIAL AND FEEDBACK [C]
// =============================================================================

pub const DEFAULT_PORT: &str = "COM3";
pub const DEFAULT_BAUD: u32 = 9600;

pub const READ_TIMEOUT_MS: u64 = 50;
pub const WRITE_TIMEOUT_MS: u64 = 200;

/// Microcontroller resets on DTR; give it time before reading
pub const OPEN_SETTLE_MS: u64 = 800;

/// Sleep after an unexpected read error
pub const READ_ERROR_BACKOFF_MS: u64 = 100;

/// Bounded join on shutdown
pub const READER_JOIN_TIMEOUT_MS: u64 = 200;

/// How long an LED sequence plays before reverting to sequence 0
pub const FEEDBACK_DURATION_SECS: f32 = 2.0;

/// Raw recognised lines logged at debug before going quiet
pub const RAW_LOG_MAX: usize = 200;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
