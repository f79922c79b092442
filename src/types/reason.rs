//! Reason codes for emitted and suppressed decoder decisions

use serde::{Deserialize, Serialize};

/// Reason codes for every event the decoder emits or swallows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R1xx: Poses
    // =========================================================================
    /// Pose held for the dwell time
    R101_POSE_CONFIRMED,
    /// Pose suppressed until NEUTRAL is held
    R102_POSE_AWAITING_NEUTRAL,
    /// Gate released after NEUTRAL dwell
    R103_POSE_REARMED,

    // =========================================================================
    // R2xx: Finger gestures
    // =========================================================================
    /// Choice pattern matched
    R201_CHOICE_MATCHED,
    /// Lane pattern matched
    R202_LANE_MATCHED,
    /// All five fingers seen inside the fist window
    R203_FIST_WINDOW_COMPLETE,
    /// Bitfield reported all five fingers bent
    R204_FIST_BITFIELD,
    /// Thumbs-up held long enough
    R205_THUMBS_UP_HELD,
    /// Gesture window expired without a match
    R206_WINDOW_EXPIRED,
    /// Event dropped inside its cooldown
    R207_COOLDOWN_ACTIVE,

    // =========================================================================
    // R3xx: Shake
    // =========================================================================
    /// Shake turned into a catch attempt
    R301_SHAKE_CATCH,

    // =========================================================================
    // R4xx: Routing
    // =========================================================================
    /// Scene change reset all state
    R401_SCENE_CHANGED,
    /// No sink bound for the current scene
    R402_NO_TARGET,
    /// Sink call dispatched
    R403_DISPATCHED,

    // =========================================================================
    // R5xx: Link
    // =========================================================================
    /// Port could not be opened, glove input disabled
    R501_PORT_UNAVAILABLE,
    /// Feedback write failed
    R502_FEEDBACK_WRITE_FAILED,
    /// Line did not match the grammar
    R503_LINE_DROPPED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R101_POSE_CONFIRMED => "R101_POSE_CONFIRMED",
            Self::R102_POSE_AWAITING_NEUTRAL => "R102_POSE_AWAITING_NEUTRAL",
            Self::R103_POSE_REARMED => "R103_POSE_REARMED",
            Self::R201_CHOICE_MATCHED => "R201_CHOICE_MATCHED",
            Self::R202_LANE_MATCHED => "R202_LANE_MATCHED",
            Self::R203_FIST_WINDOW_COMPLETE => "R203_FIST_WINDOW_COMPLETE",
            Self::R204_FIST_BITFIELD => "R204_FIST_BITFIELD",
            Self::R205_THUMBS_UP_HELD => "R205_THUMBS_UP_HELD",
            Self::R206_WINDOW_EXPIRED => "R206_WINDOW_EXPIRED",
            Self::R207_COOLDOWN_ACTIVE => "R207_COOLDOWN_ACTIVE",
            Self::R301_SHAKE_CATCH => "R301_SHAKE_CATCH",
            Self::R401_SCENE_CHANGED => "R401_SCENE_CHANGED",
            Self::R402_NO_TARGET => "R402_NO_TARGET",
            Self::R403_DISPATCHED => "R403_DISPATCHED",
            Self::R501_PORT_UNAVAILABLE => "R501_PORT_UNAVAILABLE",
            Self::R502_FEEDBACK_WRITE_FAILED => "R502_FEEDBACK_WRITE_FAILED",
            Self::R503_LINE_DROPPED => "R503_LINE_DROPPED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R101_POSE_CONFIRMED => "Pose confirmed",
            Self::R102_POSE_AWAITING_NEUTRAL => "Waiting for NEUTRAL",
            Self::R103_POSE_REARMED => "Pose input re-armed",
            Self::R201_CHOICE_MATCHED => "Choice pattern matched",
            Self::R202_LANE_MATCHED => "Lane pattern matched",
            Self::R203_FIST_WINDOW_COMPLETE => "Fist completed in window",
            Self::R204_FIST_BITFIELD => "Fist reported by bitfield",
            Self::R205_THUMBS_UP_HELD => "Thumbs-up held",
            Self::R206_WINDOW_EXPIRED => "Gesture window expired",
            Self::R207_COOLDOWN_ACTIVE => "Cooldown active",
            Self::R301_SHAKE_CATCH => "Shake catch",
            Self::R401_SCENE_CHANGED => "Scene changed",
            Self::R402_NO_TARGET => "No target in scene",
            Self::R403_DISPATCHED => "Dispatched",
            Self::R501_PORT_UNAVAILABLE => "Serial port unavailable",
            Self::R502_FEEDBACK_WRITE_FAILED => "Feedback write failed",
            Self::R503_LINE_DROPPED => "Line dropped",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
