//! Core types for gloveline

mod event;
mod finger;
mod line;
mod mode;
mod pose;
mod reason;

pub use event::{EventOutput, GloveEvent};
pub use finger::{Finger, FingerBits, GesturePattern, CHOICE_1, CHOICE_2, CHOICE_3, CHOICE_PATTERNS, THUMBS_UP};
pub use line::GloveLine;
pub use mode::{Mode, ModeRule, ModeTable, PatternRule};
pub use pose::{Pose, PoseTemplates};
pub use reason::ReasonCode;
