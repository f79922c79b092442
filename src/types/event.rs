//! Decoded events and their output records

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{Mode, Pose, ReasonCode};

/// A discrete input event produced by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GloveEvent {
    Pose(Pose),
    /// Numbered choice, 1..=3
    Choice(u8),
    /// Lane index, 0..=2
    Lane(usize),
    Fist,
    ThumbsUp,
    Shake,
    SceneChanged(Mode),
}

impl GloveEvent {
    /// Short label used in logs and terminal output
    pub fn label(&self) -> String {
        match self {
            GloveEvent::Pose(p) => format!("POSE {}", p),
            GloveEvent::Choice(n) => format!("CHOICE {}", n),
            GloveEvent::Lane(i) => format!("LANE {}", i),
            GloveEvent::Fist => "FIST".to_string(),
            GloveEvent::ThumbsUp => "THUMBS UP".to_string(),
            GloveEvent::Shake => "SHAKE".to_string(),
            GloveEvent::SceneChanged(m) => format!("SCENE {}", m),
        }
    }
}

/// Record of one emitted event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOutput {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Mode the event was routed in
    pub mode: Mode,
    pub event: GloveEvent,
    pub reason: ReasonCode,
    /// Sink methods invoked, by name
    pub calls: Vec<String>,
    /// LED sequence written back, if any
    pub feedback: Option<u8>,
}

impl EventOutput {
    pub fn new(mode: Mode, event: GloveEvent, reason: ReasonCode) -> Self {
        Self {
            timestamp: Utc::now(),
            mode,
            event,
            reason,
            calls: Vec::new(),
            feedback: None,
        }
    }

    pub fn with_calls(mut self, calls: Vec<String>) -> Self {
        self.calls = calls;
        self
    }

    pub fn with_feedback(mut self, seq: Option<u8>) -> Self {
        self.feedback = seq;
        self
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let label = match self.event {
            GloveEvent::Pose(_) => self.event.label().cyan(),
            GloveEvent::Choice(_) | GloveEvent::Lane(_) => self.event.label().green(),
            GloveEvent::Fist => self.event.label().yellow(),
            GloveEvent::ThumbsUp => self.event.label().magenta(),
            GloveEvent::Shake => self.event.label().blue(),
            GloveEvent::SceneChanged(_) => self.event.label().white().bold(),
        };
        let calls = if self.calls.is_empty() {
            "-".dimmed().to_string()
        } else {
            self.calls.join(",")
        };
        format!(
            "{} [{}] {} | calls={} | {}",
            self.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
            self.mode,
            label.bold(),
            calls,
            self.reason.code().dimmed()
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "mode={} | event={} | calls={} | feedback={} | reason={}",
            self.mode,
            self.event.label(),
            self.calls.join(","),
            self.feedback.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            self.reason.code()
        )
    }
}
