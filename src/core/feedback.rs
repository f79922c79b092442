//! LED feedback written back to the glove
//!
//! `S n` lights sequence `n`, `S 0` reverts. Only one sequence is active; a new
//! flash replaces the pending revert.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::GloveError;
use crate::types::ReasonCode;

/// Command line for a sequence, without the trailing newline
pub fn format_sequence_command(n: u8) -> String {
    format!("S {}", n)
}

/// Destination for feedback commands
pub trait FeedbackWriter: Send {
    fn write_line(&mut self, line: &str) -> Result<(), GloveError>;
}

/// Used while no glove is connected
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWriter;

impl FeedbackWriter for NullWriter {
    fn write_line(&mut self, _line: &str) -> Result<(), GloveError> {
        Ok(())
    }
}

/// Keeps every written line; clones share the log
#[derive(Debug, Default, Clone)]
pub struct RecordingWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl FeedbackWriter for RecordingWriter {
    fn write_line(&mut self, line: &str) -> Result<(), GloveError> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| GloveError::FeedbackWrite("recorder poisoned".to_string()))?;
        lines.push(line.to_string());
        Ok(())
    }
}

/// Single-slot flash/revert timer over a writer
pub struct FeedbackChannel {
    writer: Box<dyn FeedbackWriter>,
    default_duration: Duration,
    active: Option<u8>,
    revert_at: Option<Instant>,
}

impl FeedbackChannel {
    pub fn new(writer: Box<dyn FeedbackWriter>, default_duration: Duration) -> Self {
        Self {
            writer,
            default_duration,
            active: None,
            revert_at: None,
        }
    }

    /// Channel that discards everything
    pub fn disconnected(default_duration: Duration) -> Self {
        Self::new(Box::new(NullWriter), default_duration)
    }

    pub fn set_writer(&mut self, writer: Box<dyn FeedbackWriter>) {
        self.writer = writer;
    }

    /// Flash `n` for the default duration
    pub fn flash(&mut self, n: u8, now: Instant) {
        self.flash_sequence(n, self.default_duration, now);
    }

    /// Write `S n` now and `S 0` after `duration`, replacing any pending revert
    pub fn flash_sequence(&mut self, n: u8, duration: Duration, now: Instant) {
        self.revert_at = None;
        self.send(n);
        self.active = Some(n);
        self.revert_at = Some(now + duration);
    }

    /// Write the revert once it is due
    pub fn tick(&mut self, now: Instant) {
        if let Some(at) = self.revert_at {
            if now >= at {
                self.revert_at = None;
                self.active = None;
                self.send(0);
            }
        }
    }

    /// Sequence currently lit, if any
    pub fn active(&self) -> Option<u8> {
        self.active
    }

    pub fn revert_pending(&self) -> bool {
        self.revert_at.is_some()
    }

    fn send(&mut self, n: u8) {
        let cmd = format_sequence_command(n);
        match self.writer.write_line(&cmd) {
            Ok(()) => debug!("[FEEDBACK] {}", cmd),
            Err(e) => warn!("[FEEDBACK] {} failed ({}): {}", cmd, ReasonCode::R502_FEEDBACK_WRITE_FAILED.code(), e),
        }
    }
}

impl std::fmt::Debug for FeedbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackChannel")
            .field("active", &self.active)
            .field("revert_at", &self.revert_at)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
