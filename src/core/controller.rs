//! Glove controller: owns every engine and runs them once per frame
//!
//! The host constructs one controller, tells it about scene loads and calls
//! `update` each frame. All decoder state lives here and is touched only by the
//! thread calling `update`.

use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{secs, GloveConfig};
use crate::core::feedback::{FeedbackChannel, FeedbackWriter, NullWriter};
use crate::core::gesture::{FingerGestureEngine, GestureSignal, GestureSnapshot};
use crate::core::line_parser::LineParser;
use crate::core::pose::{PosePhase, PoseTracker};
use crate::core::router::{GloveRouter, SceneBindings};
use crate::core::serial::SerialLink;
use crate::types::{EventOutput, GloveEvent, GloveLine, Mode, Pose, ReasonCode};

/// Read-only view for status endpoints and the CLI
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub mode: Mode,
    pub scene: String,
    pub connected: bool,
    pub port: Option<String>,
    pub pose_phase: PosePhase,
    pub last_pose: Option<Pose>,
    pub filtered: [f32; 3],
    pub gesture: GestureSnapshot,
    pub current_lane: usize,
    pub feedback_active: Option<u8>,
    pub lines_seen: u64,
    pub events_emitted: u64,
}

pub struct GloveController {
    config: GloveConfig,
    parser: LineParser,
    pose: PoseTracker,
    gestures: FingerGestureEngine,
    router: GloveRouter,
    feedback: FeedbackChannel,
    link: Option<SerialLink>,
    injected: VecDeque<GloveLine>,
    current_lane: usize,
    last_catch: Option<Instant>,
    lines_seen: u64,
    events_emitted: u64,
}

impl GloveController {
    pub fn new(config: GloveConfig) -> Self {
        let feedback = FeedbackChannel::disconnected(secs(config.feedback_duration_secs));
        Self {
            parser: LineParser::with_accel_format(config.accel_format),
            pose: PoseTracker::new(&config),
            gestures: FingerGestureEngine::new(&config),
            router: GloveRouter::new(config.modes.clone(), config.catch_radius),
            feedback,
            link: None,
            injected: VecDeque::new(),
            current_lane: 0,
            last_catch: None,
            lines_seen: 0,
            events_emitted: 0,
            config,
        }
    }

    /// Take over an open link; feedback goes to its port from now on
    pub fn attach_link(&mut self, link: SerialLink) {
        info!("[CONTROLLER] glove attached on {}", link.port_name());
        self.feedback.set_writer(Box::new(link.feedback_writer()));
        self.link = Some(link);
    }

    /// Stop the reader and fall back to no glove input
    pub fn detach_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.shutdown();
        }
        self.feedback.set_writer(Box::new(NullWriter));
    }

    pub fn set_feedback_writer(&mut self, writer: Box<dyn FeedbackWriter>) {
        self.feedback.set_writer(writer);
    }

    // =========================================================================
    // Scene transitions
    // =========================================================================

    /// New scene: new mode and targets, every timer back to its initial state
    pub fn on_scene_changed(&mut self, scene: &str, bindings: SceneBindings, now: Instant) -> EventOutput {
        // Nothing read before the transition is applied after it
        if let Some(link) = &self.link {
            let dropped = link.drain().len();
            if dropped > 0 {
                debug!("[CONTROLLER] discarded {} queued lines on scene change", dropped);
            }
        }
        self.injected.clear();

        let mode = self.router.on_scene_changed(scene, bindings);
        self.pose.reset();
        self.gestures.reset();
        self.last_catch = None;
        self.current_lane = 0;

        let mut calls = Vec::new();
        if mode == Mode::MiniGame3 {
            calls = self.router.route(&GloveEvent::Lane(0));
        }

        self.events_emitted += 1;
        EventOutput::new(mode, GloveEvent::SceneChanged(mode), ReasonCode::R401_SCENE_CHANGED)
            .with_calls(calls)
    }

    // =========================================================================
    // Frame update
    // =========================================================================

    /// Apply queued lines in arrival order, then run the timers
    pub fn update(&mut self, now: Instant) -> Vec<EventOutput> {
        let mut lines: Vec<GloveLine> = match &self.link {
            Some(link) => link.drain(),
            None => Vec::new(),
        };
        lines.extend(self.injected.drain(..));

        let mut out = Vec::new();
        for line in lines {
            out.extend(self.handle_line(line, now));
        }

        let mode = self.router.mode();
        for signal in self.gestures.tick(mode, now) {
            out.push(self.emit_signal(signal, now));
        }

        self.feedback.tick(now);

        if mode.uses_poses() {
            if let Some(pose) = self.pose.tick(now, mode.requires_neutral_gate()) {
                out.push(self.emit(GloveEvent::Pose(pose), ReasonCode::R101_POSE_CONFIRMED, now));
            }
        }

        out
    }

    /// Apply one classified line immediately
    pub fn handle_line(&mut self, line: GloveLine, now: Instant) -> Vec<EventOutput> {
        self.lines_seen += 1;
        let mode = self.router.mode();

        let signals = match line {
            GloveLine::Finger(finger) => self.gestures.on_finger_name(finger, mode, now),
            GloveLine::Flex(bits) => self.gestures.on_flex_bits(bits, mode, now),
            GloveLine::FlexAnalog(values) => self.gestures.on_flex_analog(values, mode, now),
            GloveLine::Shake => {
                return if mode.uses_shake() {
                    vec![self.handle_shake(now)]
                } else {
                    Vec::new()
                };
            }
            GloveLine::Accel(v) => {
                if mode.uses_poses() {
                    self.pose.set_sample(v);
                }
                return Vec::new();
            }
        };

        signals
            .into_iter()
            .map(|s| self.emit_signal(s, now))
            .collect()
    }

    /// Queue a raw line for the next `update`; `false` if it does not parse
    pub fn inject_raw(&mut self, raw: &str) -> bool {
        match self.parser.parse(raw) {
            Some(line) => {
                self.injected.push_back(line);
                true
            }
            None => {
                debug!("[CONTROLLER] {} {:?}", ReasonCode::R503_LINE_DROPPED.code(), raw);
                false
            }
        }
    }

    pub fn inject_line(&mut self, line: GloveLine) {
        self.injected.push_back(line);
    }

    fn handle_shake(&mut self, now: Instant) -> EventOutput {
        let cooldown = secs(self.config.catch_cooldown_secs);
        let cooling = self
            .last_catch
            .map_or(false, |t| now.saturating_duration_since(t) < cooldown);

        if cooling {
            // The glove still flashes; only the catch is skipped
            let fb = self.router.feedback(&GloveEvent::Shake);
            if let Some(n) = fb {
                self.feedback.flash(n, now);
            }
            self.events_emitted += 1;
            return EventOutput::new(self.router.mode(), GloveEvent::Shake, ReasonCode::R207_COOLDOWN_ACTIVE)
                .with_feedback(fb);
        }

        self.last_catch = Some(now);
        self.emit(GloveEvent::Shake, ReasonCode::R301_SHAKE_CATCH, now)
    }

    fn emit_signal(&mut self, signal: GestureSignal, now: Instant) -> EventOutput {
        self.emit(signal.event(), signal.reason(), now)
    }

    fn emit(&mut self, event: GloveEvent, reason: ReasonCode, now: Instant) -> EventOutput {
        if let GloveEvent::Lane(i) = event {
            self.current_lane = i.min(2);
        }

        let calls = self.router.route(&event);
        if !calls.is_empty() {
            debug!("[ROUTE] {} → {} ({})", event.label(), calls.join(","), ReasonCode::R403_DISPATCHED.code());
        }

        let fb = self.router.feedback(&event);
        if let Some(n) = fb {
            self.feedback.flash(n, now);
        }

        self.events_emitted += 1;
        EventOutput::new(self.router.mode(), event, reason)
            .with_calls(calls)
            .with_feedback(fb)
    }

    // =========================================================================
    // State access
    // =========================================================================

    pub fn mode(&self) -> Mode {
        self.router.mode()
    }

    pub fn scene(&self) -> &str {
        self.router.scene()
    }

    pub fn config(&self) -> &GloveConfig {
        &self.config
    }

    pub fn current_lane(&self) -> usize {
        self.current_lane
    }

    pub fn is_connected(&self) -> bool {
        self.link.as_ref().map_or(false, |l| l.is_running())
    }

    pub fn status(&self) -> ControllerStatus {
        let f = self.pose.filtered();
        ControllerStatus {
            mode: self.router.mode(),
            scene: self.router.scene().to_string(),
            connected: self.is_connected(),
            port: self.link.as_ref().map(|l| l.port_name().to_string()),
            pose_phase: self.pose.phase(),
            last_pose: self.pose.last_emitted(),
            filtered: [f.x, f.y, f.z],
            gesture: self.gestures.snapshot(),
            current_lane: self.current_lane,
            feedback_active: self.feedback.active(),
            lines_seen: self.lines_seen,
            events_emitted: self.events_emitted,
        }
    }
}

impl std::fmt::Debug for GloveController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GloveController")
            .field("mode", &self.router.mode())
            .field("scene", &self.router.scene())
            .field("link", &self.link)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
