//! Finger gesture engine
//!
//! Three producers feed finger evidence:
//! - named-finger lines set one bit directly
//! - `flex` bitfields set a bit once its bend streak reaches the confirm count
//! - `flexa` analog values go through a two-threshold hysteresis latch
//!
//! Two views are kept. The window bits are the union of all evidence since the
//! window opened and drive the choice/lane patterns. The posture vector is the
//! hand as last reported (bitfield and analog lines replace it, named fingers
//! are OR-ed in for `name_hold_secs`) and drives the thumbs-up hold.
//! The fist path runs on its own window of distinct fingers seen.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{secs, GloveConfig};
use crate::types::{Finger, FingerBits, GloveEvent, Mode, PatternRule, ReasonCode, CHOICE_PATTERNS, THUMBS_UP};
use crate::BEND_STREAK_MAX;

/// Output of the gesture engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureSignal {
    /// Choice 1..=3 (page navigation)
    Choice(u8),
    /// Lane 0..=2 (lane mini-game)
    Lane(usize),
    Fist(ReasonCode),
    ThumbsUp,
}

impl GestureSignal {
    pub fn event(&self) -> GloveEvent {
        match self {
            GestureSignal::Choice(n) => GloveEvent::Choice(*n),
            GestureSignal::Lane(i) => GloveEvent::Lane(*i),
            GestureSignal::Fist(_) => GloveEvent::Fist,
            GestureSignal::ThumbsUp => GloveEvent::ThumbsUp,
        }
    }

    pub fn reason(&self) -> ReasonCode {
        match self {
            GestureSignal::Choice(_) => ReasonCode::R201_CHOICE_MATCHED,
            GestureSignal::Lane(_) => ReasonCode::R202_LANE_MATCHED,
            GestureSignal::Fist(r) => *r,
            GestureSignal::ThumbsUp => ReasonCode::R205_THUMBS_UP_HELD,
        }
    }
}

/// Debug view for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct GestureSnapshot {
    pub window_active: bool,
    pub bits: String,
    pub posture: String,
    pub latched: String,
    pub fist_fingers_seen: usize,
    pub thumbs_up_tracking: bool,
}

#[derive(Debug, Clone)]
struct GestureTimings {
    window: Duration,
    choice_cooldown: Duration,
    lane_cooldown: Duration,
    name_hold: Duration,
    thumbs_up_hold: Duration,
    thumbs_up_cooldown: Duration,
    fist_window: Duration,
    fist_cooldown: Duration,
    mg4_fist_window: Duration,
    mg4_fist_cooldown: Duration,
}

impl GestureTimings {
    fn from_config(c: &GloveConfig) -> Self {
        Self {
            window: secs(c.gesture_window_secs),
            choice_cooldown: secs(c.choice_cooldown_secs),
            lane_cooldown: secs(c.lane_cooldown_secs),
            name_hold: secs(c.name_hold_secs),
            thumbs_up_hold: secs(c.thumbs_up_hold_secs),
            thumbs_up_cooldown: secs(c.thumbs_up_cooldown_secs),
            fist_window: secs(c.fist_window_secs),
            fist_cooldown: secs(c.fist_cooldown_secs),
            mg4_fist_window: secs(c.minigame4_fist_window_secs),
            mg4_fist_cooldown: secs(c.minigame4_fist_cooldown_secs),
        }
    }

    fn fist_window_for(&self, mode: Mode) -> Duration {
        if mode == Mode::MiniGame4 {
            self.mg4_fist_window
        } else {
            self.fist_window
        }
    }

    fn fist_cooldown_for(&self, mode: Mode) -> Duration {
        if mode == Mode::MiniGame4 {
            self.mg4_fist_cooldown
        } else {
            self.fist_cooldown
        }
    }
}

/// `true` when `last` is set and less than `cooldown` ago
fn cooling(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    last.map_or(false, |t| now.saturating_duration_since(t) < cooldown)
}

/// Finger bit vectors, windows and the fist/thumbs-up trackers
#[derive(Debug, Clone)]
pub struct FingerGestureEngine {
    timings: GestureTimings,
    confirm_count: u32,
    baseline: [i32; 5],
    bent_delta: i32,
    straight_delta: i32,
    invert_flex_bits: bool,
    finger_order: [usize; 5],

    // Pattern window
    window_start: Option<Instant>,
    bits: FingerBits,
    streaks: [u32; 5],
    latched: [bool; 5],
    last_choice: Option<Instant>,
    last_lane: Option<Instant>,

    // Fist
    fist_window_start: Option<Instant>,
    fingers_seen: BTreeSet<Finger>,
    prev_flex: FingerBits,
    last_fist: Option<Instant>,

    // Posture and thumbs-up
    posture: FingerBits,
    posture_expiry: [Option<Instant>; 5],
    thumbs_up_since: Option<Instant>,
    last_thumbs_up: Option<Instant>,
}

impl FingerGestureEngine {
    pub fn new(config: &GloveConfig) -> Self {
        Self {
            timings: GestureTimings::from_config(config),
            confirm_count: config.bend_confirm_count.max(1),
            baseline: config.straight_baseline,
            bent_delta: config.bent_delta,
            straight_delta: config.straight_delta,
            invert_flex_bits: config.invert_flex_bits,
            finger_order: config.finger_order,
            window_start: None,
            bits: FingerBits::NONE,
            streaks: [0; 5],
            latched: [false; 5],
            last_choice: None,
            last_lane: None,
            fist_window_start: None,
            fingers_seen: BTreeSet::new(),
            prev_flex: FingerBits::NONE,
            last_fist: None,
            posture: FingerBits::NONE,
            posture_expiry: [None; 5],
            thumbs_up_since: None,
            last_thumbs_up: None,
        }
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// A bare finger name: that finger is bent
    pub fn on_finger_name(&mut self, finger: Finger, mode: Mode, now: Instant) -> Vec<GestureSignal> {
        let mut out = Vec::new();

        if mode.pattern_rule() != PatternRule::Ignored {
            self.ensure_window(now);
            self.bits.set(finger, true);
            out.extend(self.check_patterns(mode, now));
        }

        // Lane names are steering, not a fist
        if mode != Mode::MiniGame3 {
            out.extend(self.note_fist_finger(finger, mode, now));
        }

        self.posture.set(finger, true);
        self.posture_expiry[finger.index()] = Some(now + self.timings.name_hold);
        out.extend(self.update_thumbs_up(self.posture, now));
        out
    }

    /// A `flex` bitfield in wire order
    pub fn on_flex_bits(&mut self, raw: [u8; 5], mode: Mode, now: Instant) -> Vec<GestureSignal> {
        let bits = self.normalize_bits(raw);
        let mut out = Vec::new();

        if mode.pattern_rule() != PatternRule::Ignored {
            self.ensure_window(now);
            for (k, bent) in bits.0.iter().enumerate() {
                if *bent {
                    self.streaks[k] = (self.streaks[k] + 1).min(BEND_STREAK_MAX);
                    if self.streaks[k] >= self.confirm_count {
                        self.bits.0[k] = true;
                    }
                } else {
                    self.streaks[k] = 0;
                }
            }
            out.extend(self.check_patterns(mode, now));
        }

        debug!("[FLEX bits] {}", bits);
        out.extend(self.update_thumbs_up(bits, now));
        self.replace_posture(bits, now);

        out.extend(self.fist_from_bits(bits, mode, now));
        out
    }

    /// A `flexa` analog frame in wire order
    pub fn on_flex_analog(&mut self, raw: [i32; 5], mode: Mode, now: Instant) -> Vec<GestureSignal> {
        let values = self.normalize_values(raw);
        let mut out = Vec::new();

        for (k, v) in values.iter().enumerate() {
            let bent_min = self.baseline[k].saturating_add(self.bent_delta);
            let straight_max = self.baseline[k].saturating_add(self.straight_delta);
            if self.latched[k] {
                if *v <= straight_max {
                    self.latched[k] = false;
                }
            } else if *v >= bent_min {
                self.latched[k] = true;
            }
        }

        if mode.pattern_rule() != PatternRule::Ignored {
            self.ensure_window(now);
            for k in 0..5 {
                if self.latched[k] {
                    self.bits.0[k] = true;
                }
            }
            out.extend(self.check_patterns(mode, now));
        }

        let latched = FingerBits(self.latched);
        debug!("[FLEXA latched] {}", latched);
        out.extend(self.update_thumbs_up(latched, now));
        self.replace_posture(latched, now);

        // The fist path wants a plain threshold, not the latch
        let mut thresholded = FingerBits::NONE;
        for (k, v) in values.iter().enumerate() {
            thresholded.0[k] = *v >= self.baseline[k].saturating_add(self.bent_delta);
        }
        out.extend(self.fist_from_bits(thresholded, mode, now));
        out
    }

    /// Per-frame expiry; call after draining the line queue
    pub fn tick(&mut self, mode: Mode, now: Instant) -> Vec<GestureSignal> {
        let mut out = Vec::new();

        for k in 0..5 {
            if let Some(exp) = self.posture_expiry[k] {
                if now > exp {
                    self.posture.0[k] = false;
                    self.posture_expiry[k] = None;
                }
            }
        }

        if self.thumbs_up_since.is_some() {
            out.extend(self.update_thumbs_up(self.posture, now));
        }

        if let Some(start) = self.window_start {
            if now.saturating_duration_since(start) > self.timings.window {
                debug!("[GESTURE] {} bits={}", ReasonCode::R206_WINDOW_EXPIRED.code(), self.bits);
                self.reset_window();
            }
        }

        if let Some(start) = self.fist_window_start {
            if now.saturating_duration_since(start) > self.timings.fist_window_for(mode) {
                self.reset_fist_window();
            }
        }

        out
    }

    // =========================================================================
    // Pattern window
    // =========================================================================

    fn ensure_window(&mut self, now: Instant) {
        if self.window_start.is_none() {
            self.window_start = Some(now);
            self.bits.clear();
            self.streaks = [0; 5];
        }
    }

    fn reset_window(&mut self) {
        self.window_start = None;
        self.bits.clear();
        self.streaks = [0; 5];
    }

    fn check_patterns(&mut self, mode: Mode, now: Instant) -> Option<GestureSignal> {
        let (last, cooldown) = match mode.pattern_rule() {
            PatternRule::Choice => (self.last_choice, self.timings.choice_cooldown),
            PatternRule::Lane => (self.last_lane, self.timings.lane_cooldown),
            PatternRule::Ignored => return None,
        };
        if cooling(last, now, cooldown) {
            return None;
        }

        let index = CHOICE_PATTERNS.iter().position(|p| p.matches(&self.bits))?;
        self.reset_window();
        match mode.pattern_rule() {
            PatternRule::Choice => {
                self.last_choice = Some(now);
                let n = index as u8 + 1;
                info!("[CHOICE] {}", n);
                Some(GestureSignal::Choice(n))
            }
            _ => {
                self.last_lane = Some(now);
                info!("[LANE] {}", index);
                Some(GestureSignal::Lane(index))
            }
        }
    }

    // =========================================================================
    // Fist
    // =========================================================================

    fn note_fist_finger(&mut self, finger: Finger, mode: Mode, now: Instant) -> Option<GestureSignal> {
        if self.fist_window_start.is_none() {
            self.fist_window_start = Some(now);
            self.fingers_seen.clear();
            debug!("[FIST] window opened by {}", finger.name());
        }
        self.fingers_seen.insert(finger);
        if self.fingers_seen.len() == Finger::ALL.len() {
            let fired = self.fire_fist(mode, now, ReasonCode::R203_FIST_WINDOW_COMPLETE);
            self.reset_fist_window();
            return fired;
        }
        None
    }

    fn fist_from_bits(&mut self, bits: FingerBits, mode: Mode, now: Instant) -> Option<GestureSignal> {
        let prev = std::mem::replace(&mut self.prev_flex, bits);

        if bits.all_bent() {
            let fired = self.fire_fist(mode, now, ReasonCode::R204_FIST_BITFIELD);
            self.reset_fist_window();
            return fired;
        }

        let mut fired = None;
        for finger in Finger::ALL {
            if !prev.get(finger) && bits.get(finger) {
                if let Some(sig) = self.note_fist_finger(finger, mode, now) {
                    fired = Some(sig);
                }
            }
        }
        fired
    }

    fn fire_fist(&mut self, mode: Mode, now: Instant, reason: ReasonCode) -> Option<GestureSignal> {
        if cooling(self.last_fist, now, self.timings.fist_cooldown_for(mode)) {
            debug!("[FIST] {}", ReasonCode::R207_COOLDOWN_ACTIVE.code());
            return None;
        }
        self.last_fist = Some(now);
        info!("[FIST] select ({})", reason.code());
        Some(GestureSignal::Fist(reason))
    }

    fn reset_fist_window(&mut self) {
        self.fist_window_start = None;
        self.fingers_seen.clear();
    }

    // =========================================================================
    // Posture and thumbs-up
    // =========================================================================

    fn replace_posture(&mut self, bits: FingerBits, now: Instant) {
        self.posture = bits;
        let expiry = Some(now + self.timings.name_hold);
        self.posture_expiry = [expiry; 5];
    }

    fn update_thumbs_up(&mut self, current: FingerBits, now: Instant) -> Option<GestureSignal> {
        if !THUMBS_UP.matches(&current) {
            self.thumbs_up_since = None;
            return None;
        }

        let Some(since) = self.thumbs_up_since else {
            debug!("[THUMBS UP] hold started");
            self.thumbs_up_since = Some(now);
            return None;
        };

        if now.saturating_duration_since(since) < self.timings.thumbs_up_hold {
            return None;
        }

        self.thumbs_up_since = None;
        if cooling(self.last_thumbs_up, now, self.timings.thumbs_up_cooldown) {
            return None;
        }
        self.last_thumbs_up = Some(now);
        info!("[THUMBS UP] triggered");
        Some(GestureSignal::ThumbsUp)
    }

    // =========================================================================
    // Wiring
    // =========================================================================

    /// Wire order → finger order, with optional inversion
    fn normalize_bits(&self, raw: [u8; 5]) -> FingerBits {
        let mut bits = FingerBits::NONE;
        for (i, src) in self.finger_order.iter().enumerate() {
            let bent = raw.get(*src).map_or(false, |v| *v != 0);
            bits.0[i] = bent != self.invert_flex_bits;
        }
        bits
    }

    fn normalize_values(&self, raw: [i32; 5]) -> [i32; 5] {
        let mut out = [0; 5];
        for (i, src) in self.finger_order.iter().enumerate() {
            out[i] = raw.get(*src).copied().unwrap_or(0);
        }
        out
    }

    // =========================================================================
    // State access
    // =========================================================================

    /// Union of evidence in the active window
    pub fn bits(&self) -> FingerBits {
        self.bits
    }

    /// Hand as last reported
    pub fn posture(&self) -> FingerBits {
        self.posture
    }

    pub fn latched(&self) -> FingerBits {
        FingerBits(self.latched)
    }

    pub fn window_active(&self) -> bool {
        self.window_start.is_some()
    }

    pub fn fist_window_active(&self) -> bool {
        self.fist_window_start.is_some()
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        GestureSnapshot {
            window_active: self.window_active(),
            bits: self.bits.to_string(),
            posture: self.posture.to_string(),
            latched: self.latched().to_string(),
            fist_fingers_seen: self.fingers_seen.len(),
            thumbs_up_tracking: self.thumbs_up_since.is_some(),
        }
    }

    /// Everything back to the never-fired condition
    pub fn reset(&mut self) {
        self.reset_window();
        self.latched = [false; 5];
        self.last_choice = None;
        self.last_lane = None;
        self.reset_fist_window();
        self.prev_flex = FingerBits::NONE;
        self.last_fist = None;
        self.posture = FingerBits::NONE;
        self.posture_expiry = [None; 5];
        self.thumbs_up_since = None;
        self.last_thumbs_up = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
