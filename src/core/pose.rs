//! Pose classifier: smoothed accelerometer → debounced pose events
//!
//! State machine:
//! - Idle → Candidating: classification yields a label
//! - Candidating → emit: same label for ≥ dwell and ≠ last emitted
//! - emit (non-NEUTRAL, gated mode) → AwaitingNeutral
//! - AwaitingNeutral → Idle: NEUTRAL held for ≥ neutral rearm dwell

use std::time::{Duration, Instant};

use glam::Vec3;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{secs, GloveConfig};
use crate::types::{Pose, PoseTemplates, ReasonCode};

/// Nearest-template matcher with a per-axis tolerance box
#[derive(Debug, Clone)]
pub struct PoseClassifier {
    templates: PoseTemplates,
    tolerance: f32,
}

impl PoseClassifier {
    pub fn new(templates: PoseTemplates, tolerance: f32) -> Self {
        Self {
            templates,
            tolerance,
        }
    }

    /// Best in-box template and its summed absolute error
    pub fn classify(&self, v: Vec3) -> Option<(Pose, f32)> {
        let mut best: Option<(Pose, f32)> = None;
        for pose in Pose::EVALUATION_ORDER {
            let delta = (v - self.templates.get(pose)).abs();
            // NaN compares false, so it never lands in a box
            if !delta.cmple(Vec3::splat(self.tolerance)).all() {
                continue;
            }
            let err = delta.element_sum();
            // strict < keeps the earlier template on a tie
            if best.map_or(true, |(_, e)| err < e) {
                best = Some((pose, err));
            }
        }
        best
    }

    pub fn templates(&self) -> &PoseTemplates {
        &self.templates
    }
}

/// Observable phase of the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "pose", rename_all = "snake_case")]
pub enum PosePhase {
    Idle,
    Candidating(Pose),
    AwaitingNeutral,
}

/// Smoothing, dwell confirmation and the neutral re-arm gate
#[derive(Debug, Clone)]
pub struct PoseTracker {
    classifier: PoseClassifier,
    alpha: f32,
    dwell: Duration,
    neutral_rearm: Duration,
    /// Latest raw sample; `None` until the first accelerometer line
    raw: Option<Vec3>,
    filtered: Vec3,
    candidate: Option<(Pose, Instant)>,
    last_emitted: Option<Pose>,
    gate_armed: bool,
    neutral_since: Option<Instant>,
}

impl PoseTracker {
    pub fn new(config: &GloveConfig) -> Self {
        Self {
            classifier: PoseClassifier::new(config.templates, config.tolerance),
            alpha: config.alpha,
            dwell: secs(config.dwell_time_secs),
            neutral_rearm: secs(config.neutral_rearm_dwell_secs),
            raw: None,
            filtered: Vec3::ZERO,
            candidate: None,
            last_emitted: None,
            gate_armed: false,
            neutral_since: None,
        }
    }

    /// Store the latest raw accelerometer sample; non-finite samples are dropped
    pub fn set_sample(&mut self, raw: Vec3) {
        if !raw.is_finite() {
            debug!("[POSE] {} non-finite sample {:?}", ReasonCode::R503_LINE_DROPPED.code(), raw);
            return;
        }
        self.raw = Some(raw);
    }

    /// Blend, classify and advance; returns a pose to emit
    ///
    /// `gated` enables the neutral re-arm gate for the current mode.
    pub fn tick(&mut self, now: Instant, gated: bool) -> Option<Pose> {
        let raw = self.raw?;
        self.filtered = self.filtered.lerp(raw, self.alpha);
        let matched = self.classifier.classify(self.filtered).map(|(p, _)| p);

        if gated && self.gate_armed {
            if matched == Some(Pose::Neutral) {
                let since = *self.neutral_since.get_or_insert(now);
                if now.duration_since(since) >= self.neutral_rearm {
                    debug!("[POSE] re-armed after NEUTRAL ({})", ReasonCode::R103_POSE_REARMED.code());
                    self.gate_armed = false;
                    self.neutral_since = None;
                    self.candidate = None;
                }
            } else {
                self.neutral_since = None;
            }
            return None;
        }

        let Some(pose) = matched else {
            self.candidate = None;
            return None;
        };

        match self.candidate {
            Some((c, since)) if c == pose => {
                if now.duration_since(since) >= self.dwell && self.last_emitted != Some(pose) {
                    self.last_emitted = Some(pose);
                    info!("[POSE] {}", pose);
                    if gated && pose != Pose::Neutral {
                        self.gate_armed = true;
                        self.neutral_since = None;
                        debug!("[POSE] {}", ReasonCode::R102_POSE_AWAITING_NEUTRAL.code());
                    }
                    return Some(pose);
                }
                None
            }
            _ => {
                self.candidate = Some((pose, now));
                None
            }
        }
    }

    pub fn phase(&self) -> PosePhase {
        if self.gate_armed {
            PosePhase::AwaitingNeutral
        } else if let Some((p, _)) = self.candidate {
            PosePhase::Candidating(p)
        } else {
            PosePhase::Idle
        }
    }

    pub fn filtered(&self) -> Vec3 {
        self.filtered
    }

    pub fn last_emitted(&self) -> Option<Pose> {
        self.last_emitted
    }

    pub fn classifier(&self) -> &PoseClassifier {
        &self.classifier
    }

    /// Back to the never-fired condition; the smoothed vector is kept
    pub fn reset(&mut self) {
        self.candidate = None;
        self.last_emitted = None;
        self.gate_armed = false;
        self.neutral_since = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
