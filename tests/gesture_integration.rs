//! Integration tests for finger gestures - raw lines through the controller
//!
//! Tests choices, lanes, fist, thumbs-up and window expiry end to end

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gloveline::core::{GloveController, GloveEventSink, RecordingWriter, SceneBindings};
use gloveline::types::{EventOutput, GloveEvent, ReasonCode};
use gloveline::GloveConfig;
use pretty_assertions::assert_eq;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[derive(Clone, Default)]
struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    fn push(&self, s: String) {
        self.0.lock().unwrap().push(s);
    }

    fn taken(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl GloveEventSink for Calls {
    fn on_choice(&mut self, choice: u8) {
        self.push(format!("choice {}", choice));
    }
    fn snap_to_lane(&mut self, lane: usize) {
        self.push(format!("lane {}", lane));
    }
    fn glove_select(&mut self) {
        self.push("select".to_string());
    }
    fn spawn_rock(&mut self) {
        self.push("rock".to_string());
    }
    fn on_fist(&mut self) {
        self.push("fist".to_string());
    }
    fn open_help(&mut self) -> bool {
        self.push("help".to_string());
        true
    }
}

struct Rig {
    controller: GloveController,
    calls: Calls,
    feedback: RecordingWriter,
    now: Instant,
}

impl Rig {
    fn new(scene: &str) -> Self {
        let calls = Calls::default();
        let feedback = RecordingWriter::new();
        let mut controller = GloveController::new(GloveConfig::default());
        controller.set_feedback_writer(Box::new(feedback.clone()));
        let now = Instant::now();
        controller.on_scene_changed(scene, SceneBindings::with_sink(calls.clone()), now);
        Self {
            controller,
            calls,
            feedback,
            now,
        }
    }

    /// One line, one frame 20 ms later
    fn line(&mut self, raw: &str) -> Vec<EventOutput> {
        assert!(self.controller.inject_raw(raw), "line rejected: {}", raw);
        self.now += ms(20);
        self.controller.update(self.now)
    }

    fn wait(&mut self, total: Duration) -> Vec<EventOutput> {
        let end = self.now + total;
        let mut out = Vec::new();
        while self.now < end {
            self.now += ms(16);
            out.extend(self.controller.update(self.now));
        }
        out
    }
}

fn events(out: &[EventOutput]) -> Vec<GloveEvent> {
    out.iter().map(|e| e.event).collect()
}

#[test]
fn test_bitfield_choices_on_page_three() {
    for (raw, n, seq) in [("flex 1 0 1 1 1", 1, "S 12"), ("flex 1 0 0 1 1", 2, "S 13"), ("flex 1 1 0 0 0", 3, "S 14")] {
        let mut rig = Rig::new("3Page");
        assert!(rig.line(raw).is_empty(), "first sample is not confirmed");
        let out = rig.line(raw);
        assert_eq!(events(&out), vec![GloveEvent::Choice(n)]);
        assert_eq!(rig.calls.taken(), vec![format!("choice {}", n)]);
        assert_eq!(rig.feedback.lines(), vec![seq]);
    }
}

#[test]
fn test_choice_without_feedback_off_page_three() {
    let mut rig = Rig::new("5Page");
    rig.line("flex 1 0 1 1 1");
    let out = rig.line("flex 1 0 1 1 1");
    assert_eq!(events(&out), vec![GloveEvent::Choice(1)]);
    assert_eq!(out[0].feedback, None);
    assert!(rig.feedback.lines().is_empty());
}

#[test]
fn test_analog_choice() {
    let mut rig = Rig::new("1Page");
    // thumb, middle, ring, pinkie well past baseline + 180; index flat
    let out = rig.line("flexa 500 260 500 500 500");
    assert_eq!(events(&out), vec![GloveEvent::Choice(1)]);
}

#[test]
fn test_lane_snap_in_minigame3() {
    let mut rig = Rig::new("MiniGame_3");
    assert_eq!(rig.calls.taken(), vec!["lane 0"], "scene load snaps to lane 0");

    rig.line("flex 1 0 0 1 1");
    let out = rig.line("flex 1 0 0 1 1");
    assert_eq!(events(&out), vec![GloveEvent::Lane(1)]);
    assert_eq!(rig.calls.taken(), vec!["lane 1"]);
    assert_eq!(rig.controller.current_lane(), 1);
    assert_eq!(rig.feedback.lines(), vec!["S 13"]);
}

#[test]
fn test_named_fist_fires_once_within_cooldown() {
    let mut rig = Rig::new("MiniGame_4_Slider");
    let mut out = Vec::new();
    for name in ["thumb", "index", "middle", "ring", "pinkie"] {
        out.extend(rig.line(name));
    }
    assert_eq!(events(&out), vec![GloveEvent::Fist]);
    assert_eq!(out[0].reason, ReasonCode::R203_FIST_WINDOW_COMPLETE);
    assert_eq!(out[0].feedback, Some(7));
    assert_eq!(rig.calls.taken(), vec!["select"]);

    // Still inside the 0.5 s MiniGame4 cooldown
    let again = rig.line("flex 1 1 1 1 1");
    assert!(again.is_empty());

    rig.wait(ms(600));
    let later = rig.line("flex 1 1 1 1 1");
    assert_eq!(events(&later), vec![GloveEvent::Fist]);
}

#[test]
fn test_bitfield_fist_spawns_rock() {
    let mut rig = Rig::new("MiniGame_2.3");
    let out = rig.line("flex 1 1 1 1 1");
    assert_eq!(out[0].reason, ReasonCode::R204_FIST_BITFIELD);
    assert_eq!(out[0].calls, vec!["SpawnRock"]);
    assert_eq!(rig.feedback.lines(), vec!["S 10"]);
}

#[test]
fn test_analog_fist_uses_plain_threshold() {
    let mut rig = Rig::new("MiniGame_2.1");
    let out = rig.line("flexa 500 500 500 500 500");
    assert_eq!(events(&out), vec![GloveEvent::Fist]);
    assert_eq!(out[0].calls, vec!["OnFist"]);
    assert_eq!(rig.calls.taken(), vec!["fist"]);
    assert_eq!(rig.feedback.lines(), vec!["S 8"]);

    // Inside the 0.75 s cooldown
    assert!(rig.line("flexa 500 500 500 500 500").is_empty());

    rig.wait(ms(800));
    // Above every straight threshold, below every bent one: the latches hold,
    // the fist path sees five straight fingers
    assert!(rig.line("flexa 320 320 320 320 320").is_empty());
    assert_eq!(rig.controller.status().gesture.latched, "11111");

    let again = rig.line("flexa 500 500 500 500 500");
    assert_eq!(events(&again), vec![GloveEvent::Fist]);
}

#[test]
fn test_names_steer_lanes_without_fist() {
    let mut rig = Rig::new("MiniGame_3");
    rig.calls.taken();
    let mut out = Vec::new();
    for name in ["thumb", "index", "middle", "ring", "pinkie"] {
        out.extend(rig.line(name));
    }
    assert_eq!(events(&out), vec![GloveEvent::Lane(2)]);
    assert_eq!(rig.calls.taken(), vec!["lane 2"]);
}

#[test]
fn test_thumbs_up_opens_help() {
    let mut rig = Rig::new("MiniGame_2.2");
    assert!(rig.line("flex 0 1 1 1 1").is_empty());
    let out = rig.wait(ms(600));
    assert_eq!(events(&out), vec![GloveEvent::ThumbsUp]);
    assert_eq!(out[0].calls, vec!["OpenHelpPanel"]);
    assert_eq!(rig.calls.taken(), vec!["help"]);
    assert_eq!(rig.feedback.lines(), vec!["S 5"]);
}

#[test]
fn test_thumbs_up_broken_before_hold() {
    let mut rig = Rig::new("MiniGame_2.2");
    rig.line("flex 0 1 1 1 1");
    rig.wait(ms(200));
    rig.line("flex 0 0 0 0 0");
    let out = rig.wait(ms(800));
    assert!(!events(&out).contains(&GloveEvent::ThumbsUp));
}

#[test]
fn test_partial_window_expires_then_matches() {
    let mut rig = Rig::new("2Page");
    // middle alone matches nothing; if the window lingered, thumb+index would
    // join it and miss choice 3
    assert!(rig.line("middle").is_empty());
    rig.wait(ms(700));

    assert!(rig.line("thumb").is_empty());
    let out = rig.line("index");
    assert_eq!(events(&out), vec![GloveEvent::Choice(3)]);
}
