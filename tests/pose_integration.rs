//! Integration tests for poses - accelerometer lines through the controller
//!
//! Tests classification, dwell, the neutral gate and pose routing per mode

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gloveline::core::{GloveController, GloveEventSink, RecordingWriter, SceneBindings};
use gloveline::types::{EventOutput, GloveEvent, GloveLine, Pose, PoseTemplates};
use gloveline::GloveConfig;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Clone, Default)]
struct Moves(Arc<Mutex<Vec<&'static str>>>);

impl Moves {
    fn taken(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl GloveEventSink for Moves {
    fn glove_move_left(&mut self) {
        self.0.lock().unwrap().push("left");
    }
    fn glove_move_right(&mut self) {
        self.0.lock().unwrap().push("right");
    }
    fn glove_move_up(&mut self) {
        self.0.lock().unwrap().push("up");
    }
    fn glove_move_down(&mut self) {
        self.0.lock().unwrap().push("down");
    }
}

fn accel_line(v: glam::Vec3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

/// Send one accelerometer reading, then run `frames` frames
fn hold(c: &mut GloveController, v: glam::Vec3, now: &mut Instant, frames: u32) -> Vec<EventOutput> {
    assert!(c.inject_raw(&accel_line(v)));
    let mut out = Vec::new();
    for _ in 0..frames {
        *now += FRAME;
        out.extend(c.update(*now));
    }
    out
}

fn poses(out: &[EventOutput]) -> Vec<Pose> {
    out.iter()
        .filter_map(|e| match e.event {
            GloveEvent::Pose(p) => Some(p),
            _ => None,
        })
        .collect()
}

#[test]
fn test_minigame1_moves_once_per_pose() {
    let tpl = PoseTemplates::default();
    let moves = Moves::default();
    let mut c = GloveController::new(GloveConfig::default());
    let mut now = Instant::now();
    c.on_scene_changed("MiniGame_1", SceneBindings::with_sink(moves.clone()), now);

    let out = hold(&mut c, tpl.right, &mut now, 120);
    assert_eq!(poses(&out), vec![Pose::Right]);
    assert_eq!(out[0].calls, vec!["GloveMoveRight"]);
    assert_eq!(out[0].feedback, Some(4));
    assert_eq!(moves.taken(), vec!["right"]);
}

#[test]
fn test_neutral_gate_between_commands() {
    let tpl = PoseTemplates::default();
    let moves = Moves::default();
    let mut c = GloveController::new(GloveConfig::default());
    let mut now = Instant::now();
    c.on_scene_changed("MiniGame_4", SceneBindings::with_sink(moves.clone()), now);

    hold(&mut c, tpl.up, &mut now, 120);
    // Straight to DOWN without passing NEUTRAL: nothing
    let blocked = hold(&mut c, tpl.down, &mut now, 120);
    assert!(poses(&blocked).is_empty());

    let rearm = hold(&mut c, tpl.neutral, &mut now, 120);
    assert_eq!(poses(&rearm), vec![Pose::Neutral]);

    let down = hold(&mut c, tpl.down, &mut now, 120);
    assert_eq!(poses(&down), vec![Pose::Down]);
    assert_eq!(moves.taken(), vec!["up", "down"]);
}

#[test]
fn test_poses_ignored_in_finger_only_modes() {
    let tpl = PoseTemplates::default();
    let mut c = GloveController::new(GloveConfig::default());
    let mut now = Instant::now();
    c.on_scene_changed("MiniGame_2.1", SceneBindings::none(), now);
    let out = hold(&mut c, tpl.left, &mut now, 120);
    assert!(out.is_empty());
}

#[test]
fn test_pages_up_flashes_nothing() {
    let tpl = PoseTemplates::default();
    let rec = RecordingWriter::new();
    let mut c = GloveController::new(GloveConfig::default());
    c.set_feedback_writer(Box::new(rec.clone()));
    let mut now = Instant::now();
    c.on_scene_changed("2Page", SceneBindings::none(), now);

    let out = hold(&mut c, tpl.up, &mut now, 120);
    assert_eq!(poses(&out), vec![Pose::Up]);
    assert_eq!(out[0].feedback, None);
    assert!(rec.lines().is_empty());
}

#[test]
fn test_scene_change_clears_last_pose() {
    let tpl = PoseTemplates::default();
    let mut c = GloveController::new(GloveConfig::default());
    let mut now = Instant::now();
    c.on_scene_changed("MiniGame_1", SceneBindings::none(), now);
    assert_eq!(poses(&hold(&mut c, tpl.left, &mut now, 120)), vec![Pose::Left]);

    // Same pose, new scene: emits again
    c.on_scene_changed("MiniGame_1", SceneBindings::none(), now);
    assert_eq!(poses(&hold(&mut c, tpl.left, &mut now, 120)), vec![Pose::Left]);
}

#[test]
fn test_overflowing_reading_does_not_stall_poses() {
    let tpl = PoseTemplates::default();
    let mut c = GloveController::new(GloveConfig::default());
    let mut now = Instant::now();
    c.on_scene_changed("MiniGame_1", SceneBindings::none(), now);

    let garbled = format!("{} 1 1", "9".repeat(45));
    assert!(!c.inject_raw(&garbled));
    c.handle_line(GloveLine::Accel(glam::Vec3::new(f32::INFINITY, 0.0, 0.0)), now);

    assert_eq!(poses(&hold(&mut c, tpl.right, &mut now, 120)), vec![Pose::Right]);
    let filtered = c.status().filtered;
    assert!(filtered.iter().all(|v| v.is_finite()), "filtered {:?}", filtered);
}
