//! Mode-aware router: decoded events → game sink calls
//!
//! The host registers a `GloveEventSink` (and optionally a `PageFlow`) for each
//! scene it loads. The router never knows the concrete mini-game types; it maps
//! (mode, event) to trait calls and leaves absent targets as silent no-ops.

use tracing::{debug, info, warn};

use crate::types::{GloveEvent, Mode, ModeTable, PatternRule, Pose, ReasonCode};

/// Help toggles tried by remote sinks, highest priority first
pub const HELP_METHODS: [&str; 6] = [
    "OpenHelpPanel",
    "OpenHelp",
    "ShowHelp",
    "ToggleHelpPanel",
    "ToggleHelp",
    "TogglePanel",
];

/// Game-side receiver of glove input
///
/// Every method defaults to a no-op, so a mini-game only implements what it
/// reacts to. Methods returning `bool` report whether the target existed.
pub trait GloveEventSink: Send {
    fn glove_move_left(&mut self) {}
    fn glove_move_right(&mut self) {}
    fn glove_move_up(&mut self) {}
    fn glove_move_down(&mut self) {}
    fn glove_select_or_swap_arm(&mut self) {}
    fn glove_select(&mut self) {}
    fn on_fist(&mut self) {}
    fn spawn_rock(&mut self) {}
    fn open_help(&mut self) -> bool {
        false
    }
    fn on_choice(&mut self, _choice: u8) {}
    fn snap_to_lane(&mut self, _lane: usize) {}
    /// Returns how many items were caught
    fn catch_at_player(&mut self, _radius: f32) -> usize {
        0
    }
    fn trigger_bite_flash(&mut self) {}
    fn panel_next(&mut self) -> bool {
        false
    }
    fn panel_prev(&mut self) -> bool {
        false
    }
}

/// Scene flow for page navigation
pub trait PageFlow: Send {
    /// First story page, loaded from the home scene
    fn start_scene(&self) -> Option<String> {
        None
    }
    fn next_scene(&self) -> Option<String> {
        None
    }
    fn previous_scene(&self) -> Option<String> {
        None
    }
    fn load_scene(&mut self, scene: &str);
}

/// One call on the sink, by the method name the game exposes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkCall {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    SelectOrSwapArm,
    Select,
    Fist,
    SpawnRock,
    OpenHelp,
    Choice(u8),
    SnapToLane(usize),
    CatchAtPlayer(f32),
    TriggerBiteFlash,
    PanelNext,
    PanelPrev,
}

impl SinkCall {
    pub fn method_name(&self) -> &'static str {
        match self {
            SinkCall::MoveLeft => "GloveMoveLeft",
            SinkCall::MoveRight => "GloveMoveRight",
            SinkCall::MoveUp => "GloveMoveUp",
            SinkCall::MoveDown => "GloveMoveDown",
            SinkCall::SelectOrSwapArm => "GloveSelectOrSwapArm",
            SinkCall::Select => "GloveSelect",
            SinkCall::Fist => "OnFist",
            SinkCall::SpawnRock => "SpawnRock",
            SinkCall::OpenHelp => HELP_METHODS[0],
            SinkCall::Choice(_) => "OnChoice",
            SinkCall::SnapToLane(_) => "SnapToLane",
            SinkCall::CatchAtPlayer(_) => "CatchAtPlayer",
            SinkCall::TriggerBiteFlash => "TriggerBiteFlash",
            SinkCall::PanelNext => "OnRight",
            SinkCall::PanelPrev => "OnLeft",
        }
    }

    /// Run the call; `false` when the sink had nothing to handle it
    pub fn invoke(&self, sink: &mut dyn GloveEventSink) -> bool {
        match *self {
            SinkCall::MoveLeft => sink.glove_move_left(),
            SinkCall::MoveRight => sink.glove_move_right(),
            SinkCall::MoveUp => sink.glove_move_up(),
            SinkCall::MoveDown => sink.glove_move_down(),
            SinkCall::SelectOrSwapArm => sink.glove_select_or_swap_arm(),
            SinkCall::Select => sink.glove_select(),
            SinkCall::Fist => sink.on_fist(),
            SinkCall::SpawnRock => sink.spawn_rock(),
            SinkCall::OpenHelp => return sink.open_help(),
            SinkCall::Choice(n) => sink.on_choice(n),
            SinkCall::SnapToLane(i) => sink.snap_to_lane(i),
            SinkCall::CatchAtPlayer(r) => {
                let caught = sink.catch_at_player(r);
                if caught > 0 {
                    info!("[SHAKE] caught {} near player", caught);
                }
            }
            SinkCall::TriggerBiteFlash => sink.trigger_bite_flash(),
            SinkCall::PanelNext => return sink.panel_next(),
            SinkCall::PanelPrev => return sink.panel_prev(),
        }
        true
    }
}

/// Static (mode, event) → calls table
///
/// Page navigation on LEFT/RIGHT is not listed here; it depends on the scene
/// and the page flow and is handled by `GloveRouter::route`.
pub fn dispatch_table(mode: Mode, event: &GloveEvent, catch_radius: f32) -> Vec<SinkCall> {
    match (mode, event) {
        (Mode::MiniGame1 | Mode::MiniGame4, GloveEvent::Pose(pose)) => match pose {
            Pose::Left => vec![SinkCall::MoveLeft],
            Pose::Right => vec![SinkCall::MoveRight],
            Pose::Up => vec![SinkCall::MoveUp],
            Pose::Down => vec![SinkCall::MoveDown],
            Pose::Neutral => vec![],
        },

        (Mode::MiniGame1, GloveEvent::Fist) => vec![SinkCall::SelectOrSwapArm],
        (Mode::MiniGame2_1 | Mode::MiniGame2_2, GloveEvent::Fist) => vec![SinkCall::Fist],
        (Mode::MiniGame2_3, GloveEvent::Fist) => vec![SinkCall::SpawnRock],
        (Mode::MiniGame4, GloveEvent::Fist) => vec![SinkCall::Select],

        (_, GloveEvent::ThumbsUp) => vec![SinkCall::OpenHelp],

        (m, GloveEvent::Choice(n)) if m.pattern_rule() == PatternRule::Choice => vec![SinkCall::Choice(*n)],
        (m, GloveEvent::Lane(i)) if m.pattern_rule() == PatternRule::Lane => vec![SinkCall::SnapToLane(*i)],
        (m, GloveEvent::Shake) if m.uses_shake() => {
            vec![SinkCall::CatchAtPlayer(catch_radius), SinkCall::TriggerBiteFlash]
        }

        _ => vec![],
    }
}

/// LED sequence flashed for an event, if any
///
/// `choice_page` marks the page whose choices have their own sequences.
pub fn feedback_for(mode: Mode, event: &GloveEvent, choice_page: bool) -> Option<u8> {
    match event {
        GloveEvent::Pose(pose) => {
            if !mode.uses_poses() {
                return None;
            }
            match pose {
                Pose::Left | Pose::Right => Some(4),
                Pose::Up | Pose::Down if matches!(mode, Mode::MiniGame1 | Mode::MiniGame4) => Some(4),
                Pose::Neutral => Some(5),
                _ => None,
            }
        }
        GloveEvent::Choice(n) if mode == Mode::Pages && choice_page => match n {
            1..=3 => Some(11 + n),
            _ => None,
        },
        GloveEvent::Lane(i) if mode == Mode::MiniGame3 && *i < 3 => Some(12 + *i as u8),
        GloveEvent::Fist => match mode {
            Mode::MiniGame1 | Mode::MiniGame4 => Some(7),
            Mode::MiniGame2_1 => Some(8),
            Mode::MiniGame2_2 => Some(9),
            Mode::MiniGame2_3 => Some(10),
            _ => None,
        },
        GloveEvent::Shake if mode.uses_shake() => Some(11),
        GloveEvent::ThumbsUp => Some(5),
        _ => None,
    }
}

/// Targets registered by the host for the loaded scene
#[derive(Default)]
pub struct SceneBindings {
    pub sink: Option<Box<dyn GloveEventSink>>,
    pub flow: Option<Box<dyn PageFlow>>,
}

impl SceneBindings {
    /// No targets; every event is dropped
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: impl GloveEventSink + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            flow: None,
        }
    }

    pub fn and_flow(mut self, flow: impl PageFlow + 'static) -> Self {
        self.flow = Some(Box::new(flow));
        self
    }
}

impl std::fmt::Debug for SceneBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneBindings")
            .field("sink", &self.sink.is_some())
            .field("flow", &self.flow.is_some())
            .finish()
    }
}

/// Holds the mode, the scene and its bindings; dispatches events
#[derive(Debug)]
pub struct GloveRouter {
    table: ModeTable,
    catch_radius: f32,
    mode: Mode,
    scene: String,
    bindings: SceneBindings,
}

impl GloveRouter {
    pub fn new(table: ModeTable, catch_radius: f32) -> Self {
        Self {
            table,
            catch_radius,
            mode: Mode::default(),
            scene: String::new(),
            bindings: SceneBindings::none(),
        }
    }

    /// Switch scenes; the previous bindings are dropped
    pub fn on_scene_changed(&mut self, scene: &str, bindings: SceneBindings) -> Mode {
        self.mode = self.table.mode_for(scene);
        self.scene = scene.to_string();
        self.bindings = bindings;
        info!("[SCENE] {} → {} ({})", scene, self.mode, ReasonCode::R401_SCENE_CHANGED.code());
        self.mode
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn is_home(&self) -> bool {
        self.table.is_home(&self.scene)
    }

    pub fn has_sink(&self) -> bool {
        self.bindings.sink.is_some()
    }

    pub fn feedback(&self, event: &GloveEvent) -> Option<u8> {
        feedback_for(self.mode, event, self.table.is_choice_feedback_page(&self.scene))
    }

    /// Dispatch one event; returns the names of the calls that ran
    pub fn route(&mut self, event: &GloveEvent) -> Vec<String> {
        if self.mode == Mode::Pages {
            if let GloveEvent::Pose(pose) = event {
                return self.route_page_pose(*pose);
            }
        }

        let calls = dispatch_table(self.mode, event, self.catch_radius);
        if calls.is_empty() {
            return Vec::new();
        }

        let Some(sink) = self.bindings.sink.as_deref_mut() else {
            debug!("[ROUTE] {} in {}: {}", event.label(), self.mode, ReasonCode::R402_NO_TARGET.code());
            return Vec::new();
        };

        let mut ran = Vec::new();
        for call in calls {
            if call.invoke(sink) {
                ran.push(call.method_name().to_string());
            } else {
                debug!("[ROUTE] {} not handled", call.method_name());
            }
        }
        ran
    }

    fn route_page_pose(&mut self, pose: Pose) -> Vec<String> {
        match pose {
            Pose::Right if self.is_home() => {
                let start = self.bindings.flow.as_ref().and_then(|f| f.start_scene());
                match start {
                    Some(scene) => self.load(scene),
                    None => {
                        warn!("[PAGES] no start scene, cannot leave home");
                        Vec::new()
                    }
                }
            }
            Pose::Right => {
                if self.panel(SinkCall::PanelNext) {
                    return vec![SinkCall::PanelNext.method_name().to_string()];
                }
                match self.bindings.flow.as_ref().and_then(|f| f.next_scene()) {
                    Some(scene) => self.load(scene),
                    None => Vec::new(),
                }
            }
            Pose::Left if !self.is_home() => {
                if self.panel(SinkCall::PanelPrev) {
                    return vec![SinkCall::PanelPrev.method_name().to_string()];
                }
                match self.bindings.flow.as_ref().and_then(|f| f.previous_scene()) {
                    Some(scene) => self.load(scene),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn panel(&mut self, call: SinkCall) -> bool {
        match self.bindings.sink.as_deref_mut() {
            Some(sink) => call.invoke(sink),
            None => false,
        }
    }

    fn load(&mut self, scene: String) -> Vec<String> {
        match self.bindings.flow.as_deref_mut() {
            Some(flow) => {
                info!("[PAGES] loading {}", scene);
                flow.load_scene(&scene);
                vec![format!("LoadScene({})", scene)]
            }
            None => Vec::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
        has_panels: bool,
    }

    impl Recorder {
        fn push(&self, s: &str) {
            self.calls.lock().unwrap().push(s.to_string());
        }

        fn taken(&self) -> Vec<String> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl GloveEventSink for Recorder {
        fn glove_move_left(&mut self) {
            self.push("left");
        }
        fn glove_select_or_swap_arm(&mut self) {
            self.push("swap");
        }
        fn spawn_rock(&mut self) {
            self.push("rock");
        }
        fn panel_next(&mut self) -> bool {
            self.push("panel_next");
            self.has_panels
        }
    }

    #[derive(Clone, Default)]
    struct Flow {
        loaded: Arc<Mutex<Vec<String>>>,
    }

    impl PageFlow for Flow {
        fn start_scene(&self) -> Option<String> {
            Some("1Page".to_string())
        }
        fn next_scene(&self) -> Option<String> {
            Some("3Page".to_string())
        }
        fn load_scene(&mut self, scene: &str) {
            self.loaded.lock().unwrap().push(scene.to_string());
        }
    }

    fn router() -> GloveRouter {
        GloveRouter::new(ModeTable::default(), 0.8)
    }

    #[test]
    fn test_fist_table() {
        assert_eq!(dispatch_table(Mode::MiniGame1, &GloveEvent::Fist, 0.8), vec![SinkCall::SelectOrSwapArm]);
        assert_eq!(dispatch_table(Mode::MiniGame2_2, &GloveEvent::Fist, 0.8), vec![SinkCall::Fist]);
        assert_eq!(dispatch_table(Mode::MiniGame2_3, &GloveEvent::Fist, 0.8), vec![SinkCall::SpawnRock]);
        assert_eq!(dispatch_table(Mode::MiniGame4, &GloveEvent::Fist, 0.8), vec![SinkCall::Select]);
        assert!(dispatch_table(Mode::Pages, &GloveEvent::Fist, 0.8).is_empty());
    }

    #[test]
    fn test_help_in_every_mode() {
        for mode in [Mode::Pages, Mode::MiniGame2_1, Mode::MiniGame3] {
            assert_eq!(dispatch_table(mode, &GloveEvent::ThumbsUp, 0.8), vec![SinkCall::OpenHelp]);
        }
        assert_eq!(SinkCall::OpenHelp.method_name(), "OpenHelpPanel");
    }

    #[test]
    fn test_feedback_sequences() {
        assert_eq!(feedback_for(Mode::MiniGame1, &GloveEvent::Pose(Pose::Up), false), Some(4));
        assert_eq!(feedback_for(Mode::Pages, &GloveEvent::Pose(Pose::Up), false), None);
        assert_eq!(feedback_for(Mode::Pages, &GloveEvent::Pose(Pose::Neutral), false), Some(5));
        assert_eq!(feedback_for(Mode::Pages, &GloveEvent::Choice(2), true), Some(13));
        assert_eq!(feedback_for(Mode::Pages, &GloveEvent::Choice(2), false), None);
        assert_eq!(feedback_for(Mode::MiniGame3, &GloveEvent::Lane(2), false), Some(14));
        assert_eq!(feedback_for(Mode::MiniGame2_3, &GloveEvent::Fist, false), Some(10));
        assert_eq!(feedback_for(Mode::MiniGame3, &GloveEvent::Shake, false), Some(11));
    }

    #[test]
    fn test_route_without_sink_is_silent() {
        let mut r = router();
        r.on_scene_changed("MiniGame_1", SceneBindings::none());
        assert!(r.route(&GloveEvent::Fist).is_empty());
    }

    #[test]
    fn test_route_invokes_sink() {
        let rec = Recorder::default();
        let mut r = router();
        r.on_scene_changed("MiniGame_1", SceneBindings::with_sink(rec.clone()));
        assert_eq!(r.route(&GloveEvent::Pose(Pose::Left)), vec!["GloveMoveLeft"]);
        assert_eq!(r.route(&GloveEvent::Fist), vec!["GloveSelectOrSwapArm"]);
        assert_eq!(rec.taken(), vec!["left", "swap"]);
    }

    #[test]
    fn test_scene_change_drops_old_sink() {
        let old = Recorder::default();
        let mut r = router();
        r.on_scene_changed("MiniGame_2.3", SceneBindings::with_sink(old.clone()));
        r.on_scene_changed("MiniGame_2.3", SceneBindings::none());
        assert!(r.route(&GloveEvent::Fist).is_empty());
        assert!(old.taken().is_empty());
    }

    #[test]
    fn test_home_right_loads_start_scene() {
        let flow = Flow::default();
        let mut r = router();
        r.on_scene_changed("0Home", SceneBindings::none().and_flow(flow.clone()));
        assert_eq!(r.route(&GloveEvent::Pose(Pose::Right)), vec!["LoadScene(1Page)"]);
        assert!(r.route(&GloveEvent::Pose(Pose::Left)).is_empty());
        assert_eq!(*flow.loaded.lock().unwrap(), vec!["1Page"]);
    }

    #[test]
    fn test_page_right_prefers_panels() {
        let rec = Recorder {
            has_panels: true,
            ..Recorder::default()
        };
        let flow = Flow::default();
        let mut r = router();
        r.on_scene_changed("2Page", SceneBindings::with_sink(rec.clone()).and_flow(flow.clone()));
        assert_eq!(r.route(&GloveEvent::Pose(Pose::Right)), vec!["OnRight"]);
        assert!(flow.loaded.lock().unwrap().is_empty());
    }

    #[test]
    fn test_page_right_falls_back_to_flow() {
        let rec = Recorder::default();
        let flow = Flow::default();
        let mut r = router();
        r.on_scene_changed("2Page", SceneBindings::with_sink(rec.clone()).and_flow(flow.clone()));
        assert_eq!(r.route(&GloveEvent::Pose(Pose::Right)), vec!["LoadScene(3Page)"]);
        assert_eq!(rec.taken(), vec!["panel_next"]);
    }
}
