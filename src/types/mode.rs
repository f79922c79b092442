//! Active game mode and the scene-name table that selects it

use serde::{Deserialize, Serialize};

/// Which scene family is active; decides routing and gesture rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Story pages and the home menu
    #[default]
    Pages,
    /// Berry match-3
    MiniGame1,
    /// Beehive shaking
    MiniGame2_1,
    /// Squirrel rhythm jump
    MiniGame2_2,
    /// Beehive rock throw
    MiniGame2_3,
    /// Three-lane leaf catching
    MiniGame3,
    /// Sliding-tile puzzle
    MiniGame4,
}

/// What the finger patterns mean in a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRule {
    /// Patterns emit numbered choices
    Choice,
    /// Patterns snap the player to a lane
    Lane,
    /// Patterns are not evaluated
    Ignored,
}

impl Mode {
    /// Accelerometer poses are decoded in this mode
    pub fn uses_poses(&self) -> bool {
        matches!(self, Mode::Pages | Mode::MiniGame1 | Mode::MiniGame4)
    }

    /// A non-NEUTRAL pose must be followed by NEUTRAL before the next one
    pub fn requires_neutral_gate(&self) -> bool {
        matches!(self, Mode::Pages | Mode::MiniGame1 | Mode::MiniGame4)
    }

    pub fn pattern_rule(&self) -> PatternRule {
        match self {
            Mode::Pages => PatternRule::Choice,
            Mode::MiniGame3 => PatternRule::Lane,
            _ => PatternRule::Ignored,
        }
    }

    /// `shake` lines mean something here
    pub fn uses_shake(&self) -> bool {
        *self == Mode::MiniGame3
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Pages => "Pages",
            Mode::MiniGame1 => "MiniGame1",
            Mode::MiniGame2_1 => "MiniGame2_1",
            Mode::MiniGame2_2 => "MiniGame2_2",
            Mode::MiniGame2_3 => "MiniGame2_3",
            Mode::MiniGame3 => "MiniGame3",
            Mode::MiniGame4 => "MiniGame4",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One scene-name substring rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRule {
    pub pattern: String,
    pub mode: Mode,
}

impl ModeRule {
    pub fn new(pattern: impl Into<String>, mode: Mode) -> Self {
        Self {
            pattern: pattern.into(),
            mode,
        }
    }
}

/// Scene name → mode, first matching rule wins, `Pages` otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeTable {
    pub rules: Vec<ModeRule>,
    /// Substrings marking the home/menu scene
    pub home_markers: Vec<String>,
    /// Substring of the page whose choices flash the glove
    pub choice_feedback_marker: String,
}

impl Default for ModeTable {
    fn default() -> Self {
        Self {
            rules: vec![
                ModeRule::new("minigame_1", Mode::MiniGame1),
                ModeRule::new("minigame_2.1", Mode::MiniGame2_1),
                ModeRule::new("minigame_2_1", Mode::MiniGame2_1),
                ModeRule::new("minigame_2.2", Mode::MiniGame2_2),
                ModeRule::new("minigame_2_2", Mode::MiniGame2_2),
                ModeRule::new("minigame_2.3", Mode::MiniGame2_3),
                ModeRule::new("minigame_2_3", Mode::MiniGame2_3),
                ModeRule::new("minigame_3", Mode::MiniGame3),
                ModeRule::new("minigame_4", Mode::MiniGame4),
            ],
            home_markers: vec!["home".to_string(), "menu".to_string(), "start".to_string()],
            choice_feedback_marker: "3page".to_string(),
        }
    }
}

impl ModeTable {
    pub fn mode_for(&self, scene: &str) -> Mode {
        let s = scene.to_lowercase();
        self.rules
            .iter()
            .find(|r| s.contains(&r.pattern.to_lowercase()))
            .map(|r| r.mode)
            .unwrap_or_default()
    }

    pub fn is_home(&self, scene: &str) -> bool {
        let s = scene.to_lowercase();
        self.home_markers.iter().any(|m| s.contains(&m.to_lowercase()))
    }

    pub fn is_choice_feedback_page(&self, scene: &str) -> bool {
        !self.choice_feedback_marker.is_empty()
            && scene.to_lowercase().contains(&self.choice_feedback_marker.to_lowercase())
    }
}
