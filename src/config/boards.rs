//! Board rotation settings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, ScoreboardError};
use crate::rotation::Mode;

/// Per-mode rotation sequences and the boards used by overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardsConfig {
    /// Shown when no game is scheduled today.
    pub off_day: Vec<String>,

    /// Shown while a game is scheduled or live.
    pub scheduled: Vec<String>,

    /// Shown during an intermission.
    pub intermission: Vec<String>,

    /// Shown after the game ends.
    pub post_game: Vec<String>,

    /// Board shown when the push button fires.
    pub pushbutton_board: String,

    /// Board shown for a weather alert.
    pub alert_board: String,

    /// Board shown for the screensaver episode.
    pub screensaver_board: String,

    /// How long each built-in board stays on screen.
    pub display_seconds: u64,

    /// Static text boards: board id -> lines.
    pub text: BTreeMap<String, Vec<String>>,
}

impl Default for BoardsConfig {
    fn default() -> Self {
        let clock = vec!["clock".to_string()];
        Self {
            off_day: clock.clone(),
            scheduled: clock.clone(),
            intermission: clock.clone(),
            post_game: clock,
            pushbutton_board: "clock".to_string(),
            alert_board: "wxalert".to_string(),
            screensaver_board: "screensaver".to_string(),
            display_seconds: 10,
            text: BTreeMap::new(),
        }
    }
}

impl BoardsConfig {
    /// Rotation sequence for a mode.
    pub fn sequence(&self, mode: Mode) -> &[String] {
        match mode {
            Mode::OffDay => &self.off_day,
            Mode::Scheduled => &self.scheduled,
            Mode::Intermission => &self.intermission,
            Mode::PostGame => &self.post_game,
        }
    }

    /// All rotation sequences, one per mode.
    pub fn sequences(&self) -> Vec<&[String]> {
        Mode::ALL.iter().map(|mode| self.sequence(*mode)).collect()
    }

    /// Every board id the configuration can put on screen.
    pub fn referenced_ids(&self) -> BTreeSet<String> {
        let mut ids: BTreeSet<String> = self.sequences().into_iter().flatten().cloned().collect();
        ids.insert(self.pushbutton_board.clone());
        ids.insert(self.alert_board.clone());
        ids.insert(self.screensaver_board.clone());
        ids
    }

    /// Reject empty sequences and blank override ids.
    pub fn validate(&self) -> Result<()> {
        for mode in Mode::ALL {
            if self.sequence(mode).is_empty() {
                return Err(ScoreboardError::Config(format!("boards.{} must list at least one board", mode)));
            }
        }
        for (name, id) in [
            ("pushbutton_board", &self.pushbutton_board),
            ("alert_board", &self.alert_board),
            ("screensaver_board", &self.screensaver_board),
        ] {
            if id.trim().is_empty() {
                return Err(ScoreboardError::Config(format!("boards.{} must not be empty", name)));
            }
        }
        if self.display_seconds == 0 {
            return Err(ScoreboardError::Config("boards.display_seconds must be > 0".to_string()));
        }
        Ok(())
    }
}
