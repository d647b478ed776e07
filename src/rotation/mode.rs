//! Rotation modes and their interrupt policies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScoreboardError;
use crate::interrupt::InterruptPolicy;

/// Operating mode; decides which board sequence is walked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No game today
    #[default]
    OffDay,
    /// Game scheduled or in progress
    Scheduled,
    /// Between periods
    Intermission,
    /// Game over
    PostGame,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::OffDay, Mode::Scheduled, Mode::Intermission, Mode::PostGame];

    /// Signals this mode lets through. The screensaver never interrupts an intermission.
    pub fn policy(self) -> InterruptPolicy {
        match self {
            Mode::Intermission => InterruptPolicy::NO_IDLE,
            _ => InterruptPolicy::ALL,
        }
    }

    /// Whether a game is scheduled or being played.
    pub fn is_live(self) -> bool {
        matches!(self, Mode::Scheduled | Mode::Intermission)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::OffDay => "off_day",
            Mode::Scheduled => "scheduled",
            Mode::Intermission => "intermission",
            Mode::PostGame => "post_game",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ScoreboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "off_day" | "offday" | "idle" => Ok(Mode::OffDay),
            "scheduled" | "live" => Ok(Mode::Scheduled),
            "intermission" => Ok(Mode::Intermission),
            "post_game" | "postgame" => Ok(Mode::PostGame),
            other => Err(ScoreboardError::Config(format!("unknown mode '{}'", other))),
        }
    }
}
