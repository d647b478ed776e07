//! Remote command input.
//!
//! A line-oriented reader (stdin by default) that turns text commands into
//! interrupt signals and mode changes:
//!
//! ```text
//! show <board>     show a board next
//! alert            raise the weather alert board
//! idle on|off      start or end a screensaver episode
//! mode <mode>      switch rotation mode (off_day, scheduled, intermission, post_game)
//! button           press the push button
//! ```

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::context::AppContext;
use crate::error::{Result, ScoreboardError};
use crate::rotation::Mode;

/// One parsed remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show(String),
    Alert,
    Idle(bool),
    Mode(Mode),
    Button,
}

impl Command {
    /// Apply to the shared state. Every command except `mode` wakes the renderer.
    pub fn apply(&self, app: &AppContext) {
        let interrupts = app.interrupts();
        match self {
            Command::Show(board) => {
                log::info!("Remote: show {}", board);
                interrupts.raise_remote(board.clone());
            }
            Command::Alert => {
                log::info!("Remote: weather alert");
                interrupts.raise_alert();
            }
            Command::Idle(true) => {
                log::info!("Remote: screensaver on");
                interrupts.begin_idle();
            }
            Command::Idle(false) => {
                log::info!("Remote: screensaver off");
                interrupts.end_idle();
            }
            Command::Mode(mode) => app.set_mode(*mode),
            Command::Button => {
                let board = app.config().boards.pushbutton_board.clone();
                log::info!("Push button pressed, showing {}", board);
                interrupts.raise_manual(board);
            }
        }
    }
}

impl FromStr for Command {
    type Err = ScoreboardError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().map(str::to_lowercase).unwrap_or_default();
        let arg = words.next();
        if words.next().is_some() {
            return Err(ScoreboardError::Config(format!("too many arguments in '{}'", line.trim())));
        }

        match (verb.as_str(), arg) {
            ("show", Some(board)) => Ok(Command::Show(board.to_string())),
            ("alert", None) => Ok(Command::Alert),
            ("idle", Some(state)) => match state.to_lowercase().as_str() {
                "on" => Ok(Command::Idle(true)),
                "off" => Ok(Command::Idle(false)),
                other => Err(ScoreboardError::Config(format!("idle expects on|off, got '{}'", other))),
            },
            ("mode", Some(mode)) => Ok(Command::Mode(mode.parse()?)),
            ("button", None) => Ok(Command::Button),
            _ => Err(ScoreboardError::Config(format!("unknown command '{}'", line.trim()))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Show(board) => write!(f, "show {}", board),
            Command::Alert => write!(f, "alert"),
            Command::Idle(on) => write!(f, "idle {}", if *on { "on" } else { "off" }),
            Command::Mode(mode) => write!(f, "mode {}", mode),
            Command::Button => write!(f, "button"),
        }
    }
}

/// Read commands until EOF or shutdown. Returns how many were applied.
pub fn read_commands<R: BufRead>(reader: R, app: &AppContext) -> usize {
    let mut applied = 0;
    for line in reader.lines() {
        if !app.is_running() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Remote input read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                command.apply(app);
                applied += 1;
            }
            Err(e) => log::warn!("Ignoring remote command: {}", e),
        }
    }
    log::debug!("Remote input closed after {} commands", applied);
    applied
}

/// Start a reader thread over `reader`.
pub fn spawn_reader<R>(reader: R, app: Arc<AppContext>) -> Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    let handle = thread::Builder::new().name("remote-input".to_string()).spawn(move || {
        read_commands(reader, &app);
    })?;
    log::info!("Remote command input enabled");
    Ok(handle)
}
