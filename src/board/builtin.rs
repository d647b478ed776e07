//! Boards that ship with the binary.
//!
//! Hardware-specific boards (scores, standings, team summaries) register
//! themselves in the catalog from outside this crate. The ones here cover
//! the fixed roles every install needs: a clock, the weather alert board,
//! the screensaver and simple text boards defined in configuration.

use chrono::Local;
use std::time::Duration;

use crate::board::{Board, BoardCatalog, BoardContext};
use crate::config::Config;
use crate::error::{Result, ScoreboardError};
use crate::interrupt::Interrupt;

/// Wait out a board's display time. Returns `true` when the gate cut it short.
fn hold(ctx: &BoardContext, seconds: u64) -> bool {
    ctx.gate.wait(Duration::from_secs(seconds))
}

/// Current time, redrawn every second.
pub struct ClockBoard {
    ctx: BoardContext,
}

impl ClockBoard {
    pub fn new(ctx: &BoardContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Board for ClockBoard {
    fn render(&mut self) -> Result<()> {
        let seconds = self.ctx.app.config().boards.display_seconds;
        for _ in 0..seconds {
            let now = Local::now();
            let lines = vec![now.format("%-I:%M %p").to_string(), now.format("%a %b %-d").to_string()];
            self.ctx.display.draw_text("clock", &lines);
            if hold(&self.ctx, 1) {
                break;
            }
        }
        Ok(())
    }
}

/// Static lines from `boards.text.<id>`, read from the live config on
/// every render so reloads apply without rebuilding the board.
pub struct TextBoard {
    id: String,
    ctx: BoardContext,
}

impl TextBoard {
    pub fn new(id: &str, ctx: &BoardContext) -> Result<Self> {
        if !ctx.app.config().boards.text.contains_key(id) {
            return Err(ScoreboardError::BoardInit {
                board: id.to_string(),
                reason: "no text configured".to_string(),
            });
        }
        Ok(Self {
            id: id.to_string(),
            ctx: ctx.clone(),
        })
    }
}

impl Board for TextBoard {
    fn render(&mut self) -> Result<()> {
        let config = self.ctx.app.config();
        let lines = config
            .boards
            .text
            .get(&self.id)
            .ok_or_else(|| ScoreboardError::Render(format!("no text configured for '{}'", self.id)))?;
        self.ctx.display.draw_text(&self.id, lines);
        hold(&self.ctx, config.boards.display_seconds);
        Ok(())
    }
}

/// Shows the latest weather alert headline.
pub struct AlertBoard {
    id: String,
    ctx: BoardContext,
}

impl AlertBoard {
    pub fn new(id: &str, ctx: &BoardContext) -> Self {
        Self {
            id: id.to_string(),
            ctx: ctx.clone(),
        }
    }
}

impl Board for AlertBoard {
    fn render(&mut self) -> Result<()> {
        let headline = self
            .ctx
            .app
            .alert_text()
            .unwrap_or_else(|| "No active alerts".to_string());
        let lines = vec!["WEATHER ALERT".to_string(), headline];
        self.ctx.display.draw_text(&self.id, &lines);
        hold(&self.ctx, self.ctx.app.config().boards.display_seconds);
        Ok(())
    }
}

/// Blank panel for as long as the screensaver episode lasts.
pub struct ScreensaverBoard {
    ctx: BoardContext,
}

impl ScreensaverBoard {
    pub fn new(ctx: &BoardContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Board for ScreensaverBoard {
    fn render(&mut self) -> Result<()> {
        self.ctx.display.clear();
        let interrupts = self.ctx.app.interrupts();
        while self.ctx.app.is_running() && interrupts.is_active(Interrupt::Idle) {
            if hold(&self.ctx, 1) {
                break;
            }
        }
        Ok(())
    }
}

/// Register the built-in boards plus one text board per `boards.text` entry.
///
/// The alert and screensaver boards register under the ids configured for
/// those roles.
pub fn register_builtins(catalog: &mut BoardCatalog, config: &Config) {
    catalog.register("clock", |ctx| Ok(ClockBoard::new(ctx)));

    let alert_id = config.boards.alert_board.clone();
    let id = alert_id.clone();
    catalog.register(alert_id, move |ctx| Ok(AlertBoard::new(&id, ctx)));

    catalog.register(config.boards.screensaver_board.clone(), |ctx| Ok(ScreensaverBoard::new(ctx)));

    for id in config.boards.text.keys() {
        let board_id = id.clone();
        catalog.register(id.clone(), move |ctx| TextBoard::new(&board_id, ctx));
    }
    log::debug!("Registered built-in boards: {:?}", catalog.ids());
}
