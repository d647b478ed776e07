//! Boards - self-contained render units shown in rotation.
//!
//! - **Board / LegacyBoard**: the render capability (`render` or the older `draw`)
//! - **BoardCatalog**: board id -> constructor, fixed at startup
//! - **BoardManager**: lazy construction, caching and cleanup of instances
//! - **builtin**: boards that ship with the binary

use std::sync::Arc;

use crate::context::AppContext;
use crate::display::Display;
use crate::error::Result;
use crate::interrupt::SleepGate;

pub mod builtin;
mod catalog;
mod manager;

pub use catalog::{BoardCatalog, BoardConstructor};
pub use manager::{BoardManager, RenderOutcome};

/// A render unit. `render` blocks until the board's display time elapses
/// or the sleep gate is set.
pub trait Board: Send {
    fn render(&mut self) -> Result<()>;

    /// Release resources before the instance is dropped.
    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Older boards that expose `draw` instead of `render`.
pub trait LegacyBoard: Send {
    fn draw(&mut self) -> Result<()>;

    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A constructed board of either flavor.
pub enum BoardInstance {
    Render(Box<dyn Board>),
    Draw(Box<dyn LegacyBoard>),
}

impl BoardInstance {
    /// Put the board on screen through whichever capability it has.
    pub fn show(&mut self) -> Result<()> {
        match self {
            BoardInstance::Render(board) => board.render(),
            BoardInstance::Draw(board) => board.draw(),
        }
    }

    pub fn cleanup(&mut self) -> Result<()> {
        match self {
            BoardInstance::Render(board) => board.cleanup(),
            BoardInstance::Draw(board) => board.cleanup(),
        }
    }
}

/// Everything a board constructor receives.
#[derive(Clone)]
pub struct BoardContext {
    pub app: Arc<AppContext>,
    pub display: Arc<dyn Display>,
    pub gate: Arc<SleepGate>,
}

impl BoardContext {
    pub fn new(app: Arc<AppContext>, display: Arc<dyn Display>) -> Self {
        let gate = app.gate().clone();
        Self { app, display, gate }
    }
}
