//! Scoreboard - board rotation and interrupt engine for an LED scoreboard
//!
//! A single render loop walks the board sequence for the current mode,
//! while background jobs (weather, alerts, dimmer, screensaver) and input
//! drivers raise signals that preempt the rotation at the next step.

pub mod board;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod input;
pub mod interrupt;
pub mod rotation;
pub mod scheduler;
pub mod watcher;
pub mod workers;

pub use error::{Result, ScoreboardError};
