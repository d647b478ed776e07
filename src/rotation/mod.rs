//! Board rotation - one state machine for every operating mode.
//!
//! - **Mode**: which sequence is walked and which signals it honors
//! - **RotationController**: a single pass with preemption
//! - **RenderLoop**: repeats passes and applies reloads between them

mod controller;
mod mode;
mod render_loop;

pub use controller::{PassSummary, RotationController};
pub use mode::Mode;
pub use render_loop::RenderLoop;
