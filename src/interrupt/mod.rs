//! Interrupt channel between background producers and the render loop.
//!
//! - **SleepGate**: manual-reset wait that board renders block on.
//! - **InterruptState**: priority-ordered override signals.

mod gate;
mod state;

pub use gate::SleepGate;
pub use state::{Interrupt, InterruptPolicy, InterruptState, Override};
