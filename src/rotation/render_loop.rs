//! Render loop - repeats rotation passes until shutdown.
//!
//! Reload notifications arrive over a channel and are applied only between
//! passes, so board cleanup never races a render of the same board.

use crossbeam_channel::{Receiver, TryRecvError};

use crate::error::Result;
use crate::rotation::RotationController;
use crate::watcher::ReloadEvent;

pub struct RenderLoop {
    controller: RotationController,
    reloads: Receiver<ReloadEvent>,
    passes: u64,
}

impl RenderLoop {
    pub fn new(controller: RotationController, reloads: Receiver<ReloadEvent>) -> Self {
        Self {
            controller,
            reloads,
            passes: 0,
        }
    }

    /// Passes completed since the loop was created.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn controller(&self) -> &RotationController {
        &self.controller
    }

    /// Run passes for the current mode until the application stops, then
    /// clean up every board.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Render loop started");
        let app = self.controller.app().clone();

        while app.is_running() {
            self.apply_reloads();
            let mode = app.mode();
            let summary = self.controller.run_mode(mode)?;
            self.passes += 1;
            log::debug!(
                "Finished {} pass: {} renders, {} preemptions, {} failures",
                mode,
                summary.rendered.len(),
                summary.preemptions,
                summary.failures
            );
        }

        self.controller.manager_mut().clear_all();
        log::info!("Render loop stopped");
        Ok(())
    }

    /// Apply every queued reload. Returns how many were applied.
    pub fn apply_reloads(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.reloads.try_recv() {
                Ok(ReloadEvent::Config) => {
                    let config = self.controller.app().config();
                    self.controller
                        .manager_mut()
                        .sync_with_config(config.boards.sequences());
                    applied += 1;
                }
                Ok(ReloadEvent::Board(board_id)) => {
                    log::info!("Board config changed, reloading '{}'", board_id);
                    self.controller.manager_mut().cleanup(&board_id);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("Reload channel closed");
                    break;
                }
            }
        }
        applied
    }
}
