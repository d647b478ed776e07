//! Application context - shared state handed to boards and workers
//!
//! AppContext owns the live configuration, the interrupt signals, the
//! current rotation mode and the run flag. It is passed unchanged to every
//! board constructor and background worker.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Config;
use crate::interrupt::{InterruptState, SleepGate};
use crate::rotation::Mode;

/// Shared state for the render loop, boards and background workers.
#[derive(Debug)]
pub struct AppContext {
    config: ArcSwap<Config>,
    interrupts: Arc<InterruptState>,
    mode: Mutex<Mode>,
    running: AtomicBool,
    alert_text: Mutex<Option<String>>,
}

impl AppContext {
    /// Create a context with a fresh sleep gate and quiet interrupt state.
    pub fn new(config: Config) -> Self {
        let gate = Arc::new(SleepGate::new());
        let interrupts = Arc::new(InterruptState::new(
            gate,
            config.boards.alert_board.clone(),
            config.boards.screensaver_board.clone(),
        ));
        Self {
            config: ArcSwap::from_pointee(config),
            interrupts,
            mode: Mutex::new(Mode::default()),
            running: AtomicBool::new(true),
            alert_text: Mutex::new(None),
        }
    }

    /// Snapshot of the live configuration.
    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Swap in a reloaded configuration.
    pub fn replace_config(&self, config: Config) {
        self.interrupts
            .set_override_boards(config.boards.alert_board.clone(), config.boards.screensaver_board.clone());
        self.config.store(Arc::new(config));
    }

    pub fn interrupts(&self) -> &Arc<InterruptState> {
        &self.interrupts
    }

    pub fn gate(&self) -> &Arc<SleepGate> {
        self.interrupts.gate()
    }

    /// Mode whose sequence the next pass walks.
    pub fn mode(&self) -> Mode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch mode; takes effect when the current pass ends.
    pub fn set_mode(&self, mode: Mode) {
        let mut current = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != mode {
            log::info!("Mode changed: {} -> {}", *current, mode);
            *current = mode;
        }
        self.interrupts.set_live_game(mode.is_live());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the render loop to exit and cut the current render short.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.gate().set();
    }

    /// Headline of the latest weather alert.
    pub fn alert_text(&self) -> Option<String> {
        self.alert_text.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_alert_text(&self, text: Option<String>) {
        *self.alert_text.lock().unwrap_or_else(PoisonError::into_inner) = text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let app = AppContext::new(Config::default());
        assert!(app.is_running());
        assert_eq!(app.mode(), Mode::OffDay);
        assert!(app.alert_text().is_none());
    }

    #[test]
    fn test_stop_sets_gate() {
        let app = AppContext::new(Config::default());
        app.stop();
        assert!(!app.is_running());
        assert!(app.gate().is_set());
    }

    #[test]
    fn test_set_mode_tracks_live_game() {
        let app = AppContext::new(Config::default());
        app.set_mode(Mode::Scheduled);
        assert!(app.interrupts().live_game());
        app.set_mode(Mode::PostGame);
        assert!(!app.interrupts().live_game());
    }

    #[test]
    fn test_replace_config_updates_override_boards() {
        let app = AppContext::new(Config::default());
        let mut config = Config::default();
        config.boards.alert_board = "alerts_v2".to_string();
        app.replace_config(config);
        assert_eq!(app.config().boards.alert_board, "alerts_v2");

        app.interrupts().raise_alert();
        let taken = app
            .interrupts()
            .take_override(crate::interrupt::InterruptPolicy::ALL, "clock")
            .unwrap();
        assert_eq!(taken.board, "alerts_v2");
    }
}
