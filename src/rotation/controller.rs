//! Rotation controller - walks one board sequence with preemption.
//!
//! A single state machine serves every mode. Per step:
//!
//! 1. Re-arm the sleep gate.
//! 2. Ask [`InterruptState::take_override`] for a preemption. The winning
//!    override board replaces the scheduled one and the cursor stays on the
//!    displaced slot, so it is shown as soon as the override is done.
//! 3. Render through the [`BoardManager`].
//! 4. After a scheduled (non-override) render the pass ends if the cursor is
//!    on the last slot; otherwise the cursor advances by one.
//!
//! A persistent signal (the screensaver) keeps winning step 2, so the
//! displaced board waits without the cursor drifting.
//!
//! A step whose board fails returns to the gate for what is left of the
//! failure back-off, so a sequence of unusable boards cannot spin.
//!
//! [`InterruptState::take_override`]: crate::interrupt::InterruptState::take_override

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::{BoardContext, BoardManager, RenderOutcome};
use crate::context::AppContext;
use crate::error::{Result, ScoreboardError};
use crate::interrupt::InterruptPolicy;
use crate::rotation::Mode;

/// What a finished pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Board ids in the order they were sent to the manager, overrides included.
    pub rendered: Vec<String>,
    /// Steps where an interrupt replaced the scheduled board.
    pub preemptions: usize,
    /// Steps whose board failed to construct, render or resolve.
    pub failures: usize,
}

/// Minimum time a failed step occupies the screen slot.
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(1);

/// Drives rotation passes for the render loop.
pub struct RotationController {
    manager: BoardManager,
    ctx: BoardContext,
    failure_backoff: Duration,
}

impl RotationController {
    pub fn new(manager: BoardManager, ctx: BoardContext) -> Self {
        Self {
            manager,
            ctx,
            failure_backoff: FAILURE_BACKOFF,
        }
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    pub fn manager(&self) -> &BoardManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut BoardManager {
        &mut self.manager
    }

    pub fn app(&self) -> &Arc<AppContext> {
        &self.ctx.app
    }

    /// Construct boards ahead of their first render.
    pub fn warm_up(&mut self, board_ids: &[String]) {
        for board_id in board_ids {
            if self.manager.initialize_eagerly(board_id, &self.ctx).is_some() {
                log::debug!("Warmed up board '{}'", board_id);
            }
        }
    }

    /// Run one pass over the sequence configured for `mode`.
    pub fn run_mode(&mut self, mode: Mode) -> Result<PassSummary> {
        let sequence = self.ctx.app.config().boards.sequence(mode).to_vec();
        log::debug!("Starting {} pass over {:?}", mode, sequence);
        self.run_pass(&sequence, mode.policy())
    }

    /// Walk `sequence` once, honoring the signals `policy` allows.
    ///
    /// Returns early (with what was rendered so far) when the application
    /// stops. An empty sequence is a configuration error.
    pub fn run_pass(&mut self, sequence: &[String], policy: InterruptPolicy) -> Result<PassSummary> {
        if sequence.is_empty() {
            return Err(ScoreboardError::Config("rotation sequence is empty".to_string()));
        }

        let interrupts = self.ctx.app.interrupts().clone();
        let last = sequence.len() - 1;
        let mut cursor = 0;
        let mut summary = PassSummary::default();

        while self.ctx.app.is_running() {
            self.ctx.gate.clear();

            let scheduled = &sequence[cursor];
            let (board_id, preempted) = match interrupts.take_override(policy, scheduled) {
                Some(over) => {
                    log::info!(
                        "{} interrupt: showing '{}' instead of '{}'",
                        over.interrupt,
                        over.board,
                        scheduled
                    );
                    (over.board, true)
                }
                None => (scheduled.clone(), false),
            };

            interrupts.set_current_board(board_id.as_str());
            let started = Instant::now();
            let failed = match self.manager.render(&board_id, &self.ctx) {
                Ok(RenderOutcome::Rendered) => false,
                Ok(_) => true,
                Err(e) => {
                    log::error!("Skipping board '{}': {}", board_id, e);
                    true
                }
            };
            if failed {
                summary.failures += 1;
                if let Some(rest) = self.failure_backoff.checked_sub(started.elapsed()) {
                    self.ctx.gate.wait(rest);
                }
            }
            summary.rendered.push(board_id);

            if preempted {
                summary.preemptions += 1;
                continue;
            }
            if cursor >= last {
                break;
            }
            cursor += 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, BoardCatalog};
    use crate::config::Config;
    use crate::display::MemoryDisplay;
    use crate::interrupt::Interrupt;
    use std::sync::Mutex;

    type Hook = Arc<dyn Fn(&AppContext, &str) + Send + Sync>;

    /// Records its id and runs an optional hook that can raise signals mid-render.
    struct Scripted {
        id: String,
        app: Arc<AppContext>,
        log: Arc<Mutex<Vec<String>>>,
        hook: Option<Hook>,
    }

    impl Board for Scripted {
        fn render(&mut self) -> Result<()> {
            self.log.lock().unwrap().push(self.id.clone());
            if let Some(hook) = &self.hook {
                hook(self.app.as_ref(), self.id.as_str());
            }
            Ok(())
        }
    }

    fn controller(ids: &[&str], hook: Option<Hook>) -> (RotationController, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut catalog = BoardCatalog::new();
        for id in ids {
            let log = log.clone();
            let hook = hook.clone();
            let id = id.to_string();
            catalog.register(id.clone(), move |ctx| {
                Ok(Scripted {
                    id: id.clone(),
                    app: ctx.app.clone(),
                    log: log.clone(),
                    hook: hook.clone(),
                })
            });
        }
        let app = Arc::new(AppContext::new(Config::default()));
        let ctx = BoardContext::new(app, Arc::new(MemoryDisplay::new()));
        let rotation = RotationController::new(BoardManager::new(catalog), ctx)
            .with_failure_backoff(Duration::from_millis(20));
        (rotation, log)
    }

    fn seq(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    const BOARDS: &[&str] = &["clock", "standings", "scoreticker", "pbdisplay", "wxalert", "screensaver"];

    #[test]
    fn test_plain_pass_visits_each_once() {
        let (mut rotation, log) = controller(BOARDS, None);
        let summary = rotation
            .run_pass(&seq(&["clock", "standings", "scoreticker"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(summary.rendered, seq(&["clock", "standings", "scoreticker"]));
        assert_eq!(summary.preemptions, 0);
        assert_eq!(*log.lock().unwrap(), seq(&["clock", "standings", "scoreticker"]));
    }

    #[test]
    fn test_single_board_pass() {
        let (mut rotation, _) = controller(BOARDS, None);
        let summary = rotation.run_pass(&seq(&["clock"]), InterruptPolicy::ALL).unwrap();
        assert_eq!(summary.rendered, seq(&["clock"]));
    }

    #[test]
    fn test_empty_sequence_is_config_error() {
        let (mut rotation, _) = controller(BOARDS, None);
        let err = rotation.run_pass(&[], InterruptPolicy::ALL).unwrap_err();
        assert!(matches!(err, ScoreboardError::Config(_)));
    }

    #[test]
    fn test_manual_override_displaces_current_slot() {
        // Button pressed while clock is on screen
        let hook: Hook = Arc::new(|app, id| {
            if id == "clock" {
                app.interrupts().raise_manual("pbdisplay");
            }
        });
        let (mut rotation, _) = controller(BOARDS, Some(hook));
        let summary = rotation
            .run_pass(&seq(&["clock", "standings", "scoreticker"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(summary.rendered, seq(&["clock", "pbdisplay", "standings", "scoreticker"]));
        assert_eq!(summary.preemptions, 1);
    }

    #[test]
    fn test_override_before_first_step() {
        let (mut rotation, _) = controller(BOARDS, None);
        rotation.app().interrupts().raise_alert();
        let summary = rotation
            .run_pass(&seq(&["clock", "standings"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(summary.rendered, seq(&["wxalert", "clock", "standings"]));
    }

    #[test]
    fn test_override_on_last_slot_still_shows_it() {
        let hook: Hook = Arc::new(|app, id| {
            if id == "standings" {
                app.interrupts().raise_remote("clock");
            }
        });
        let (mut rotation, _) = controller(BOARDS, Some(hook));
        let summary = rotation
            .run_pass(&seq(&["standings", "scoreticker"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(summary.rendered, seq(&["standings", "clock", "scoreticker"]));
    }

    #[test]
    fn test_simultaneous_signals_render_in_priority_order() {
        let (mut rotation, _) = controller(BOARDS, None);
        let interrupts = rotation.app().interrupts().clone();
        interrupts.raise_alert();
        interrupts.raise_remote("scoreticker");
        interrupts.raise_manual("pbdisplay");
        let summary = rotation
            .run_pass(&seq(&["clock", "standings"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(
            summary.rendered,
            seq(&["pbdisplay", "scoreticker", "wxalert", "clock", "standings"])
        );
        assert_eq!(summary.preemptions, 3);
    }

    #[test]
    fn test_screensaver_holds_displaced_board() {
        // The screensaver ends itself after three renders
        let count = Arc::new(Mutex::new(0));
        let hook: Hook = {
            let count = count.clone();
            Arc::new(move |app, id| {
                if id == "screensaver" {
                    let mut n = count.lock().unwrap();
                    *n += 1;
                    if *n == 3 {
                        app.interrupts().end_idle();
                    }
                }
            })
        };
        let (mut rotation, _) = controller(BOARDS, Some(hook));
        rotation.app().interrupts().begin_idle();
        let summary = rotation
            .run_pass(&seq(&["standings", "scoreticker"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(
            summary.rendered,
            seq(&["screensaver", "screensaver", "screensaver", "standings", "scoreticker"])
        );
        assert_eq!(
            rotation.app().interrupts().previous_board(),
            Some("standings".to_string())
        );
    }

    #[test]
    fn test_intermission_policy_ignores_screensaver() {
        let (mut rotation, _) = controller(BOARDS, None);
        rotation.app().interrupts().begin_idle();
        let summary = rotation
            .run_pass(&seq(&["clock", "standings"]), Mode::Intermission.policy())
            .unwrap();
        assert_eq!(summary.rendered, seq(&["clock", "standings"]));
        assert!(rotation.app().interrupts().is_active(Interrupt::Idle));
    }

    #[test]
    fn test_unknown_override_board_does_not_abort_pass() {
        let (mut rotation, _) = controller(BOARDS, None);
        rotation.app().interrupts().raise_remote("does_not_exist");
        let summary = rotation
            .run_pass(&seq(&["clock", "standings"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(summary.rendered, seq(&["does_not_exist", "clock", "standings"]));
        assert_eq!(summary.failures, 1);
    }

    #[test]
    fn test_failed_step_waits_out_backoff() {
        let (mut rotation, _) = controller(BOARDS, None);
        let started = Instant::now();
        let summary = rotation.run_pass(&seq(&["ghost", "phantom"]), InterruptPolicy::ALL).unwrap();
        assert_eq!(summary.failures, 2);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_backoff_cut_short_by_gate() {
        let (rotation, _) = controller(BOARDS, None);
        let mut rotation = rotation.with_failure_backoff(Duration::from_secs(30));
        let gate = rotation.app().gate().clone();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            gate.set();
        });
        let started = Instant::now();
        rotation.run_pass(&seq(&["ghost"]), InterruptPolicy::ALL).unwrap();
        setter.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_stopped_app_ends_pass() {
        let hook: Hook = Arc::new(|app, id| {
            if id == "standings" {
                app.stop();
            }
        });
        let (mut rotation, _) = controller(BOARDS, Some(hook));
        let summary = rotation
            .run_pass(&seq(&["clock", "standings", "scoreticker"]), InterruptPolicy::ALL)
            .unwrap();
        assert_eq!(summary.rendered, seq(&["clock", "standings"]));
    }

    #[test]
    fn test_current_board_tracks_render() {
        let (mut rotation, _) = controller(BOARDS, None);
        rotation.run_pass(&seq(&["clock", "standings"]), InterruptPolicy::ALL).unwrap();
        assert_eq!(
            rotation.app().interrupts().current_board(),
            Some("standings".to_string())
        );
    }
}
