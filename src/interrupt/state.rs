//! Interrupt signals that preempt the board rotation.
//!
//! Input drivers and background workers raise signals here; the rotation
//! consults [`InterruptState::take_override`] at every step. All priority and
//! consumption rules live in this file.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::interrupt::SleepGate;

/// One interrupt source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupt {
    /// Push button, shows a named board
    Manual,
    /// Remote command, shows a named board
    Remote,
    /// Weather alert, shows the alert board
    Alert,
    /// Screensaver episode, shows the screensaver board
    Idle,
}

impl Interrupt {
    /// Evaluation order, highest priority first.
    pub const PRIORITY: [Interrupt; 4] = [Interrupt::Manual, Interrupt::Remote, Interrupt::Alert, Interrupt::Idle];
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interrupt::Manual => "manual",
            Interrupt::Remote => "remote",
            Interrupt::Alert => "alert",
            Interrupt::Idle => "idle",
        };
        write!(f, "{}", name)
    }
}

/// Which signals a rotation mode honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptPolicy {
    /// Whether the screensaver may interrupt this mode.
    pub honor_idle: bool,
}

impl InterruptPolicy {
    pub const ALL: InterruptPolicy = InterruptPolicy { honor_idle: true };
    pub const NO_IDLE: InterruptPolicy = InterruptPolicy { honor_idle: false };

    /// Whether this policy considers the given signal.
    pub fn honors(&self, interrupt: Interrupt) -> bool {
        interrupt != Interrupt::Idle || self.honor_idle
    }
}

impl Default for InterruptPolicy {
    fn default() -> Self {
        Self::ALL
    }
}

/// A preemption decided for one rotation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub interrupt: Interrupt,
    pub board: String,
}

#[derive(Debug, Default)]
struct Signals {
    manual: Option<String>,
    remote: Option<String>,
    alert: bool,
    idle: bool,
    alert_board: String,
    screensaver_board: String,
    current_board: Option<String>,
    previous_board: Option<String>,
    live_game: bool,
}

impl Signals {
    fn is_active(&self, interrupt: Interrupt) -> bool {
        match interrupt {
            Interrupt::Manual => self.manual.is_some(),
            Interrupt::Remote => self.remote.is_some(),
            Interrupt::Alert => self.alert,
            Interrupt::Idle => self.idle,
        }
    }
}

/// Shared interrupt signals plus the sleep gate they pair with.
#[derive(Debug)]
pub struct InterruptState {
    signals: Mutex<Signals>,
    gate: Arc<SleepGate>,
}

impl InterruptState {
    /// Create a state with no signals raised.
    pub fn new(gate: Arc<SleepGate>, alert_board: impl Into<String>, screensaver_board: impl Into<String>) -> Self {
        Self {
            signals: Mutex::new(Signals {
                alert_board: alert_board.into(),
                screensaver_board: screensaver_board.into(),
                ..Default::default()
            }),
            gate,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Signals> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The sleep gate renderers wait on.
    pub fn gate(&self) -> &Arc<SleepGate> {
        &self.gate
    }

    /// Replace the fixed alert and screensaver boards (config reload).
    pub fn set_override_boards(&self, alert_board: impl Into<String>, screensaver_board: impl Into<String>) {
        let mut signals = self.lock();
        signals.alert_board = alert_board.into();
        signals.screensaver_board = screensaver_board.into();
    }

    /// Push button pressed: show `board` next.
    pub fn raise_manual(&self, board: impl Into<String>) {
        self.lock().manual = Some(board.into());
        self.gate.set();
    }

    /// Remote command: show `board` next.
    pub fn raise_remote(&self, board: impl Into<String>) {
        self.lock().remote = Some(board.into());
        self.gate.set();
    }

    /// A new weather alert arrived.
    pub fn raise_alert(&self) {
        self.lock().alert = true;
        self.gate.set();
    }

    /// Start a screensaver episode. The signal stays raised until [`end_idle`](Self::end_idle).
    pub fn begin_idle(&self) {
        self.lock().idle = true;
        self.gate.set();
    }

    /// End the screensaver episode and wake the renderer.
    pub fn end_idle(&self) {
        self.lock().idle = false;
        self.gate.set();
    }

    /// Drop a signal without waking anyone.
    pub fn clear(&self, interrupt: Interrupt) {
        let mut signals = self.lock();
        match interrupt {
            Interrupt::Manual => signals.manual = None,
            Interrupt::Remote => signals.remote = None,
            Interrupt::Alert => signals.alert = false,
            Interrupt::Idle => signals.idle = false,
        }
    }

    /// Whether a signal is raised.
    pub fn is_active(&self, interrupt: Interrupt) -> bool {
        self.lock().is_active(interrupt)
    }

    /// Whether any signal honored by `policy` is raised.
    pub fn any_active(&self, policy: InterruptPolicy) -> bool {
        let signals = self.lock();
        Interrupt::PRIORITY
            .iter()
            .any(|interrupt| policy.honors(*interrupt) && signals.is_active(*interrupt))
    }

    /// Pick the highest-priority raised signal for this step.
    ///
    /// The winning signal is consumed, except `Idle`, which lasts for the
    /// whole screensaver episode. When `Idle` wins, `displaced` is recorded
    /// as the board to resume after the episode.
    pub fn take_override(&self, policy: InterruptPolicy, displaced: &str) -> Option<Override> {
        let mut signals = self.lock();
        let interrupt = Interrupt::PRIORITY
            .into_iter()
            .find(|interrupt| policy.honors(*interrupt) && signals.is_active(*interrupt))?;

        let board = match interrupt {
            Interrupt::Manual => signals.manual.take().unwrap_or_default(),
            Interrupt::Remote => signals.remote.take().unwrap_or_default(),
            Interrupt::Alert => {
                signals.alert = false;
                signals.alert_board.clone()
            }
            Interrupt::Idle => {
                signals.previous_board = Some(displaced.to_string());
                signals.screensaver_board.clone()
            }
        };
        Some(Override { interrupt, board })
    }

    /// Record the board now on screen.
    pub fn set_current_board(&self, board: impl Into<String>) {
        self.lock().current_board = Some(board.into());
    }

    /// Board now on screen, if any has rendered yet.
    pub fn current_board(&self) -> Option<String> {
        self.lock().current_board.clone()
    }

    /// Board displaced by the most recent screensaver episode.
    pub fn previous_board(&self) -> Option<String> {
        self.lock().previous_board.clone()
    }

    /// Mark whether a game is scheduled or live (the screensaver defers while set).
    pub fn set_live_game(&self, live: bool) {
        self.lock().live_game = live;
    }

    /// Whether a game is scheduled or live.
    pub fn live_game(&self) -> bool {
        self.lock().live_game
    }
}
