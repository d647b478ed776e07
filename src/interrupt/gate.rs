//! Sleep gate - a manual-reset wait primitive shared by every renderer.
//!
//! Boards pause between frames with [`SleepGate::wait`]. Any producer can
//! cut every outstanding wait short with [`SleepGate::set`]; the gate stays
//! set (waits return immediately) until someone calls [`SleepGate::clear`].

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Cancellable, manual-reset wait shared across threads.
#[derive(Debug, Default)]
pub struct SleepGate {
    state: Mutex<bool>,
    cond: Condvar,
}

impl SleepGate {
    /// Create a cleared gate.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake every waiter. Idempotent and safe with no waiters.
    pub fn set(&self) {
        let mut state = self.lock();
        *state = true;
        self.cond.notify_all();
    }

    /// Re-arm the gate so later waits block again.
    pub fn clear(&self) {
        *self.lock() = false;
    }

    /// Whether the gate is currently set.
    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Block for at most `timeout`.
    ///
    /// Returns `true` if the gate was set (the wait was cancelled) and
    /// `false` if the full timeout elapsed.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out_when_clear() {
        let gate = SleepGate::new();
        let start = Instant::now();
        assert!(!gate.wait(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_set_wakes_waiter() {
        let gate = Arc::new(SleepGate::new());
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.wait(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        gate.set();
        assert!(waiter.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_set_wakes_all_waiters() {
        let gate = Arc::new(SleepGate::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || gate.wait(Duration::from_secs(10)))
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        gate.set();
        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }

    #[test]
    fn test_gate_stays_set_until_cleared() {
        let gate = SleepGate::new();
        gate.set();
        gate.set();
        assert!(gate.is_set());
        assert!(gate.wait(Duration::from_secs(10)));
        assert!(gate.wait(Duration::from_secs(10)));

        gate.clear();
        assert!(!gate.is_set());
        assert!(!gate.wait(Duration::from_millis(5)));
    }
}
