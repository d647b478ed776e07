//! Screensaver timer.
//!
//! Two daily jobs bracket the screensaver window. Starting raises the idle
//! signal, which the rotation keeps honoring until the stop job clears it.
//! While the screensaver is up every other running job is paused unless
//! `screensaver.data_updates` is set. Only the jobs it paused are resumed
//! when it stops. A scheduled or live game defers the
//! start by five minutes at a time.

use chrono::{Local, NaiveTime, TimeDelta};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::ScreensaverConfig;
use crate::context::AppContext;
use crate::error::Result;
use crate::scheduler::{JobArgs, JobScheduler, JobSpec, Trigger};
use crate::workers::{SCREENSAVER_OFF, SCREENSAVER_ON, SCREENSAVER_PREFIX, unusable};

const DEFER_MINUTES: i64 = 5;

/// First start time given the window and the current time.
///
/// Inside the window (including windows that cross midnight) the
/// screensaver starts five minutes from now; otherwise at `start`.
pub fn screensaver_start_time(start: NaiveTime, stop: NaiveTime, now: NaiveTime) -> NaiveTime {
    let inside = if start < stop {
        start <= now && now <= stop
    } else {
        now >= start || now <= stop
    };
    if inside {
        log::info!("Current time {} is inside the screensaver window", now.format("%H:%M"));
        now.overflowing_add_signed(TimeDelta::minutes(DEFER_MINUTES)).0
    } else {
        start
    }
}

pub struct ScreensaverWorker {
    app: Arc<AppContext>,
    scheduler: Arc<dyn JobScheduler>,
    start: NaiveTime,
    stop: NaiveTime,
    data_updates: bool,
    paused: Mutex<Vec<String>>,
}

impl ScreensaverWorker {
    /// Fails when the start or stop time does not parse.
    pub fn new(
        config: &ScreensaverConfig,
        app: Arc<AppContext>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Result<Arc<Self>> {
        let (start, stop) = config.window().ok_or_else(|| {
            unusable(
                "screensaver",
                format!(
                    "start '{}' / stop '{}' must be HH:MM or h:MM AM/PM; screensaver will not be used",
                    config.start, config.stop
                ),
            )
        })?;
        Ok(Arc::new(Self {
            app,
            scheduler,
            start,
            stop,
            data_updates: config.data_updates,
            paused: Mutex::new(Vec::new()),
        }))
    }

    /// Register the on/off jobs.
    pub fn start(self: Arc<Self>) -> Result<()> {
        let first = screensaver_start_time(self.start, self.stop, Local::now().time());

        let on = self.clone();
        let start = self.scheduler.add_job(
            JobSpec::new(SCREENSAVER_ON, Trigger::daily(first), move |_: &JobArgs| on.run_saver())
                .with_name("Screensaver on"),
        )?;
        let off = self.clone();
        let stop = self.scheduler.add_job(
            JobSpec::new(SCREENSAVER_OFF, Trigger::daily(self.stop), move |_: &JobArgs| off.stop_saver())
                .with_name("Screensaver off"),
        )?;
        log::info!(
            "Screen saver will start @ {:?} and end @ {:?}",
            start.next_run,
            stop.next_run
        );
        Ok(())
    }

    fn other_jobs(&self) -> Vec<String> {
        self.scheduler
            .job_ids()
            .into_iter()
            .filter(|id| !id.starts_with(SCREENSAVER_PREFIX))
            .collect()
    }

    /// Start job body.
    pub fn run_saver(&self) -> Result<()> {
        let interrupts = self.app.interrupts();

        if interrupts.live_game() {
            let retry = Local::now().time().overflowing_add_signed(TimeDelta::minutes(DEFER_MINUTES)).0;
            let info = self.scheduler.reschedule_job(SCREENSAVER_ON, Trigger::daily(retry))?;
            log::warn!(
                "Screen saver not started, game is scheduled or live. Will try again @ {:?}",
                info.next_run
            );
            return Ok(());
        }

        match interrupts.current_board() {
            Some(board) => log::info!("Screen saver started, currently displayed board {}", board),
            None => log::info!("Screen saver started, currently displayed board is not set"),
        }
        interrupts.begin_idle();
        // Imported job tables may run this under another id
        if let Err(e) = self.scheduler.reschedule_job(SCREENSAVER_ON, Trigger::daily(self.start)) {
            log::warn!("Could not reset {} to {}: {}", SCREENSAVER_ON, self.start, e);
        }

        if !self.data_updates {
            log::info!("Pausing all scheduled jobs while screensaver active");
            let mut paused = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
            for id in self.other_jobs() {
                if self.scheduler.get_job(&id).is_some_and(|job| job.paused) || paused.contains(&id) {
                    log::debug!("Job {} already paused, leaving it", id);
                    continue;
                }
                match self.scheduler.pause_job(&id) {
                    Ok(()) => paused.push(id),
                    Err(e) => log::error!("Could not pause job {}: {}", id, e),
                }
            }
        }
        Ok(())
    }

    /// Stop job body.
    pub fn stop_saver(&self) -> Result<()> {
        let interrupts = self.app.interrupts();
        match interrupts.previous_board() {
            Some(board) => log::info!("Screen saver stopped, resuming with board {}", board),
            None => log::info!("Screen saver stopped"),
        }

        if !self.data_updates {
            let paused = std::mem::take(&mut *self.paused.lock().unwrap_or_else(PoisonError::into_inner));
            log::info!("Resuming paused jobs: {:?}", paused);
            for id in paused {
                if let Err(e) = self.scheduler.resume_job(&id) {
                    log::error!("Could not resume job {}: {}", id, e);
                }
            }
        }
        interrupts.end_idle();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::interrupt::Interrupt;
    use crate::scheduler::TokioScheduler;
    use std::time::Duration;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_start_time_outside_window() {
        assert_eq!(screensaver_start_time(time(22, 0), time(6, 0), time(12, 0)), time(22, 0));
        assert_eq!(screensaver_start_time(time(9, 0), time(17, 0), time(18, 0)), time(9, 0));
    }

    #[test]
    fn test_start_time_inside_overnight_window() {
        assert_eq!(screensaver_start_time(time(22, 0), time(6, 0), time(23, 0)), time(23, 5));
        assert_eq!(screensaver_start_time(time(22, 0), time(6, 0), time(2, 0)), time(2, 5));
        assert_eq!(screensaver_start_time(time(22, 0), time(6, 0), time(23, 58)), time(0, 3));
    }

    #[test]
    fn test_start_time_inside_day_window() {
        assert_eq!(screensaver_start_time(time(9, 0), time(17, 0), time(12, 0)), time(12, 5));
    }

    fn config(data_updates: bool) -> ScreensaverConfig {
        ScreensaverConfig {
            enabled: true,
            data_updates,
            ..Default::default()
        }
    }

    fn setup(data_updates: bool) -> (Arc<ScreensaverWorker>, Arc<AppContext>, Arc<TokioScheduler>) {
        let app = Arc::new(AppContext::new(Config::default()));
        let scheduler = Arc::new(TokioScheduler::new(tokio::runtime::Handle::current()));
        let worker = ScreensaverWorker::new(&config(data_updates), app.clone(), scheduler.clone()).unwrap();
        worker.clone().start().unwrap();
        scheduler
            .add_job(JobSpec::new("ec-weather", Trigger::interval(Duration::from_secs(3600)), |_: &JobArgs| Ok(())))
            .unwrap();
        (worker, app, scheduler)
    }

    #[test]
    fn test_invalid_window_rejected() {
        let app = Arc::new(AppContext::new(Config::default()));
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let scheduler = Arc::new(TokioScheduler::new(runtime.handle().clone()));
        let bad = ScreensaverConfig {
            start: "late".to_string(),
            ..Default::default()
        };
        assert!(ScreensaverWorker::new(&bad, app, scheduler).is_err());
    }

    #[tokio::test]
    async fn test_start_registers_both_jobs() {
        let (_, _, scheduler) = setup(false);
        assert_eq!(scheduler.job_ids(), vec!["ec-weather", SCREENSAVER_OFF, SCREENSAVER_ON]);
    }

    #[tokio::test]
    async fn test_run_and_stop_pause_other_jobs() {
        let (worker, app, scheduler) = setup(false);

        worker.run_saver().unwrap();
        assert!(app.interrupts().is_active(Interrupt::Idle));
        assert!(app.gate().is_set());
        assert!(scheduler.get_job("ec-weather").unwrap().paused);
        assert!(!scheduler.get_job(SCREENSAVER_OFF).unwrap().paused);
        assert_eq!(scheduler.get_job(SCREENSAVER_ON).unwrap().trigger, "daily[22:00:00]");

        worker.stop_saver().unwrap();
        assert!(!app.interrupts().is_active(Interrupt::Idle));
        assert!(!scheduler.get_job("ec-weather").unwrap().paused);
    }

    #[tokio::test]
    async fn test_stop_leaves_jobs_paused_elsewhere() {
        let (worker, _, scheduler) = setup(false);
        scheduler
            .add_job(JobSpec::new("forecast", Trigger::interval(Duration::from_secs(3600)), |_: &JobArgs| Ok(())))
            .unwrap();
        scheduler.pause_job("forecast").unwrap();

        worker.run_saver().unwrap();
        worker.stop_saver().unwrap();
        assert!(scheduler.get_job("forecast").unwrap().paused);
        assert!(!scheduler.get_job("ec-weather").unwrap().paused);
    }

    #[tokio::test]
    async fn test_data_updates_keep_jobs_running() {
        let (worker, app, scheduler) = setup(true);
        worker.run_saver().unwrap();
        assert!(app.interrupts().is_active(Interrupt::Idle));
        assert!(!scheduler.get_job("ec-weather").unwrap().paused);
    }

    #[tokio::test]
    async fn test_live_game_defers_start() {
        let (worker, app, scheduler) = setup(false);
        app.interrupts().set_live_game(true);
        worker.run_saver().unwrap();
        assert!(!app.interrupts().is_active(Interrupt::Idle));
        assert!(!scheduler.get_job("ec-weather").unwrap().paused);

        let next = scheduler.get_job(SCREENSAVER_ON).unwrap().next_run.unwrap();
        let wait = next - Local::now();
        assert!(wait <= TimeDelta::minutes(DEFER_MINUTES) && wait > TimeDelta::minutes(3));
    }
}
