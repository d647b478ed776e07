//! Background workers and the job ids they register under.
//!
//! Each worker, once started, adds its own periodic job(s) to the
//! scheduler. [`WorkerKind`] is the fixed table of logical workers; the
//! scheduling layer uses it to tell whether a worker is already running.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::context::AppContext;
use crate::display::Display;
use crate::error::{Result, ScoreboardError};
use crate::scheduler::{CallableRegistry, JobArgs, JobScheduler, log_message};

mod alerts;
mod data;
mod dimmer;
mod feeds;
mod screensaver;

pub use alerts::AlertWorker;
pub use data::DataWorker;
pub use dimmer::{DimmerWorker, brightness_at};
pub use feeds::{AlertCategory, AlertFeed, DataFeed, FileAlertFeed, LoggingFeed, WeatherAlert};
pub use screensaver::{ScreensaverWorker, screensaver_start_time};

/// Every screensaver job id starts with this.
pub const SCREENSAVER_PREFIX: &str = "screensaver";
pub const SCREENSAVER_ON: &str = "screensaver-on";
pub const SCREENSAVER_OFF: &str = "screensaver-off";

/// How a worker's presence is detected in the job table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMatch {
    Exact(&'static str),
    /// Workers that register several jobs under one prefix.
    Prefix(&'static str),
}

impl JobMatch {
    pub fn matches(&self, job_id: &str) -> bool {
        match self {
            JobMatch::Exact(id) => job_id == *id,
            JobMatch::Prefix(prefix) => job_id.starts_with(prefix),
        }
    }

    pub fn found_in(&self, job_ids: &[String]) -> bool {
        job_ids.iter().any(|id| self.matches(id))
    }

    /// The id or prefix itself.
    pub fn key(&self) -> &'static str {
        match self {
            JobMatch::Exact(id) | JobMatch::Prefix(id) => id,
        }
    }
}

/// Logical background workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    EcWeather,
    OwmWeather,
    EcAlerts,
    NwsAlerts,
    Forecast,
    UpdateCheck,
    Dimmer,
    Screensaver,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 8] = [
        WorkerKind::EcWeather,
        WorkerKind::OwmWeather,
        WorkerKind::EcAlerts,
        WorkerKind::NwsAlerts,
        WorkerKind::Forecast,
        WorkerKind::UpdateCheck,
        WorkerKind::Dimmer,
        WorkerKind::Screensaver,
    ];

    pub fn job_match(self) -> JobMatch {
        match self {
            WorkerKind::EcWeather => JobMatch::Exact("ec-weather"),
            WorkerKind::OwmWeather => JobMatch::Exact("owm-weather"),
            WorkerKind::EcAlerts => JobMatch::Exact("ec-alerts"),
            WorkerKind::NwsAlerts => JobMatch::Exact("nws-alerts"),
            WorkerKind::Forecast => JobMatch::Exact("forecast"),
            WorkerKind::UpdateCheck => JobMatch::Exact("update-check"),
            WorkerKind::Dimmer => JobMatch::Exact("dimmer"),
            WorkerKind::Screensaver => JobMatch::Prefix(SCREENSAVER_PREFIX),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkerKind::EcWeather => "EC weather worker",
            WorkerKind::OwmWeather => "OWM weather worker",
            WorkerKind::EcAlerts => "EC alerts worker",
            WorkerKind::NwsAlerts => "NWS alerts worker",
            WorkerKind::Forecast => "weather forecast",
            WorkerKind::UpdateCheck => "update checker",
            WorkerKind::Dimmer => "dimmer",
            WorkerKind::Screensaver => "screensaver",
        }
    }

    /// Workers the configuration enables, in start order.
    ///
    /// Unknown feed names are logged and the feature is skipped; the
    /// forecast needs a working weather feed.
    pub fn planned(config: &Config) -> Vec<WorkerKind> {
        let mut planned = Vec::new();

        let mut weather = false;
        if config.weather.enabled {
            match config.weather.feed.to_lowercase().as_str() {
                "ec" => planned.push(WorkerKind::EcWeather),
                "owm" => planned.push(WorkerKind::OwmWeather),
                other => log::error!("No valid weather provider selected ('{}'), skipping weather feed", other),
            }
            weather = planned.last().is_some_and(|kind| {
                matches!(kind, WorkerKind::EcWeather | WorkerKind::OwmWeather)
            });
        }

        if config.alerts.enabled {
            match config.alerts.feed.to_lowercase().as_str() {
                "ec" => planned.push(WorkerKind::EcAlerts),
                "nws" => planned.push(WorkerKind::NwsAlerts),
                other => log::error!("No valid weather alerts provider selected ('{}'), skipping alerts feed", other),
            }
        }

        if config.weather.forecast_enabled && weather {
            planned.push(WorkerKind::Forecast);
        }
        if config.update_check.enabled {
            planned.push(WorkerKind::UpdateCheck);
        }
        if config.dimmer.enabled {
            planned.push(WorkerKind::Dimmer);
        }
        if config.screensaver.enabled {
            planned.push(WorkerKind::Screensaver);
        }
        planned
    }
}

/// Handles a worker needs to do its job.
#[derive(Clone)]
pub struct WorkerEnv {
    pub app: Arc<AppContext>,
    pub display: Arc<dyn Display>,
    pub scheduler: Arc<dyn JobScheduler>,
}

/// Constructs a worker, which registers its own jobs.
pub trait WorkerFactory: Send + Sync {
    fn start(&self, kind: WorkerKind, config: &Config, env: &WorkerEnv) -> Result<()>;
}

/// The data sources behind the data and alert workers.
#[derive(Clone)]
pub struct Feeds {
    pub weather: Arc<dyn DataFeed>,
    pub forecast: Arc<dyn DataFeed>,
    pub update_check: Arc<dyn DataFeed>,
    pub alerts: Arc<dyn AlertFeed>,
}

impl Feeds {
    /// Feeds for a standalone install: alerts from `alerts.source_file`
    /// when set, logging stand-ins otherwise.
    pub fn from_config(config: &Config) -> Self {
        let alerts: Arc<dyn AlertFeed> = match &config.alerts.source_file {
            Some(path) => Arc::new(FileAlertFeed::new(path)),
            None => Arc::new(LoggingFeed::new(config.alerts.feed.to_uppercase())),
        };
        Self {
            weather: Arc::new(LoggingFeed::new(format!("{} weather", config.weather.feed.to_uppercase()))),
            forecast: Arc::new(LoggingFeed::new("forecast")),
            update_check: Arc::new(LoggingFeed::new(format!("release ({})", config.update_check.repo))),
            alerts,
        }
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.max(1) * 60)
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n.max(1) * 3600)
}

/// The workers shipped with the binary.
#[derive(Clone)]
pub struct StandardWorkers {
    feeds: Feeds,
}

impl StandardWorkers {
    pub fn new(feeds: Feeds) -> Self {
        Self { feeds }
    }

    /// Register every worker entry point an import file may reference.
    pub fn register_callables(&self, config: &Config, env: &WorkerEnv, registry: &mut CallableRegistry) {
        let weather = DataWorker::new(self.feeds.weather.clone());
        registry.register("scoreboard.weather", "refresh", Arc::new(move |_: &JobArgs| weather.refresh()));

        let forecast = DataWorker::new(self.feeds.forecast.clone());
        registry.register("scoreboard.forecast", "refresh", Arc::new(move |_: &JobArgs| forecast.refresh()));

        let update_check = DataWorker::new(self.feeds.update_check.clone());
        registry.register("scoreboard.update_check", "refresh", Arc::new(move |_: &JobArgs| update_check.refresh()));

        let alerts = AlertWorker::new(env.app.clone(), self.feeds.alerts.clone());
        registry.register("scoreboard.alerts", "poll", Arc::new(move |_: &JobArgs| alerts.poll().map(|_| ())));

        let dimmer = DimmerWorker::new(env.app.clone(), env.display.clone());
        registry.register("scoreboard.dimmer", "update", Arc::new(move |_: &JobArgs| dimmer.update()));

        match ScreensaverWorker::new(&config.screensaver, env.app.clone(), env.scheduler.clone()) {
            Ok(saver) => {
                let on = saver.clone();
                registry.register("scoreboard.screensaver", "start", Arc::new(move |_: &JobArgs| on.run_saver()));
                registry.register("scoreboard.screensaver", "stop", Arc::new(move |_: &JobArgs| saver.stop_saver()));
            }
            Err(e) => log::debug!("Screensaver callables not registered: {}", e),
        }

        registry.register("scoreboard.jobs", "log_message", Arc::new(log_message));
    }
}

impl WorkerFactory for StandardWorkers {
    fn start(&self, kind: WorkerKind, config: &Config, env: &WorkerEnv) -> Result<()> {
        let scheduler = env.scheduler.as_ref();
        let job_id = kind.job_match().key();
        match kind {
            WorkerKind::EcWeather | WorkerKind::OwmWeather => {
                DataWorker::new(self.feeds.weather.clone()).start(job_id, minutes(config.weather.update_minutes), scheduler)
            }
            WorkerKind::Forecast => DataWorker::new(self.feeds.forecast.clone()).start(
                job_id,
                hours(config.weather.forecast_update_hours),
                scheduler,
            ),
            WorkerKind::UpdateCheck => DataWorker::new(self.feeds.update_check.clone()).start(
                job_id,
                hours(config.update_check.interval_hours),
                scheduler,
            ),
            WorkerKind::EcAlerts | WorkerKind::NwsAlerts => {
                AlertWorker::new(env.app.clone(), self.feeds.alerts.clone()).start(job_id, &config.alerts, scheduler)
            }
            WorkerKind::Dimmer => DimmerWorker::new(env.app.clone(), env.display.clone()).start(
                job_id,
                minutes(config.dimmer.update_minutes),
                scheduler,
            ),
            WorkerKind::Screensaver => {
                ScreensaverWorker::new(&config.screensaver, env.app.clone(), env.scheduler.clone())?.start()
            }
        }
    }
}

/// Error for a worker whose settings cannot be used.
pub(crate) fn unusable(worker: &str, reason: impl Into<String>) -> ScoreboardError {
    ScoreboardError::Config(format!("{}: {}", worker, reason.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_match() {
        assert!(WorkerKind::Dimmer.job_match().matches("dimmer"));
        assert!(!WorkerKind::Dimmer.job_match().matches("dimmer-2"));
        let saver = WorkerKind::Screensaver.job_match();
        assert!(saver.matches(SCREENSAVER_ON));
        assert!(saver.matches(SCREENSAVER_OFF));
        assert!(saver.found_in(&["ec-weather".to_string(), "screensaver-off".to_string()]));
        assert!(!saver.found_in(&["ec-weather".to_string()]));
    }

    #[test]
    fn test_job_ids_are_distinct() {
        let mut keys: Vec<&str> = WorkerKind::ALL.iter().map(|kind| kind.job_match().key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), WorkerKind::ALL.len());
    }

    #[test]
    fn test_planned_defaults_empty() {
        assert!(WorkerKind::planned(&Config::default()).is_empty());
    }

    #[test]
    fn test_planned_follows_feeds() {
        let mut config = Config::default();
        config.weather.enabled = true;
        config.weather.feed = "OWM".to_string();
        config.weather.forecast_enabled = true;
        config.alerts.enabled = true;
        config.alerts.feed = "nws".to_string();
        config.dimmer.enabled = true;
        config.screensaver.enabled = true;
        config.update_check.enabled = true;
        assert_eq!(
            WorkerKind::planned(&config),
            vec![
                WorkerKind::OwmWeather,
                WorkerKind::NwsAlerts,
                WorkerKind::Forecast,
                WorkerKind::UpdateCheck,
                WorkerKind::Dimmer,
                WorkerKind::Screensaver,
            ]
        );
    }

    #[test]
    fn test_planned_skips_bad_feeds() {
        let mut config = Config::default();
        config.weather.enabled = true;
        config.weather.feed = "darksky".to_string();
        config.weather.forecast_enabled = true;
        config.alerts.enabled = true;
        config.alerts.feed = "meteo".to_string();
        assert!(WorkerKind::planned(&config).is_empty());
    }
}
