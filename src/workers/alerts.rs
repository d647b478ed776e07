//! Weather alert poller.
//!
//! A poll that turns up an alert not seen on the previous poll raises the
//! alert interrupt, which also sets the sleep gate so the alert board
//! shows right away.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::AlertsConfig;
use crate::context::AppContext;
use crate::error::Result;
use crate::scheduler::{JobArgs, JobScheduler, JobSpec, Trigger};
use crate::workers::AlertFeed;

pub struct AlertWorker {
    app: Arc<AppContext>,
    feed: Arc<dyn AlertFeed>,
    seen: Mutex<BTreeSet<String>>,
}

impl AlertWorker {
    pub fn new(app: Arc<AppContext>, feed: Arc<dyn AlertFeed>) -> Arc<Self> {
        Arc::new(Self {
            app,
            feed,
            seen: Mutex::new(BTreeSet::new()),
        })
    }

    /// Poll the feed. Returns whether a new alert was raised.
    pub fn poll(&self) -> Result<bool> {
        let alerts = self.feed.poll()?;
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        if alerts.is_empty() {
            if !seen.is_empty() {
                log::info!("Weather alerts ended");
            }
            seen.clear();
            self.app.set_alert_text(None);
            return Ok(false);
        }

        let fresh = alerts.iter().find(|alert| !seen.contains(&alert.title)).cloned();
        *seen = alerts.into_iter().map(|alert| alert.title).collect();

        match fresh {
            Some(alert) => {
                let headline = alert.headline();
                log::info!("New weather alert: {}", headline);
                self.app.set_alert_text(Some(headline));
                self.app.interrupts().raise_alert();
                Ok(true)
            }
            None => {
                log::debug!("No new weather alerts ({} active)", seen.len());
                Ok(false)
            }
        }
    }

    /// Poll once now, then on the configured interval with jitter.
    pub fn start(self: Arc<Self>, job_id: &str, config: &AlertsConfig, scheduler: &dyn JobScheduler) -> Result<()> {
        if let Err(e) = self.poll() {
            log::error!("Unable to check weather alerts, will try on next refresh: {}", e);
        }
        let trigger = Trigger::interval(Duration::from_secs(config.update_minutes.max(1) * 60))
            .with_jitter(Duration::from_secs(config.jitter_seconds));
        let worker = self.clone();
        scheduler.add_job(
            JobSpec::new(job_id, trigger, move |_: &JobArgs| worker.poll().map(|_| ())).with_name("Weather alerts"),
        )?;
        log::info!("Scheduled weather alerts (id={})", job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::interrupt::Interrupt;
    use crate::workers::WeatherAlert;

    #[derive(Default)]
    struct Scripted(Mutex<Vec<Vec<&'static str>>>);

    impl AlertFeed for Scripted {
        fn poll(&self) -> Result<Vec<WeatherAlert>> {
            let titles = self.0.lock().unwrap().remove(0);
            Ok(titles
                .into_iter()
                .map(|title| WeatherAlert {
                    title: title.to_string(),
                    issued: None,
                })
                .collect())
        }
    }

    fn worker(polls: Vec<Vec<&'static str>>) -> (Arc<AlertWorker>, Arc<AppContext>) {
        let app = Arc::new(AppContext::new(Config::default()));
        let feed = Arc::new(Scripted(Mutex::new(polls)));
        (AlertWorker::new(app.clone(), feed), app)
    }

    #[test]
    fn test_new_alert_raises_interrupt() {
        let (worker, app) = worker(vec![vec!["Wind Warning"]]);
        assert!(worker.poll().unwrap());
        assert!(app.interrupts().is_active(Interrupt::Alert));
        assert!(app.gate().is_set());
        assert_eq!(app.alert_text().as_deref(), Some("Warning: Wind"));
    }

    #[test]
    fn test_repeat_alert_is_quiet() {
        let (worker, app) = worker(vec![vec!["Wind Warning"], vec!["Wind Warning"], vec!["Wind Warning", "Fog Advisory"]]);
        assert!(worker.poll().unwrap());
        app.interrupts().clear(Interrupt::Alert);

        assert!(!worker.poll().unwrap());
        assert!(!app.interrupts().is_active(Interrupt::Alert));

        assert!(worker.poll().unwrap());
        assert_eq!(app.alert_text().as_deref(), Some("Advisory: Fog"));
    }

    #[test]
    fn test_cleared_alerts_reset_text() {
        let (worker, app) = worker(vec![vec!["Wind Warning"], vec![], vec!["Wind Warning"]]);
        worker.poll().unwrap();
        assert!(!worker.poll().unwrap());
        assert!(app.alert_text().is_none());
        // Same alert after a quiet poll counts as new again
        assert!(worker.poll().unwrap());
    }
}
