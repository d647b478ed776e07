//! Periodic data refresh (weather, forecast, update check).

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::scheduler::{JobArgs, JobScheduler, JobSpec, Trigger};
use crate::workers::DataFeed;

pub struct DataWorker {
    feed: Arc<dyn DataFeed>,
}

impl DataWorker {
    pub fn new(feed: Arc<dyn DataFeed>) -> Arc<Self> {
        Arc::new(Self { feed })
    }

    pub fn refresh(&self) -> Result<()> {
        self.feed.refresh()
    }

    /// Fetch once now, then every `every` under `job_id`.
    pub fn start(self: Arc<Self>, job_id: &str, every: Duration, scheduler: &dyn JobScheduler) -> Result<()> {
        if let Err(e) = self.refresh() {
            log::error!("Unable to refresh {} data, will try on next refresh: {}", self.feed.name(), e);
        }
        let name = self.feed.name().to_string();
        let worker = self.clone();
        let info = scheduler.add_job(
            JobSpec::new(job_id, Trigger::interval(every), move |_: &JobArgs| worker.refresh()).with_name(name),
        )?;
        log::info!("Scheduled {} refresh (id={}, next run {:?})", self.feed.name(), job_id, info.next_run);
        Ok(())
    }
}
