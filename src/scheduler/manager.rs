//! Scheduler Manager - keeps background jobs registered exactly once.
//!
//! Two ways to populate the job table:
//!
//! 1. **Normal**: [`SchedulerManager::schedule_all`] starts every enabled
//!    worker whose job id (or id prefix) is not already present. Safe to
//!    call on every config reload.
//! 2. **Import**: [`SchedulerManager::import_jobs`] replaces the table with
//!    jobs rebuilt from serialized descriptions.
//!
//! The remaining operations wrap the underlying scheduler, log failures and
//! report success as a boolean so callers on the reload path never see an
//! error.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::scheduler::{CallableRef, CallableRegistry, JobArgs, JobDescription, JobInfo, JobScheduler, JobSpec, Trigger};
use crate::workers::{WorkerEnv, WorkerFactory, WorkerKind};

pub struct SchedulerManager {
    scheduler: Arc<dyn JobScheduler>,
    workers: Arc<dyn WorkerFactory>,
    env: WorkerEnv,
    callables: CallableRegistry,
}

impl SchedulerManager {
    pub fn new(workers: Arc<dyn WorkerFactory>, env: WorkerEnv, callables: CallableRegistry) -> Self {
        Self {
            scheduler: env.scheduler.clone(),
            workers,
            env,
            callables,
        }
    }

    pub fn scheduler(&self) -> &Arc<dyn JobScheduler> {
        &self.scheduler
    }

    pub fn callables(&self) -> &CallableRegistry {
        &self.callables
    }

    /// Populate the job table.
    ///
    /// A non-empty JSON job list switches to import mode, where records that
    /// fail to decode are skipped one by one. An empty list, or a document
    /// that is not a list, falls back to normal scheduling.
    pub fn schedule_jobs(&self, config: &Config, jobs_json: Option<&str>) -> Vec<String> {
        if let Some(json) = jobs_json {
            match JobDescription::decode_list(json) {
                Ok(records) if !records.is_empty() => {
                    log::info!("Scheduling jobs from provided job list (import mode)");
                    self.import_jobs(decoded_jobs(records));
                    return self.scheduler.job_ids();
                }
                Ok(_) => log::info!("Job list is empty, using normal scheduling"),
                Err(e) => log::error!("Failed to decode job list, using normal scheduling: {}", e),
            }
        }
        self.schedule_all(config);
        self.scheduler.job_ids()
    }

    /// Start every enabled worker that is not already scheduled.
    ///
    /// Returns the job ids (or prefixes) added by this call.
    pub fn schedule_all(&self, config: &Config) -> Vec<String> {
        log::info!("Scheduling jobs (adding missing jobs only)");
        let mut existing = self.scheduler.job_ids();
        log::debug!("Existing job ids before scheduling: {:?}", existing);

        let mut added = Vec::new();
        for kind in WorkerKind::planned(config) {
            let job = kind.job_match();
            if job.found_in(&existing) {
                log::debug!("{} already scheduled (id={}), skipping add", kind.label(), job.key());
                continue;
            }
            match self.workers.start(kind, config, &self.env) {
                Ok(()) => {
                    log::info!("Scheduled {} (id={})", kind.label(), job.key());
                    existing.push(job.key().to_string());
                    added.push(job.key().to_string());
                }
                Err(e) => log::error!("Failed to start {}: {}", kind.label(), e),
            }
        }

        log::debug!("Scheduled jobs after add/skip: {:?}", self.scheduler.job_ids());
        log::info!("Jobs scheduled");
        added
    }

    /// Replace every job with the given descriptions.
    ///
    /// Descriptions with a bad trigger or an unresolvable callable are
    /// logged and skipped. Returns how many jobs were added.
    pub fn import_jobs(&self, jobs: Vec<JobDescription>) -> usize {
        if let Err(e) = self.scheduler.remove_all_jobs() {
            log::debug!("Unable to remove all jobs before import: {}", e);
        }

        let mut imported = 0;
        for description in jobs {
            let label = description.label().to_string();
            let spec = match self.build_imported(description) {
                Ok(spec) => spec,
                Err(e) => {
                    log::error!("Skipping imported job {}: {}", label, e);
                    continue;
                }
            };
            match self.scheduler.add_job(spec) {
                Ok(info) => {
                    log::info!("Added imported job {} ({})", info.id, info.trigger);
                    imported += 1;
                }
                Err(e) => log::error!("Failed to add imported job {}: {}", label, e),
            }
        }

        log::debug!("Scheduled jobs after import: {:?}", self.scheduler.job_ids());
        imported
    }

    /// Parse and import a JSON job list.
    ///
    /// Fails only when the document is not a list; malformed records are
    /// logged and skipped like any other unusable job.
    pub fn import_jobs_json(&self, json: &str) -> Result<usize> {
        let records = JobDescription::decode_list(json)?;
        Ok(self.import_jobs(decoded_jobs(records)))
    }

    /// Turn a description into a job spec without scheduling it.
    pub fn build_imported(&self, description: JobDescription) -> Result<JobSpec> {
        let reference = description.callable_ref().unwrap_or_default().to_string();
        let func = CallableRef::Named(reference.clone()).resolve(&self.callables)?;
        let trigger = Trigger::from_value(description.trigger.as_ref(), &description.trigger_args)?;
        let id = description.id.clone().unwrap_or(reference);

        let mut spec = JobSpec::from_fn(id, trigger, func).with_args(JobArgs {
            args: description.args,
            kwargs: description.kwargs,
        });
        if let Some(name) = description.name {
            spec = spec.with_name(name);
        }
        if let Some(replace) = description.replace_existing {
            spec = spec.replace_existing(replace);
        }
        Ok(spec)
    }

    /// Add a job given directly or by callable name.
    pub fn add_job(&self, id: &str, callable: CallableRef, trigger: Trigger, args: JobArgs) -> Option<JobInfo> {
        log::info!("Adding job {} ({:?}, {})", id, callable, trigger);
        let result = callable
            .resolve(&self.callables)
            .and_then(|func| self.scheduler.add_job(JobSpec::from_fn(id, trigger, func).with_args(args)));
        match result {
            Ok(info) => {
                log::info!("Job added: {} next run {:?}", info.id, info.next_run);
                Some(info)
            }
            Err(e) => {
                log::error!("Failed to add job {}: {}", id, e);
                None
            }
        }
    }

    pub fn remove_job(&self, id: &str) -> bool {
        log::info!("Removing job: {}", id);
        report(self.scheduler.remove_job(id), || format!("Could not remove job {}", id))
    }

    pub fn pause_job(&self, id: &str) -> bool {
        log::info!("Pausing job: {}", id);
        report(self.scheduler.pause_job(id), || format!("Could not pause job {}", id))
    }

    pub fn resume_job(&self, id: &str) -> bool {
        log::info!("Resuming job: {}", id);
        report(self.scheduler.resume_job(id), || format!("Could not resume job {}", id))
    }

    pub fn pause_all(&self) -> bool {
        log::info!("Pausing all jobs");
        report(self.scheduler.pause(), || "Could not pause all jobs".to_string())
    }

    pub fn resume_all(&self) -> bool {
        log::info!("Resuming all jobs");
        report(self.scheduler.resume(), || "Could not resume all jobs".to_string())
    }

    pub fn list_jobs(&self) -> Vec<JobInfo> {
        self.scheduler.jobs()
    }
}

fn decoded_jobs(records: Vec<(usize, Result<JobDescription>)>) -> Vec<JobDescription> {
    records
        .into_iter()
        .filter_map(|(index, record)| match record {
            Ok(description) => Some(description),
            Err(e) => {
                log::error!("Skipping job record {}: {}", index, e);
                None
            }
        })
        .collect()
}

fn report(result: Result<()>, context: impl FnOnce() -> String) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::error!("{}: {}", context(), e);
            false
        }
    }
}
