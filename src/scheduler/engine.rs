//! Periodic job engine.
//!
//! [`JobScheduler`] is the seam the rest of the crate schedules through.
//! [`TokioScheduler`] backs it with one tokio task per job; job bodies run
//! on the blocking pool so a slow fetch never stalls the timer tasks.
//! Every mutating call takes the job table lock exactly once.

use chrono::Local;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Result, ScoreboardError};
use crate::scheduler::{JobArgs, JobFn, JobInfo, JobSpec, Trigger};

/// Operations the scheduling layer needs from a job engine.
pub trait JobScheduler: Send + Sync {
    /// Add a job. Fails with `DuplicateJob` unless the spec allows replacement.
    fn add_job(&self, spec: JobSpec) -> Result<JobInfo>;

    fn remove_job(&self, id: &str) -> Result<()>;

    /// Stop a job from firing until resumed.
    fn pause_job(&self, id: &str) -> Result<()>;

    /// Resume a paused job; its next run is computed from now.
    fn resume_job(&self, id: &str) -> Result<()>;

    /// Swap a job's trigger and recompute its next run.
    fn reschedule_job(&self, id: &str, trigger: Trigger) -> Result<JobInfo>;

    fn get_job(&self, id: &str) -> Option<JobInfo>;

    /// All jobs, sorted by id.
    fn jobs(&self) -> Vec<JobInfo>;

    /// Hold every job without touching per-job state.
    fn pause(&self) -> Result<()>;

    fn resume(&self) -> Result<()>;

    fn remove_all_jobs(&self) -> Result<()>;

    fn job_ids(&self) -> Vec<String> {
        self.jobs().into_iter().map(|job| job.id).collect()
    }
}

struct Entry {
    name: Option<String>,
    trigger: Trigger,
    func: JobFn,
    args: JobArgs,
    paused: bool,
    next_run: Option<chrono::DateTime<Local>>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Entry {
    fn info(&self, id: &str) -> JobInfo {
        JobInfo {
            id: id.to_string(),
            name: self.name.clone(),
            trigger: self.trigger.to_string(),
            next_run: self.next_run,
            paused: self.paused,
        }
    }
}

#[derive(Default)]
struct Shared {
    jobs: Mutex<HashMap<String, Entry>>,
    paused: AtomicBool,
    generation: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Job engine running on a tokio runtime.
pub struct TokioScheduler {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl TokioScheduler {
    /// Create a scheduler whose timers run on `runtime`. Safe to call from
    /// any thread.
    pub fn new(runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            runtime,
        }
    }

    /// (Re)start the timer task for `entry`, cancelling any previous one.
    fn arm(&self, id: &str, entry: &mut Entry) {
        if let Some(task) = entry.task.take() {
            task.abort();
        }
        entry.generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if entry.paused || entry.next_run.is_none() {
            return;
        }
        let task = self
            .runtime
            .spawn(run_job(self.shared.clone(), id.to_string(), entry.generation));
        entry.task = Some(task);
    }

    fn with_entry<T>(&self, id: &str, f: impl FnOnce(&Self, &mut Entry) -> T) -> Result<T> {
        let mut jobs = self.shared.lock();
        let entry = jobs
            .get_mut(id)
            .ok_or_else(|| ScoreboardError::JobNotFound(id.to_string()))?;
        Ok(f(self, entry))
    }
}

impl JobScheduler for TokioScheduler {
    fn add_job(&self, spec: JobSpec) -> Result<JobInfo> {
        let next_run = spec.trigger.next_fire(Local::now()).ok_or_else(|| {
            ScoreboardError::InvalidTrigger(format!("job '{}' would never fire ({})", spec.id, spec.trigger))
        })?;

        let mut jobs = self.shared.lock();
        if let Some(existing) = jobs.get_mut(&spec.id) {
            if !spec.replace_existing {
                return Err(ScoreboardError::DuplicateJob(spec.id));
            }
            if let Some(task) = existing.task.take() {
                task.abort();
            }
        }

        let mut entry = Entry {
            name: spec.name,
            trigger: spec.trigger,
            func: spec.func,
            args: spec.args,
            paused: false,
            next_run: Some(next_run),
            generation: 0,
            task: None,
        };
        self.arm(&spec.id, &mut entry);
        let info = entry.info(&spec.id);
        jobs.insert(spec.id.clone(), entry);

        tracing::debug!(job_id = %spec.id, trigger = %info.trigger, next_run = ?info.next_run, "Job added");
        Ok(info)
    }

    fn remove_job(&self, id: &str) -> Result<()> {
        let entry = self
            .shared
            .lock()
            .remove(id)
            .ok_or_else(|| ScoreboardError::JobNotFound(id.to_string()))?;
        if let Some(task) = entry.task {
            task.abort();
        }
        tracing::debug!(job_id = %id, "Job removed");
        Ok(())
    }

    fn pause_job(&self, id: &str) -> Result<()> {
        self.with_entry(id, |scheduler, entry| {
            entry.paused = true;
            entry.next_run = None;
            scheduler.arm(id, entry);
        })?;
        tracing::debug!(job_id = %id, "Job paused");
        Ok(())
    }

    fn resume_job(&self, id: &str) -> Result<()> {
        self.with_entry(id, |scheduler, entry| {
            if entry.paused {
                entry.paused = false;
                entry.next_run = entry.trigger.next_fire(Local::now());
                scheduler.arm(id, entry);
            }
        })?;
        tracing::debug!(job_id = %id, "Job resumed");
        Ok(())
    }

    fn reschedule_job(&self, id: &str, trigger: Trigger) -> Result<JobInfo> {
        let info = self.with_entry(id, |scheduler, entry| {
            entry.trigger = trigger;
            if !entry.paused {
                entry.next_run = entry.trigger.next_fire(Local::now());
            }
            scheduler.arm(id, entry);
            entry.info(id)
        })?;
        tracing::debug!(job_id = %id, trigger = %info.trigger, next_run = ?info.next_run, "Job rescheduled");
        Ok(info)
    }

    fn get_job(&self, id: &str) -> Option<JobInfo> {
        self.shared.lock().get(id).map(|entry| entry.info(id))
    }

    fn jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self.shared.lock().iter().map(|(id, entry)| entry.info(id)).collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    fn pause(&self) -> Result<()> {
        self.shared.paused.store(true, Ordering::SeqCst);
        tracing::info!("Scheduler paused");
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        self.shared.paused.store(false, Ordering::SeqCst);
        tracing::info!("Scheduler resumed");
        Ok(())
    }

    fn remove_all_jobs(&self) -> Result<()> {
        let drained: Vec<(String, Entry)> = self.shared.lock().drain().collect();
        for (_, entry) in &drained {
            if let Some(task) = &entry.task {
                task.abort();
            }
        }
        tracing::debug!(count = drained.len(), "All jobs removed");
        Ok(())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for entry in self.shared.lock().values() {
            if let Some(task) = &entry.task {
                task.abort();
            }
        }
    }
}

/// Timer loop for one job. Exits when the job disappears or is re-armed
/// (its generation no longer matches).
async fn run_job(shared: Arc<Shared>, id: String, generation: u64) {
    loop {
        let (due, one_shot, func, args) = {
            let jobs = shared.lock();
            let Some(entry) = jobs.get(&id).filter(|entry| entry.generation == generation) else {
                return;
            };
            let Some(due) = entry.next_run else {
                return;
            };
            (due, entry.trigger.is_one_shot(), entry.func.clone(), entry.args.clone())
        };

        let wait = (due - Local::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        if shared.paused.load(Ordering::SeqCst) {
            if one_shot {
                // Hold one-shot jobs until the scheduler resumes
                tokio::time::sleep(Duration::from_millis(500)).await;
                continue;
            }
            tracing::debug!(job_id = %id, "Scheduler paused, skipping run");
        } else {
            tracing::debug!(job_id = %id, "Running job");
            match tokio::task::spawn_blocking(move || func(&args)).await {
                Ok(Ok(())) => tracing::debug!(job_id = %id, "Job finished"),
                Ok(Err(e)) => tracing::error!(job_id = %id, error = %e, "Job failed"),
                Err(e) => tracing::error!(job_id = %id, error = ?e, "Job panicked"),
            }
        }

        let mut jobs = shared.lock();
        let Some(entry) = jobs.get_mut(&id).filter(|entry| entry.generation == generation) else {
            return;
        };
        if one_shot {
            jobs.remove(&id);
            tracing::debug!(job_id = %id, "One-shot job done");
            return;
        }
        entry.next_run = entry.trigger.next_fire(Local::now());
    }
}
