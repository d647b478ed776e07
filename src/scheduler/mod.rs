//! Background job scheduling.
//!
//! This module provides:
//! - **Trigger**: interval (with jitter), daily and one-shot schedules
//! - **JobScheduler / TokioScheduler**: the job table and its timer tasks
//! - **CallableRegistry**: named job functions for import files
//! - **SchedulerManager**: idempotent worker registration and job import
//!
//! # Example
//!
//! ```ignore
//! use scoreboard::scheduler::{JobScheduler, JobSpec, TokioScheduler, Trigger};
//!
//! let scheduler = TokioScheduler::new(runtime.handle().clone());
//! scheduler.add_job(JobSpec::new("dimmer", Trigger::interval(five_minutes), |_| Ok(())))?;
//! ```

mod engine;
mod job;
mod manager;
mod registry;
mod trigger;

pub use engine::{JobScheduler, TokioScheduler};
pub use job::{JobArgs, JobDescription, JobFn, JobInfo, JobSpec};
pub use manager::SchedulerManager;
pub use registry::{CallableRef, CallableRegistry, ENTRY_POINT, log_message};
pub use trigger::Trigger;
