//! Job records: what gets scheduled, what is reported back, and the
//! serialized shape accepted by import mode.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ScoreboardError};
use crate::scheduler::Trigger;

/// Positional and keyword arguments handed to a job on every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobArgs {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl JobArgs {
    /// Keyword argument as a string, if present.
    pub fn kwarg_str(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key).and_then(Value::as_str)
    }
}

/// The function a job runs. Called on a blocking worker thread.
pub type JobFn = Arc<dyn Fn(&JobArgs) -> Result<()> + Send + Sync>;

/// Everything needed to add a job.
#[derive(Clone)]
pub struct JobSpec {
    pub id: String,
    pub name: Option<String>,
    pub trigger: Trigger,
    pub func: JobFn,
    pub args: JobArgs,
    /// Replace a job with the same id instead of failing.
    pub replace_existing: bool,
}

impl JobSpec {
    pub fn new<F>(id: impl Into<String>, trigger: Trigger, func: F) -> Self
    where
        F: Fn(&JobArgs) -> Result<()> + Send + Sync + 'static,
    {
        Self::from_fn(id, trigger, Arc::new(func))
    }

    pub fn from_fn(id: impl Into<String>, trigger: Trigger, func: JobFn) -> Self {
        Self {
            id: id.into(),
            name: None,
            trigger,
            func,
            args: JobArgs::default(),
            replace_existing: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_args(mut self, args: JobArgs) -> Self {
        self.args = args;
        self
    }

    pub fn replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("args", &self.args)
            .field("replace_existing", &self.replace_existing)
            .finish_non_exhaustive()
    }
}

/// Snapshot of a scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub id: String,
    pub name: Option<String>,
    pub trigger: String,
    pub next_run: Option<DateTime<Local>>,
    pub paused: bool,
}

/// One job in an import file.
///
/// Field names follow the common exported-job layout; the callable may
/// appear as `func_ref`, `func`, `funcname` or `callable`, and the first
/// non-empty one in that order wins.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobDescription {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funcname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callable: Option<String>,

    /// Trigger map with a `type` key, or a bare trigger type name.
    #[serde(default)]
    pub trigger: Option<Value>,

    /// Parameters for a bare trigger type name.
    #[serde(default)]
    pub trigger_args: Map<String, Value>,

    #[serde(default)]
    pub args: Vec<Value>,

    #[serde(default)]
    pub kwargs: Map<String, Value>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub replace_existing: Option<bool>,
}

impl JobDescription {
    /// The callable reference, whichever key carried it.
    pub fn callable_ref(&self) -> Option<&str> {
        [&self.func_ref, &self.func, &self.funcname, &self.callable]
            .into_iter()
            .filter_map(|key| key.as_deref())
            .find(|reference| !reference.trim().is_empty())
    }

    /// Id for logs, falling back to the callable reference.
    pub fn label(&self) -> &str {
        self.id.as_deref().or(self.callable_ref()).unwrap_or("(unknown)")
    }

    /// Decode a JSON job list record by record.
    ///
    /// Only a document that is not a list fails. Records that do not
    /// decode come back as `Err` alongside their position so the caller
    /// can report and skip them.
    pub fn decode_list(json: &str) -> Result<Vec<(usize, Result<Self>)>> {
        let records: Vec<Value> = serde_json::from_str(json)?;
        Ok(records
            .into_iter()
            .enumerate()
            .map(|(index, record)| (index, serde_json::from_value::<Self>(record).map_err(ScoreboardError::from)))
            .collect())
    }
}
