//! Callable registry for imported jobs.
//!
//! Import files name their functions by string. Instead of loading code
//! at runtime, every function an import may reference is registered here
//! at startup under a `module` and `attribute` name.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, ScoreboardError};
use crate::scheduler::{JobArgs, JobFn};

/// Attribute looked up when a reference names only a module.
pub const ENTRY_POINT: &str = "main";

/// A job function, given directly or by name.
#[derive(Clone)]
pub enum CallableRef {
    Direct(JobFn),
    Named(String),
}

impl CallableRef {
    pub fn resolve(&self, registry: &CallableRegistry) -> Result<JobFn> {
        match self {
            CallableRef::Direct(func) => Ok(func.clone()),
            CallableRef::Named(reference) => registry.resolve(reference),
        }
    }
}

impl fmt::Debug for CallableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableRef::Direct(_) => write!(f, "Direct(<fn>)"),
            CallableRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl From<&str> for CallableRef {
    fn from(reference: &str) -> Self {
        CallableRef::Named(reference.to_string())
    }
}

/// module -> attribute -> function.
#[derive(Default, Clone)]
pub struct CallableRegistry {
    modules: BTreeMap<String, BTreeMap<String, JobFn>>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: impl Into<String>, attribute: impl Into<String>, func: JobFn) {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(attribute.into(), func);
    }

    /// All references in `module:attribute` form, sorted.
    pub fn references(&self) -> Vec<String> {
        self.modules
            .iter()
            .flat_map(|(module, attrs)| attrs.keys().map(move |attr| format!("{}:{}", module, attr)))
            .collect()
    }

    fn lookup(&self, module: &str, attribute: &str) -> Option<JobFn> {
        self.modules.get(module)?.get(attribute).cloned()
    }

    /// Resolve a reference, trying `module:attribute`, then dotted
    /// `module.attribute`, then the whole string as a module exposing
    /// [`ENTRY_POINT`].
    pub fn resolve(&self, reference: &str) -> Result<JobFn> {
        let reference = reference.trim();
        let unresolved = || ScoreboardError::UnresolvedCallable(reference.to_string());

        if let Some((module, attribute)) = reference.split_once(':') {
            return self.lookup(module, attribute).ok_or_else(unresolved);
        }
        if let Some((module, attribute)) = reference.rsplit_once('.') {
            if let Some(func) = self.lookup(module, attribute) {
                return Ok(func);
            }
            log::debug!("No attribute '{}' in module '{}', trying entry point", attribute, module);
        }
        self.lookup(reference, ENTRY_POINT).ok_or_else(unresolved)
    }
}

/// Logs its `message` keyword argument; handy for scheduled notes in import files.
pub fn log_message(args: &JobArgs) -> Result<()> {
    let message = args.kwarg_str("message").unwrap_or("(no message)");
    log::info!("Scheduled message: {} {:?}", message, args.args);
    Ok(())
}
