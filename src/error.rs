//! Error types for the scoreboard
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in the scoreboard core
#[derive(Debug, Error)]
pub enum ScoreboardError {
    /// Board id is not registered in the catalog
    #[error("Board not found: {0}")]
    UnknownBoard(String),

    /// Board constructor failed
    #[error("Board '{board}' failed to initialize: {reason}")]
    BoardInit { board: String, reason: String },

    /// Board render (or legacy draw) failed
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid or missing configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Underlying scheduler rejected an operation
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// No job with this id exists
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A job with this id already exists
    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    /// Trigger description could not be turned into a schedule
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    /// Callable reference did not resolve to a registered function
    #[error("Unresolved callable: {0}")]
    UnresolvedCallable(String),

    /// File watcher could not be set up
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for scoreboard operations
pub type Result<T> = std::result::Result<T, ScoreboardError>;
