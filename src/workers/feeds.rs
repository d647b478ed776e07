//! Data sources the background workers poll.
//!
//! Real HTTP clients live outside this crate and plug in through these
//! traits. The implementations here read local files or only log.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::Result;

/// A source refreshed on a timer (weather, forecast, update check).
pub trait DataFeed: Send + Sync {
    fn name(&self) -> &str;

    fn refresh(&self) -> Result<()>;
}

/// A source of active weather alerts.
pub trait AlertFeed: Send + Sync {
    fn poll(&self) -> Result<Vec<WeatherAlert>>;
}

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Warning,
    Watch,
    Advisory,
}

impl AlertCategory {
    pub fn label(self) -> &'static str {
        match self {
            AlertCategory::Warning => "Warning",
            AlertCategory::Watch => "Watch",
            AlertCategory::Advisory => "Advisory",
        }
    }

    /// Split a raw alert title into a category and a bare title.
    ///
    /// Handles colour-coded titles (`"Yellow Warning - Extreme Cold"`) and
    /// suffixed titles (`"Severe Thunderstorm Watch"`). Anything else is a
    /// warning with the title unchanged.
    pub fn classify(title: &str) -> (AlertCategory, String) {
        let lower = title.to_lowercase();
        if let Some((colour, rest)) = title.split_once(" - ") {
            let colour = colour.to_lowercase();
            let category = if colour.contains("red") {
                Some(AlertCategory::Warning)
            } else if colour.contains("orange") {
                Some(AlertCategory::Watch)
            } else if colour.contains("yellow") {
                Some(AlertCategory::Advisory)
            } else {
                None
            };
            if let Some(category) = category {
                return (category, rest.trim().to_string());
            }
        }

        for (suffix, category) in [
            (" warning", AlertCategory::Warning),
            (" watch", AlertCategory::Watch),
            (" advisory", AlertCategory::Advisory),
        ] {
            if lower.ends_with(suffix) {
                let bare = title
                    .len()
                    .checked_sub(suffix.len())
                    .and_then(|end| title.get(..end))
                    .unwrap_or(title);
                return (category, bare.to_string());
            }
        }
        (AlertCategory::Warning, title.to_string())
    }
}

/// One active alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub title: String,
    #[serde(default)]
    pub issued: Option<String>,
}

impl WeatherAlert {
    /// Text for the alert board, e.g. `"Advisory: Extreme Cold"`.
    pub fn headline(&self) -> String {
        let (category, title) = AlertCategory::classify(&self.title);
        format!("{}: {}", category.label(), title)
    }
}

/// Reads alerts from a JSON file (a list of `{title, issued}` objects).
///
/// A missing file means no alerts.
#[derive(Debug, Clone)]
pub struct FileAlertFeed {
    path: PathBuf,
}

impl FileAlertFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlertFeed for FileAlertFeed {
    fn poll(&self) -> Result<Vec<WeatherAlert>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

/// Feed that only records that a refresh happened.
#[derive(Debug, Clone)]
pub struct LoggingFeed {
    name: String,
}

impl LoggingFeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DataFeed for LoggingFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&self) -> Result<()> {
        log::info!("Refreshing {} data", self.name);
        Ok(())
    }
}

impl AlertFeed for LoggingFeed {
    fn poll(&self) -> Result<Vec<WeatherAlert>> {
        log::info!("Checking for {} weather alerts", self.name);
        Ok(Vec::new())
    }
}
