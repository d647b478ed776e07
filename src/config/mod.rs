//! Configuration system for the scoreboard.
//!
//! Loaded from YAML with a fallback chain:
//! 1. Explicit path if provided
//! 2. ./scoreboard.yml in current directory
//! 3. ~/.config/scoreboard/scoreboard.yml
//! 4. Defaults
//!
//! The whole `Config` is replaced on every hot reload; nothing mutates it in place.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScoreboardError};

pub use self::boards::BoardsConfig;
pub use self::features::{
    AlertsConfig, DimmerConfig, DisplayConfig, RemoteConfig, ScreensaverConfig, UpdateCheckConfig, WeatherConfig,
    parse_clock_time,
};

mod boards;
mod features;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when RUST_LOG is not set.
    pub log_level: Option<String>,

    /// Panel geometry.
    pub display: DisplayConfig,

    /// Rotation sequences and fixed override boards.
    pub boards: BoardsConfig,

    /// Weather data and forecast refresh.
    pub weather: WeatherConfig,

    /// Weather alert polling.
    pub alerts: AlertsConfig,

    /// Release update checks.
    pub update_check: UpdateCheckConfig,

    /// Day/night brightness.
    pub dimmer: DimmerConfig,

    /// Nightly screensaver window.
    pub screensaver: ScreensaverConfig,

    /// Line-oriented remote commands.
    pub remote: RemoteConfig,

    /// Directory holding per-board `<id>/config.json` files.
    pub board_config_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration with fallback chain.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        for candidate in Self::search_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// The file `load` reads: the explicit path, else the first existing
    /// file in the search chain.
    pub fn locate(config_path: Option<&PathBuf>) -> Option<PathBuf> {
        match config_path {
            Some(path) => Some(path.clone()),
            None => Self::search_paths().into_iter().find(|path| path.exists()),
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let project_name = env!("CARGO_PKG_NAME");
        let file_name = format!("{}.yml", project_name);

        let mut paths = vec![PathBuf::from(&file_name)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(project_name).join(&file_name));
        }
        paths
    }

    /// Read and parse a single YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Empty rotation sequences are fatal. Problems local to one background
    /// feature are only reported; that feature is skipped when jobs are scheduled.
    pub fn validate(&self) -> Result<()> {
        self.boards.validate()?;

        if self.display.width == 0 || self.display.height == 0 {
            return Err(ScoreboardError::Config("display width and height must be > 0".to_string()));
        }

        if self.screensaver.enabled && self.screensaver.window().is_none() {
            log::error!(
                "Screensaver start ({}) or stop ({}) is not a valid 12h or 24h time; screensaver will not be used",
                self.screensaver.start,
                self.screensaver.stop
            );
        }
        if self.dimmer.enabled && self.dimmer.daylight().is_none() {
            log::error!(
                "Dimmer sunrise ({}) or sunset ({}) is not a valid 12h or 24h time; dimmer will not be used",
                self.dimmer.sunrise,
                self.dimmer.sunset
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.weather.enabled);
        assert!(!config.screensaver.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
boards:
  off_day: [clock, standings, scoreticker]
  pushbutton_board: standings
weather:
  enabled: true
  feed: owm
alerts:
  enabled: true
  update_minutes: 10
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.boards.off_day, vec!["clock", "standings", "scoreticker"]);
        assert_eq!(config.boards.pushbutton_board, "standings");
        assert!(config.weather.enabled);
        assert_eq!(config.weather.feed, "owm");
        assert_eq!(config.alerts.update_minutes, 10);
        // Untouched sections keep their defaults
        assert_eq!(config.boards.scheduled, vec!["clock"]);
        assert_eq!(config.alerts.feed, "ec");
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let path = PathBuf::from("/etc/scoreboard/custom.yml");
        assert_eq!(Config::locate(Some(&path)), Some(path));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/scoreboard.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "boards: [not, a, map").unwrap();
        let result = Config::load_from_file(file.path());
        assert!(matches!(result, Err(ScoreboardError::Yaml(_))));
    }

    #[test]
    fn test_validate_rejects_empty_sequence() {
        let mut config = Config::default();
        config.boards.intermission.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("intermission"));
    }

    #[test]
    fn test_validate_rejects_zero_display() {
        let mut config = Config::default();
        config.display.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_tolerates_bad_screensaver_time() {
        let mut config = Config::default();
        config.screensaver.enabled = true;
        config.screensaver.start = "25:99".to_string();
        assert!(config.validate().is_ok());
        assert!(config.screensaver.window().is_none());
    }
}
