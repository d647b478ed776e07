//! Background feature settings: weather, alerts, updates, dimmer, screensaver.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Parse a wall-clock time in 24h (`22:30`) or 12h (`10:30 PM`) form.
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%I:%M %p"))
        .ok()
}

/// Panel geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Starting brightness, 0-100.
    pub brightness: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            brightness: 100,
        }
    }
}

/// Weather data and forecast refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    /// Data provider: `ec` or `owm`.
    pub feed: String,
    pub update_minutes: u64,
    pub forecast_enabled: bool,
    pub forecast_update_hours: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feed: "ec".to_string(),
            update_minutes: 60,
            forecast_enabled: false,
            forecast_update_hours: 1,
        }
    }
}

/// Weather alert polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    /// Alert provider: `ec` or `nws`.
    pub feed: String,
    pub update_minutes: u64,
    /// Random delay added to each poll.
    pub jitter_seconds: u64,
    /// Local JSON file the alert feed reads from.
    pub source_file: Option<std::path::PathBuf>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feed: "ec".to_string(),
            update_minutes: 5,
            jitter_seconds: 90,
            source_file: None,
        }
    }
}

/// Release update checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdateCheckConfig {
    pub enabled: bool,
    pub repo: String,
    pub interval_hours: u64,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo: String::new(),
            interval_hours: 24,
        }
    }
}

/// Day/night brightness.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DimmerConfig {
    pub enabled: bool,
    pub update_minutes: u64,
    pub day_brightness: u8,
    pub night_brightness: u8,
    pub sunrise: String,
    pub sunset: String,
}

impl Default for DimmerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            update_minutes: 5,
            day_brightness: 100,
            night_brightness: 20,
            sunrise: "07:00".to_string(),
            sunset: "19:00".to_string(),
        }
    }
}

impl DimmerConfig {
    /// Parsed (sunrise, sunset), or None if either is malformed.
    pub fn daylight(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_clock_time(&self.sunrise)?, parse_clock_time(&self.sunset)?))
    }
}

/// Nightly screensaver window.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScreensaverConfig {
    pub enabled: bool,
    pub start: String,
    pub stop: String,
    /// Keep background data jobs running while the screensaver is up.
    pub data_updates: bool,
}

impl Default for ScreensaverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "22:00".to_string(),
            stop: "06:00".to_string(),
            data_updates: false,
        }
    }
}

impl ScreensaverConfig {
    /// Parsed (start, stop), or None if either is malformed.
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_clock_time(&self.start)?, parse_clock_time(&self.stop)?))
    }
}

/// Line-oriented remote commands.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_time_24h() {
        assert_eq!(parse_clock_time("22:30"), NaiveTime::from_hms_opt(22, 30, 0));
        assert_eq!(parse_clock_time(" 06:05 "), NaiveTime::from_hms_opt(6, 5, 0));
    }

    #[test]
    fn test_parse_clock_time_12h() {
        assert_eq!(parse_clock_time("10:30 PM"), NaiveTime::from_hms_opt(22, 30, 0));
        assert_eq!(parse_clock_time("7:15 AM"), NaiveTime::from_hms_opt(7, 15, 0));
    }

    #[test]
    fn test_parse_clock_time_invalid() {
        assert!(parse_clock_time("").is_none());
        assert!(parse_clock_time("25:00").is_none());
        assert!(parse_clock_time("noon").is_none());
    }

    #[test]
    fn test_screensaver_window() {
        let config = ScreensaverConfig::default();
        let (start, stop) = config.window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(stop, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    }
}
