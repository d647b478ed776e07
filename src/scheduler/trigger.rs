//! Job triggers - when a job fires next.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rand::Rng;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, ScoreboardError};

/// Longest interval period or jitter an imported trigger may ask for.
pub const MAX_INTERVAL: Duration = Duration::from_secs(366 * 86_400);

/// Firing schedule for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Every `every`, shifted by a random offset within `±jitter`.
    Interval { every: Duration, jitter: Option<Duration> },
    /// Every day at a wall-clock time.
    Daily { at: NaiveTime },
    /// Once, at a fixed moment.
    Once { at: DateTime<Local> },
    /// Once, as soon as the job is added.
    Immediate,
}

impl Trigger {
    pub fn interval(every: Duration) -> Self {
        Trigger::Interval { every, jitter: None }
    }

    pub fn daily(at: NaiveTime) -> Self {
        Trigger::Daily { at }
    }

    pub fn once(at: DateTime<Local>) -> Self {
        Trigger::Once { at }
    }

    /// Add random jitter to an interval trigger. Other triggers are unchanged.
    pub fn with_jitter(self, jitter: Duration) -> Self {
        match self {
            Trigger::Interval { every, .. } if !jitter.is_zero() => Trigger::Interval {
                every,
                jitter: Some(jitter),
            },
            other => other,
        }
    }

    /// Whether the job is dropped after firing.
    pub fn is_one_shot(&self) -> bool {
        matches!(self, Trigger::Once { .. } | Trigger::Immediate)
    }

    /// Next fire time after `now`; `None` once a one-shot moment has passed.
    pub fn next_fire(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            Trigger::Interval { every, jitter } => {
                let mut millis = every.as_millis() as i64;
                if let Some(jitter) = jitter {
                    let spread = jitter.as_millis() as i64;
                    millis += rand::thread_rng().gen_range(-spread..=spread);
                }
                now.checked_add_signed(TimeDelta::milliseconds(millis.max(1000)))
            }
            Trigger::Daily { at } => {
                let today = local_at(now.date_naive(), *at);
                match today {
                    Some(when) if when > now => Some(when),
                    _ => now
                        .date_naive()
                        .checked_add_days(Days::new(1))
                        .and_then(|tomorrow| local_at(tomorrow, *at)),
                }
            }
            Trigger::Once { at } => (*at > now).then_some(*at),
            Trigger::Immediate => Some(now),
        }
    }

    /// Parse the trigger of an imported job description.
    ///
    /// Accepts a map with a `type` key (`interval`, `cron`, `date`) plus its
    /// parameters, or a bare type name whose parameters come from `extra`.
    /// A missing trigger means run once immediately.
    pub fn from_value(value: Option<&Value>, extra: &Map<String, Value>) -> Result<Self> {
        let (kind, params) = match value {
            None | Some(Value::Null) => return Ok(Trigger::Immediate),
            Some(Value::String(kind)) => (kind.clone(), extra.clone()),
            Some(Value::Object(map)) => {
                let kind = map
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ScoreboardError::InvalidTrigger("trigger map has no 'type'".to_string()))?
                    .to_string();
                let mut params = map.clone();
                params.remove("type");
                (kind, params)
            }
            Some(other) => {
                return Err(ScoreboardError::InvalidTrigger(format!("unsupported trigger value {}", other)));
            }
        };

        match kind.as_str() {
            "interval" => parse_interval(&params),
            "cron" => parse_cron(&params),
            "date" => parse_date(&params),
            other => Err(ScoreboardError::InvalidTrigger(format!("unknown trigger type '{}'", other))),
        }
    }
}

fn local_at(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Local>> {
    date.and_time(time).and_local_timezone(Local).earliest()
}

fn number(params: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ScoreboardError::InvalidTrigger(format!("'{}' is not a number: {}", key, s))),
        Some(other) => Err(ScoreboardError::InvalidTrigger(format!("'{}' is not a number: {}", key, other))),
    }
}

fn parse_interval(params: &Map<String, Value>) -> Result<Trigger> {
    const UNITS: [(&str, f64); 5] = [
        ("weeks", 604_800.0),
        ("days", 86_400.0),
        ("hours", 3_600.0),
        ("minutes", 60.0),
        ("seconds", 1.0),
    ];
    let mut seconds = 0.0;
    for (unit, scale) in UNITS {
        if let Some(value) = number(params, unit)? {
            seconds += value * scale;
        }
    }
    if seconds.is_nan() || seconds <= 0.0 {
        return Err(ScoreboardError::InvalidTrigger(
            "interval trigger needs a positive period".to_string(),
        ));
    }
    let trigger = Trigger::interval(bounded("interval period", seconds)?);
    match number(params, "jitter")? {
        Some(jitter) if jitter > 0.0 => Ok(trigger.with_jitter(bounded("jitter", jitter)?)),
        _ => Ok(trigger),
    }
}

fn bounded(what: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|duration| *duration <= MAX_INTERVAL)
        .ok_or_else(|| {
            ScoreboardError::InvalidTrigger(format!(
                "{} of {}s is out of range (at most {}s)",
                what,
                seconds,
                MAX_INTERVAL.as_secs()
            ))
        })
}

/// Whole, non-negative clock field; absent means 0.
fn clock_field(params: &Map<String, Value>, key: &str) -> Result<u32> {
    let value = number(params, key)?.unwrap_or(0.0);
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(ScoreboardError::InvalidTrigger(format!(
            "cron '{}' must be a whole number, got {}",
            key, value
        )));
    }
    Ok(value as u32)
}

fn parse_cron(params: &Map<String, Value>) -> Result<Trigger> {
    if let Some(key) = params.keys().find(|key| !matches!(key.as_str(), "hour" | "minute" | "second")) {
        return Err(ScoreboardError::InvalidTrigger(format!(
            "cron field '{}' is not supported (only hour, minute, second)",
            key
        )));
    }
    let hour = clock_field(params, "hour")?;
    let minute = clock_field(params, "minute")?;
    let second = clock_field(params, "second")?;
    NaiveTime::from_hms_opt(hour, minute, second)
        .map(Trigger::daily)
        .ok_or_else(|| ScoreboardError::InvalidTrigger(format!("invalid time {}:{}:{}", hour, minute, second)))
}

fn parse_date(params: &Map<String, Value>) -> Result<Trigger> {
    let raw = params
        .get("run_date")
        .and_then(Value::as_str)
        .ok_or_else(|| ScoreboardError::InvalidTrigger("date trigger needs 'run_date'".to_string()))?;

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Trigger::once(at.with_timezone(&Local)));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(Trigger::once)
        .ok_or_else(|| ScoreboardError::InvalidTrigger(format!("unparseable run_date '{}'", raw)))
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval { every, jitter: None } => write!(f, "interval[{}s]", every.as_secs()),
            Trigger::Interval {
                every,
                jitter: Some(jitter),
            } => write!(f, "interval[{}s ±{}s]", every.as_secs(), jitter.as_secs()),
            Trigger::Daily { at } => write!(f, "daily[{}]", at.format("%H:%M:%S")),
            Trigger::Once { at } => write!(f, "date[{}]", at.format("%Y-%m-%d %H:%M:%S")),
            Trigger::Immediate => write!(f, "immediate"),
        }
    }
}
