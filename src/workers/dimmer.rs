//! Day/night brightness.

use chrono::{Local, NaiveTime};
use std::sync::Arc;
use std::time::Duration;

use crate::config::DimmerConfig;
use crate::context::AppContext;
use crate::display::Display;
use crate::error::Result;
use crate::scheduler::{JobArgs, JobScheduler, JobSpec, Trigger};
use crate::workers::unusable;

/// Brightness for `now`, or `None` if sunrise/sunset do not parse.
pub fn brightness_at(config: &DimmerConfig, now: NaiveTime) -> Option<u8> {
    let (sunrise, sunset) = config.daylight()?;
    let day = if sunrise <= sunset {
        sunrise <= now && now < sunset
    } else {
        now >= sunrise || now < sunset
    };
    Some(if day {
        config.day_brightness
    } else {
        config.night_brightness
    })
}

/// Reads the dimmer settings live, so reloads apply on the next run.
pub struct DimmerWorker {
    app: Arc<AppContext>,
    display: Arc<dyn Display>,
}

impl DimmerWorker {
    pub fn new(app: Arc<AppContext>, display: Arc<dyn Display>) -> Arc<Self> {
        Arc::new(Self { app, display })
    }

    pub fn update(&self) -> Result<()> {
        let config = self.app.config();
        let brightness = brightness_at(&config.dimmer, Local::now().time())
            .ok_or_else(|| unusable("dimmer", "sunrise/sunset must be HH:MM or h:MM AM/PM"))?;
        if self.display.brightness() != brightness {
            log::info!("Dimmer: setting brightness to {}", brightness);
            self.display.set_brightness(brightness);
        }
        Ok(())
    }

    pub fn start(self: Arc<Self>, job_id: &str, every: Duration, scheduler: &dyn JobScheduler) -> Result<()> {
        self.update()?;
        let worker = self.clone();
        scheduler.add_job(JobSpec::new(job_id, Trigger::interval(every), move |_: &JobArgs| worker.update()).with_name("Dimmer"))?;
        log::info!("Scheduled dimmer (id={})", job_id);
        Ok(())
    }
}
