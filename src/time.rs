use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar-day identifier, `YEAR-MONTH-DAY` with no zero padding (e.g. `2024-1-2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{}-{}-{}", date.year(), date.month(), date.day()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for DayKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

pub trait Clock {
    fn today(&self) -> NaiveDate;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// Wall clock. Uses the process-local timezone unless an IANA zone is configured.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    tz: Option<chrono_tz::Tz>,
}

impl SystemClock {
    pub fn local() -> Self {
        Self { tz: None }
    }

    pub fn with_tz(tz: &str) -> Result<Self> {
        Ok(Self { tz: Some(parse_tz(tz)?) })
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        match self.tz {
            Some(tz) => chrono::Utc::now().with_timezone(&tz).date_naive(),
            None => chrono::Local::now().date_naive(),
        }
    }
}

pub fn parse_tz(tz: &str) -> Result<chrono_tz::Tz> {
    tz.parse().map_err(|_| anyhow!("invalid tz: {tz}"))
}
