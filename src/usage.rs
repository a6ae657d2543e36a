//! Day-scoped usage counter for privileged calls.
//!
//! The count resets lazily: a stored record whose `date` is not today's key
//! reads as zero, and is only replaced on the next write. Nothing runs on a
//! timer.
//!
//! `increment_usage` is a plain read-then-write. Two processes sharing the
//! same store can both read `n` and both write `n + 1`. The quota is advisory
//! bookkeeping for the local client, so that race is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{KvStore, StoreError};
use crate::time::{Clock, DayKey};

pub const DEFAULT_USAGE_KEY: &str = "groq_usage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: DayKey,
    pub count: u64,
}

impl UsageRecord {
    pub fn fresh(date: DayKey) -> Self {
        Self { date, count: 0 }
    }
}

/// Persisted value that is present but not a usage record.
#[derive(Debug, Error)]
#[error("corrupt usage record: {0}")]
pub struct CorruptState(#[from] serde_json::Error);

/// Strict decode: unknown shapes, missing fields, and negative or fractional
/// counts are all corrupt.
pub fn parse(raw: &str) -> Result<UsageRecord, CorruptState> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageStatus {
    pub count: u64,
    pub limit: u64,
}

impl UsageStatus {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }

    pub fn is_over_limit(&self) -> bool {
        self.count >= self.limit
    }
}

impl fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.count, self.limit)
    }
}

pub struct UsageTracker<S, C> {
    store: S,
    clock: C,
    key: String,
}

impl<S: KvStore, C: Clock> UsageTracker<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_key(store, clock, DEFAULT_USAGE_KEY)
    }

    pub fn with_key(store: S, clock: C, key: impl Into<String>) -> Self {
        Self { store, clock, key: key.into() }
    }

    pub fn current_day_key(&self) -> DayKey {
        DayKey::from_date(self.clock.today())
    }

    /// Never writes. Missing, corrupt, or stale records read as a fresh day.
    pub fn get_usage(&self) -> Result<UsageRecord, StoreError> {
        let today = self.current_day_key();
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(UsageRecord::fresh(today));
        };

        match parse(&raw) {
            Ok(record) if record.date == today => Ok(record),
            Ok(stale) => {
                debug!(key = %self.key, stored = %stale.date, today = %today, "usage.stale");
                Ok(UsageRecord::fresh(today))
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "usage.corrupt");
                Ok(UsageRecord::fresh(today))
            }
        }
    }

    pub fn set_usage(&self, count: u64) -> Result<(), StoreError> {
        let record = UsageRecord { date: self.current_day_key(), count };
        let raw = serde_json::to_string(&record)?;
        self.store.set(&self.key, &raw)
    }

    pub fn increment_usage(&self) -> Result<u64, StoreError> {
        let current = self.get_usage()?;
        let new_count = current.count.saturating_add(1);
        self.set_usage(new_count)?;
        info!(key = %self.key, date = %current.date, count = new_count, "usage.increment");
        Ok(new_count)
    }

    pub fn is_over_limit(&self, limit: u64) -> Result<bool, StoreError> {
        Ok(self.get_usage()?.count >= limit)
    }

    pub fn remaining(&self, limit: u64) -> Result<u64, StoreError> {
        Ok(self.status(limit)?.remaining())
    }

    pub fn status(&self, limit: u64) -> Result<UsageStatus, StoreError> {
        Ok(UsageStatus { count: self.get_usage()?.count, limit })
    }
}
