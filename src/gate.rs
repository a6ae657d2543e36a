use std::future::Future;

use tracing::{info, warn};

use crate::error::QuotaError;
use crate::store::KvStore;
use crate::time::Clock;
use crate::usage::{UsageStatus, UsageTracker};

/// Runs privileged actions against a daily limit.
///
/// The check happens before the action and the increment only after it
/// succeeds, so failed calls are not charged.
pub struct QuotaGate<S, C> {
    tracker: UsageTracker<S, C>,
    limit: u64,
}

impl<S: KvStore, C: Clock> QuotaGate<S, C> {
    pub fn new(tracker: UsageTracker<S, C>, limit: u64) -> Self {
        Self { tracker, limit }
    }

    pub fn tracker(&self) -> &UsageTracker<S, C> {
        &self.tracker
    }

    pub fn status(&self) -> Result<UsageStatus, QuotaError> {
        Ok(self.tracker.status(self.limit)?)
    }

    pub async fn run<F, Fut, T>(&self, action: F) -> Result<T, QuotaError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QuotaError>>,
    {
        let status = self.status()?;
        if status.is_over_limit() {
            warn!(used = status.count, limit = self.limit, "gate.refused");
            return Err(QuotaError::QuotaExceeded { used: status.count, limit: self.limit });
        }

        let out = action().await?;
        let used = self.tracker.increment_usage()?;
        info!(used, limit = self.limit, "gate.charged");
        Ok(out)
    }
}
