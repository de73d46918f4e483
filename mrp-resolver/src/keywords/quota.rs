//! Per-provider daily call budgets
//!
//! Counters reset lazily: every check first compares the stored reset day with
//! the current day and clears all counters when they differ. There is no timer.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Daily usage counters for text-generation providers
#[derive(Debug, Default)]
pub struct QuotaTracker {
    used: BTreeMap<String, u32>,
    last_reset: Option<NaiveDate>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if self.last_reset != Some(today) {
            if self.last_reset.is_some() {
                tracing::debug!(day = %today, "Resetting provider quotas");
            }
            self.used.clear();
            self.last_reset = Some(today);
        }
    }

    /// Count one call against `provider` if it is under `daily_limit`
    ///
    /// Returns false, without counting, when the budget is spent.
    pub fn try_acquire(&mut self, provider: &str, daily_limit: u32, today: NaiveDate) -> bool {
        self.roll_over(today);
        let used = self.used.entry(provider.to_string()).or_insert(0);
        if *used >= daily_limit {
            return false;
        }
        *used += 1;
        true
    }

    /// Force a provider's counter (e.g. after a provider reports its own limit)
    pub fn exhaust(&mut self, provider: &str, daily_limit: u32, today: NaiveDate) {
        self.roll_over(today);
        self.used.insert(provider.to_string(), daily_limit);
    }

    /// Snapshot of today's counters
    pub fn snapshot(&mut self, today: NaiveDate) -> BTreeMap<String, u32> {
        self.roll_over(today);
        self.used.clone()
    }
}
