// src/window.rs

//! Rolling window of request buckets and the budget forecast.
//!
//! The window is split into `bucket_count` buckets. Index 0 is the oldest
//! bucket and the last index is the bucket currently receiving requests.
//! The budget says how many requests the current bucket may hold before
//! limiting must engage, assuming every future bucket consumes `rate + burst`.

// dependencies
use std::collections::VecDeque;
use tracing::debug;

use crate::config::RateLimiterConfig;
use crate::history::{HistoryEntry, HistoryLog};

#[derive(Debug, Clone)]
pub(crate) struct BucketWindow {
    buckets: VecDeque<u64>,
    bucket_start_nanos: u64,
    bucket_length_nanos: u64,
    request_limit: u64,
    rate: u64,
    burst: u64,
    budget: u64,
    history: Option<HistoryLog>,
    limit_at: Option<u64>,
}

impl BucketWindow {
    /// Build a zeroed window whose current bucket starts at `now`.
    pub(crate) fn new(config: &RateLimiterConfig, now: u64) -> Self {
        let history = config
            .history_enabled
            .then(|| HistoryLog::new(config.history_capacity));

        let mut window = Self {
            buckets: VecDeque::from(vec![0; config.bucket_count as usize]),
            bucket_start_nanos: now,
            bucket_length_nanos: config.bucket_length_nanos().max(1),
            request_limit: config.request_limit,
            rate: config.rate_per_bucket(),
            burst: config.burst_per_bucket(),
            budget: 0,
            history,
            limit_at: None,
        };
        window.budget = window.calculate_budget();
        window
    }

    /// Forecast the budget of the current bucket.
    ///
    /// For each lookahead `k` in `1..=N` the remaining quota is
    /// `L - (rate + burst) * k - sum(buckets[k-1..])`. The budget is the
    /// smallest remaining quota minus `rate`, floored at `burst`.
    pub(crate) fn calculate_budget(&self) -> u64 {
        let per_bucket = (self.rate + self.burst) as i128;
        let mut suffix: i128 = self.buckets.iter().map(|&b| b as i128).sum();
        let mut lowest = i128::MAX;

        for (offset, &bucket) in self.buckets.iter().enumerate() {
            let k = offset as i128 + 1;
            let remaining = self.request_limit as i128 - per_bucket * k - suffix;
            lowest = lowest.min(remaining);
            suffix -= bucket as i128;
        }

        let budget = lowest.saturating_sub(self.rate as i128);
        budget.max(self.burst as i128) as u64
    }

    /// Shift the window forward if more than one bucket length has elapsed
    /// since the current bucket started. Returns the number of steps taken.
    pub(crate) fn advance(&mut self, now: u64) -> u64 {
        let elapsed = now.saturating_sub(self.bucket_start_nanos);
        if elapsed <= self.bucket_length_nanos {
            return 0;
        }
        let steps = elapsed / self.bucket_length_nanos;
        self.shift(steps);
        steps
    }

    /// Discard the `steps` oldest buckets and open as many empty ones.
    pub(crate) fn shift(&mut self, steps: u64) {
        if steps == 0 {
            return;
        }
        let count = self.buckets.len();
        let discarded = (steps as usize).min(count);

        if self.history.is_some() {
            for index in 0..discarded {
                let amount = self.buckets[index];
                if amount == 0 {
                    continue;
                }
                let age = (count - 1 - index) as u64;
                let entry = HistoryEntry {
                    amount,
                    time: self
                        .bucket_start_nanos
                        .saturating_sub(age.saturating_mul(self.bucket_length_nanos)),
                    limit_at: self.limit_at.take(),
                };
                if let Some(history) = self.history.as_mut() {
                    history.push(entry);
                }
            }
        }

        for _ in 0..discarded {
            self.buckets.pop_front();
            self.buckets.push_back(0);
        }

        self.bucket_start_nanos = self
            .bucket_start_nanos
            .saturating_add(steps.saturating_mul(self.bucket_length_nanos));
        self.budget = self.calculate_budget();
        debug!(steps, budget = self.budget, "BucketWindow::shift: shifted");
    }

    /// Count one request against the current bucket and return its total.
    pub(crate) fn record(&mut self) -> u64 {
        match self.buckets.back_mut() {
            Some(current) => {
                *current += 1;
                *current
            }
            None => 0,
        }
    }

    /// Remember when limiting engaged, for the next history entry.
    pub(crate) fn mark_limited(&mut self, now: u64) {
        self.limit_at = Some(now);
    }

    pub(crate) fn current(&self) -> u64 {
        self.buckets.back().copied().unwrap_or(0)
    }

    pub(crate) fn budget(&self) -> u64 {
        self.budget
    }

    pub(crate) fn burst(&self) -> u64 {
        self.burst
    }

    pub(crate) fn buckets(&self) -> Vec<u64> {
        self.buckets.iter().copied().collect()
    }

    pub(crate) fn history(&self) -> Vec<HistoryEntry> {
        self.history
            .as_ref()
            .map(HistoryLog::snapshot)
            .unwrap_or_default()
    }
}
