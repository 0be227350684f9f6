// src/config.rs

//! Configuration types for the bucket limiter

// dependencies
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::LimiterError;

/// Scheduling policy selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimiterMode {
    /// Every request is spaced evenly across the whole time period.
    Naive,
    /// Requests flow freely until the current bucket's budget is spent.
    #[default]
    Burst,
}

/// Configuration for rate limiter behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Length of the rolling window in seconds
    #[serde(default = "default_time_period_secs")]
    pub(crate) time_period_secs: u64,

    /// Requests allowed per rolling window
    #[serde(default = "default_request_limit")]
    pub(crate) request_limit: u64,

    /// Number of buckets the window is split into
    #[serde(default = "default_bucket_count")]
    pub(crate) bucket_count: u64,

    #[serde(default)]
    pub(crate) mode: LimiterMode,

    /// Overrides the derived budget floor
    #[serde(default)]
    pub(crate) minimum_burst_per_bucket: Option<f64>,

    /// Overrides the derived guaranteed throughput, in requests per second
    #[serde(default)]
    pub(crate) rate_limitation_speed: Option<f64>,

    #[serde(default)]
    pub(crate) history_enabled: bool,

    /// Maximum number of retained history entries
    #[serde(default = "default_history_capacity")]
    pub(crate) history_capacity: usize,
}

fn default_time_period_secs() -> u64 {
    3600
}

fn default_request_limit() -> u64 {
    4896
}

fn default_bucket_count() -> u64 {
    12
}

fn default_history_capacity() -> usize {
    1024
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(default_time_period_secs(), default_request_limit())
    }
}

impl RateLimiterConfig {
    /// Create a new configuration with a time period and request limit,
    /// leaving everything else at its default
    pub fn new(time_period_secs: u64, request_limit: u64) -> Self {
        Self {
            time_period_secs,
            request_limit,
            bucket_count: default_bucket_count(),
            mode: LimiterMode::default(),
            minimum_burst_per_bucket: None,
            rate_limitation_speed: None,
            history_enabled: false,
            history_capacity: default_history_capacity(),
        }
    }

    /// Builder-style: set the time period in seconds
    pub fn time_period(mut self, time_period_secs: u64) -> Self {
        self.time_period_secs = time_period_secs;
        self
    }

    /// Builder-style: set the request limit
    pub fn request_limit(mut self, request_limit: u64) -> Self {
        self.request_limit = request_limit;
        self
    }

    /// Builder-style: set the bucket count
    pub fn bucket_count(mut self, bucket_count: u64) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Builder-style: set the scheduling mode
    pub fn mode(mut self, mode: LimiterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder-style: set the minimum burst per bucket
    pub fn minimum_burst_per_bucket(mut self, burst: f64) -> Self {
        self.minimum_burst_per_bucket = Some(burst);
        self
    }

    /// Builder-style: set the guaranteed speed in requests per second
    pub fn rate_limitation_speed(mut self, requests_per_second: f64) -> Self {
        self.rate_limitation_speed = Some(requests_per_second);
        self
    }

    /// Builder-style: enable or disable the history log
    pub fn history(mut self, enabled: bool) -> Self {
        self.history_enabled = enabled;
        self
    }

    /// Builder-style: set the history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Length of one bucket
    pub fn bucket_length(&self) -> Duration {
        Duration::from_nanos(self.bucket_length_nanos())
    }

    pub(crate) fn bucket_length_nanos(&self) -> u64 {
        (self.time_period_secs as u128 * 1_000_000_000 / self.bucket_count.max(1) as u128) as u64
    }

    /// Minimum requests per bucket guaranteed once limiting engages
    pub fn rate_per_bucket(&self) -> u64 {
        match self.rate_limitation_speed {
            Some(speed) => {
                (speed * self.time_period_secs as f64 / self.bucket_count as f64).floor() as u64
            }
            None => self.request_limit / self.bucket_count.max(1).saturating_mul(2),
        }
    }

    /// Floor below which the budget never falls
    pub fn burst_per_bucket(&self) -> u64 {
        match self.minimum_burst_per_bucket {
            Some(burst) => burst.floor() as u64,
            None => self.request_limit / self.bucket_count.max(1).saturating_mul(12),
        }
    }

    /// Minimum spacing between dispatches while limiting
    pub fn wait_time(&self) -> Duration {
        Duration::from_nanos(self.wait_nanos())
    }

    /// A burst rate that floors to zero is spaced as if it were one per bucket.
    pub(crate) fn wait_nanos(&self) -> u64 {
        let period_nanos = self.time_period_secs as f64 * 1_000_000_000.0;
        match self.mode {
            LimiterMode::Naive => (period_nanos / self.request_limit as f64) as u64,
            LimiterMode::Burst => {
                let rate = self.rate_per_bucket().max(1) as f64;
                (period_nanos / self.bucket_count as f64 / rate) as u64
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LimiterError> {
        if self.time_period_secs == 0 {
            return Err(LimiterError::InvalidTimePeriod);
        }
        if self.request_limit == 0 {
            return Err(LimiterError::InvalidRequestLimit);
        }
        if self.bucket_count == 0 {
            return Err(LimiterError::InvalidBucketCount);
        }
        if let Some(burst) = self.minimum_burst_per_bucket {
            if !burst.is_finite() || burst < 0.0 {
                return Err(LimiterError::InvalidBurst);
            }
        }
        if let Some(speed) = self.rate_limitation_speed {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(LimiterError::InvalidSpeed);
            }
        }
        if self.history_enabled && self.history_capacity == 0 {
            return Err(LimiterError::InvalidHistoryCapacity);
        }
        Ok(())
    }
}
