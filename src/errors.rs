// src/errors.rs

// error handling for the bucket limiter

// dependencies
use thiserror::Error;

use crate::clock::ClockError;

/// Error type for limiter configuration issues and task settlement.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("Time period must be positive")]
    InvalidTimePeriod,
    #[error("Request limit must be positive")]
    InvalidRequestLimit,
    #[error("Bucket count must be positive")]
    InvalidBucketCount,
    #[error("Minimum burst per bucket must be finite and non-negative")]
    InvalidBurst,
    #[error("Rate limitation speed must be finite and positive")]
    InvalidSpeed,
    #[error("History capacity must be positive when history is enabled")]
    InvalidHistoryCapacity,
    #[error("Clock error occurred: {0}")]
    Clock(#[from] ClockError),
    #[error("Operation panicked when invoked")]
    OperationPanicked,
    #[error("Task was cancelled before dispatch")]
    Cancelled,
    #[error("Rate limiter was dropped before the task settled")]
    Closed,
    #[error("Rate limiter must be created inside a tokio runtime")]
    NoRuntime,
}
