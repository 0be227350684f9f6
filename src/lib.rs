// src/lib.rs

//! # Bucket Limiter
//!
//! An admission-control scheduler that throttles outbound async operations
//! against a fixed quota over a rolling time window, while still allowing
//! short bursts.
//!
//! The window is split into buckets. In burst mode the limiter forecasts how
//! many requests the current bucket may absorb and only starts spacing
//! dispatches once that budget is spent. In naive mode every dispatch is
//! spaced evenly across the whole period.
//!
//! ## Quick Example
//!
//! ```rust
//! use bucket_limiter::{RateLimiter, RateLimiterConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bucket_limiter::LimiterError> {
//! let config = RateLimiterConfig::new(3600, 4896).bucket_count(12);
//! let limiter = RateLimiter::new(config)?;
//!
//! limiter.add_listener(|limiting| println!("limiting: {limiting}"));
//!
//! let status = limiter.enqueue(|| async { 200 }).await?;
//! assert_eq!(status, 200);
//! # Ok(())
//! # }
//! ```

// private modules
mod clock;
mod config;
mod errors;
mod history;
mod ledger;
mod listeners;
mod queue;
mod rate_limiter;
mod window;

// public API exports
pub use clock::{Clock, ClockError, MonotonicClock, SystemClock};
pub use config::{LimiterMode, RateLimiterConfig};
pub use errors::LimiterError;
pub use history::HistoryEntry;
pub use listeners::ListenerId;
pub use queue::Ticket;
pub use rate_limiter::RateLimiter;
