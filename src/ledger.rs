// src/ledger.rs

//! Limiting state on top of the bucket window.

// dependencies
use tracing::debug;

use crate::config::{LimiterMode, RateLimiterConfig};
use crate::history::HistoryEntry;
use crate::window::BucketWindow;

/// Scheduling policy, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Always limiting; dispatches are spaced by `period / limit`.
    Naive,
    /// Limiting only once the current bucket reaches its budget.
    Burst,
}

impl Strategy {
    fn initially_limiting(self, window: &BucketWindow) -> bool {
        match self {
            Strategy::Naive => true,
            Strategy::Burst => window.budget() == 0,
        }
    }

    /// Roll the window forward before a request is counted.
    fn prepare(self, window: &mut BucketWindow, now: u64) {
        if self == Strategy::Burst {
            window.advance(now);
        }
    }

    /// Whether the window is limited after a request was counted.
    /// `None` means the strategy never re-evaluates.
    fn evaluate(self, window: &BucketWindow) -> Option<bool> {
        match self {
            Strategy::Naive => None,
            Strategy::Burst => Some(window.current() >= window.budget()),
        }
    }
}

impl From<LimiterMode> for Strategy {
    fn from(mode: LimiterMode) -> Self {
        match mode {
            LimiterMode::Naive => Strategy::Naive,
            LimiterMode::Burst => Strategy::Burst,
        }
    }
}

/// The bucketed request ledger. Mutated only by [`BucketLedger::tick`].
#[derive(Debug, Clone)]
pub(crate) struct BucketLedger {
    window: BucketWindow,
    strategy: Strategy,
    wait_nanos: u64,
    limiting: bool,
    last_request_nanos: Option<u64>,
}

impl BucketLedger {
    pub(crate) fn new(config: &RateLimiterConfig, now: u64) -> Self {
        let window = BucketWindow::new(config, now);
        let strategy = Strategy::from(config.mode);
        let limiting = strategy.initially_limiting(&window);
        debug!(
            ?strategy,
            budget = window.budget(),
            burst = window.burst(),
            limiting,
            "BucketLedger::new: created"
        );
        Self {
            window,
            strategy,
            wait_nanos: config.wait_nanos(),
            limiting,
            last_request_nanos: None,
        }
    }

    /// Account for one dispatched request at `now`.
    ///
    /// Returns the new limiting state when it changed.
    pub(crate) fn tick(&mut self, now: u64) -> Option<bool> {
        self.last_request_nanos = Some(now);
        self.strategy.prepare(&mut self.window, now);
        self.window.record();

        let limited = self.strategy.evaluate(&self.window)?;
        if limited == self.limiting {
            return None;
        }
        if limited {
            self.window.mark_limited(now);
        }
        self.limiting = limited;
        debug!(
            limiting = limited,
            current = self.window.current(),
            budget = self.window.budget(),
            "BucketLedger::tick: limiting changed"
        );
        Some(limited)
    }

    /// Nanoseconds until the next request may be dispatched.
    pub(crate) fn wait_time(&self, now: u64) -> u64 {
        if !self.limiting {
            return 0;
        }
        match self.last_request_nanos {
            Some(last) => self.wait_nanos.saturating_sub(now.saturating_sub(last)),
            None => 0,
        }
    }

    pub(crate) fn is_limiting(&self) -> bool {
        self.limiting
    }

    pub(crate) fn budget(&self) -> u64 {
        self.window.budget()
    }

    pub(crate) fn buckets(&self) -> Vec<u64> {
        self.window.buckets()
    }

    pub(crate) fn history(&self) -> Vec<HistoryEntry> {
        self.window.history()
    }
}
