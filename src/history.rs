// src/history.rs

//! Trailing record of discarded bucket occupancy

// dependencies
use std::collections::VecDeque;

/// One discarded bucket that held at least one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Requests recorded in the bucket
    pub amount: u64,
    /// Start time of the bucket, in clock nanoseconds
    pub time: u64,
    /// When limiting last engaged before the bucket was discarded
    pub limit_at: Option<u64>,
}

/// Bounded ring of history entries, oldest first.
#[derive(Debug, Clone)]
pub(crate) struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one when full.
    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub(crate) fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().copied().collect()
    }
}
