//! Delivery statistics for a watcher.
//!
//! A watcher is driven by one caller at a time, so the counters are plain
//! integers updated through `&mut self`.
//!
//! # Examples
//!
//! ```
//! use sw_watcher::WatchStats;
//!
//! let mut stats = WatchStats::new();
//! stats.record_read();
//! stats.record_overflow();
//! assert_eq!(stats.reads, 1);
//! assert!(stats.lost_events());
//! ```

use serde::{Deserialize, Serialize};

/// Counters describing what a watcher has done since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStats {
    /// Completed reads that returned data, overflowed, or woke spuriously.
    pub reads: u64,
    /// Events handed to the caller.
    pub events_delivered: u64,
    /// Reads where the kernel reported lost events.
    pub overflows: u64,
    /// Times the asynchronous read was re-armed after a completion.
    pub rearms: u64,
    /// Decoded changes discarded because their category was not requested.
    pub dropped_by_filter: u64,
}

impl WatchStats {
    /// Creates a [`WatchStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a completed read.
    #[inline]
    pub fn record_read(&mut self) {
        self.reads += 1;
    }

    /// Counts an event returned to the caller.
    #[inline]
    pub fn record_delivered(&mut self) {
        self.events_delivered += 1;
    }

    /// Counts a buffer overflow.
    #[inline]
    pub fn record_overflow(&mut self) {
        self.overflows += 1;
    }

    /// Counts a re-arm.
    #[inline]
    pub fn record_rearm(&mut self) {
        self.rearms += 1;
    }

    /// Counts a change dropped by the category filter.
    #[inline]
    pub fn record_filtered(&mut self) {
        self.dropped_by_filter += 1;
    }

    /// Returns `true` if any events are known to have been lost.
    #[inline]
    #[must_use]
    pub const fn lost_events(&self) -> bool {
        self.overflows > 0
    }
}
