//! Watcher lifecycle and the arm / wait / read / decode cycle.
//!
//! ```text
//!            start ok                 read ok, re-arm ok
//!  Created ───────────► Watching ◄──────────────┐
//!     │                   │  └──────────────────┘
//!     │ open/arm fails    │ read or re-arm fails
//!     ▼                   ▼
//!   Failed ◄──────────────┘
//!
//!  any state ── close ──► Closed
//! ```
//!
//! [`Machine`] is generic over the [`NotificationSource`] so the cycle can be
//! exercised against a scripted source in tests.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use sw_core::{ChangeEvent, ChangeFilter, RenamePolicy};

use crate::decode::{RawAction, RawChange};
use crate::error::WatchError;
use crate::filter::admits;
use crate::platform::{Completion, NotificationSource};
use crate::rename::RenamePairer;
use crate::stats::WatchStats;

/// How long a blocking wait lingers for the second half of a rename.
pub(crate) const RENAME_GRACE: Duration = Duration::from_millis(20);

/// Lifecycle state of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    /// Resources are open but no read has been armed.
    Created,
    /// A read is armed and events are being collected.
    Watching,
    /// An error stopped the watcher; queued events can still be drained.
    Failed,
    /// Resources have been released.
    Closed,
}

impl WatcherState {
    /// Returns `true` once no further events can be produced.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Watching => "watching",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Drives one [`NotificationSource`] and buffers the events it produces.
#[derive(Debug)]
pub(crate) struct Machine<S> {
    path: Utf8PathBuf,
    state: WatcherState,
    source: Option<S>,
    filter: ChangeFilter,
    pairer: RenamePairer,
    queue: VecDeque<ChangeEvent>,
    scratch: Vec<RawChange>,
    stats: WatchStats,
    error: Option<WatchError>,
}

impl<S: NotificationSource> Machine<S> {
    /// Wraps the outcome of opening a source.
    ///
    /// A failed open yields a machine already in [`WatcherState::Failed`].
    pub(crate) fn new(
        path: Utf8PathBuf,
        opened: Result<S, WatchError>,
        filter: ChangeFilter,
        policy: RenamePolicy,
    ) -> Self {
        let mut machine = Self {
            path,
            state: WatcherState::Created,
            source: None,
            filter,
            pairer: RenamePairer::new(policy),
            queue: VecDeque::new(),
            scratch: Vec::new(),
            stats: WatchStats::new(),
            error: None,
        };
        match opened {
            Ok(source) => machine.source = Some(source),
            Err(err) => machine.fail(err),
        }
        machine
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub(crate) const fn state(&self) -> WatcherState {
        self.state
    }

    pub(crate) const fn stats(&self) -> WatchStats {
        self.stats
    }

    pub(crate) const fn error(&self) -> Option<&WatchError> {
        self.error.as_ref()
    }

    /// Arms the first read. Returns `true` if the machine is watching afterwards.
    pub(crate) fn start(&mut self) -> bool {
        match self.state {
            WatcherState::Watching => true,
            WatcherState::Failed => false,
            WatcherState::Closed => {
                self.record(WatchError::Closed);
                false
            }
            WatcherState::Created => {
                let Some(source) = self.source.as_mut() else {
                    self.fail(WatchError::Closed);
                    return false;
                };
                match source.arm() {
                    Ok(()) => {
                        self.state = WatcherState::Watching;
                        tracing::info!(path = %self.path, "Watcher started");
                        true
                    }
                    Err(err) => {
                        self.fail(WatchError::ArmFailed(err));
                        false
                    }
                }
            }
        }
    }

    /// Returns the next event, blocking for at most `timeout`.
    ///
    /// `None` blocks until an event arrives or the watcher fails. A zero
    /// timeout performs a single readiness check.
    pub(crate) fn next_event(&mut self, timeout: Option<Duration>) -> Option<ChangeEvent> {
        if let Some(event) = self.pop() {
            return Some(event);
        }

        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        while self.state == WatcherState::Watching {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let wait_for = if self.pairer.has_pending() {
                Some(remaining.map_or(RENAME_GRACE, |r| r.min(RENAME_GRACE)))
            } else {
                remaining
            };

            let ready = match self.source.as_mut().map(|s| s.wait_ready(wait_for)) {
                Some(Ok(ready)) => ready,
                Some(Err(err)) => {
                    self.fail(WatchError::ReadFailed(err));
                    break;
                }
                None => break,
            };

            if ready {
                self.cycle();
            } else if self.pairer.has_pending() {
                // Nothing new arrived, so held rename halves will not be paired.
                self.pairer.flush(&mut self.queue);
            }

            if let Some(event) = self.pop() {
                return Some(event);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
        }

        self.pop()
    }

    /// Cancels the outstanding read, releases the source and drops queued events.
    pub(crate) fn close(&mut self) {
        if self.state == WatcherState::Closed {
            return;
        }
        if let Some(mut source) = self.source.take() {
            source.cancel_and_close();
        }
        let discarded = self.queue.len();
        self.queue.clear();
        self.pairer.clear();
        self.state = WatcherState::Closed;
        tracing::info!(path = %self.path, discarded, "Watcher closed");
    }

    /// Collects one completed read and re-arms.
    fn cycle(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };

        self.stats.record_read();
        let completion = source.read_result();
        match completion {
            Ok(Completion::Data(len)) => {
                self.scratch.clear();
                source.decode(len, &mut self.scratch);
            }
            Ok(Completion::Overflow) => self.scratch.push(RawChange::overflow()),
            Ok(Completion::Spurious) => {
                tracing::trace!(path = %self.path, "Spurious wake-up");
            }
            Err(err) => {
                self.fail(WatchError::ReadFailed(err));
                return;
            }
        }

        let rearmed = source.arm();

        let filter = self.filter;
        let stats = &mut self.stats;
        let path = &self.path;
        self.scratch.retain(|change| {
            if change.action == RawAction::Overflow {
                stats.record_overflow();
                tracing::warn!(
                    path = %path,
                    error = %WatchError::DecodeOverflow,
                    overflows = stats.overflows,
                    "Change events dropped by the kernel"
                );
                return false;
            }
            let admitted = admits(filter, change);
            if !admitted {
                stats.record_filtered();
            }
            admitted
        });

        let before = self.queue.len();
        self.pairer.process(self.scratch.drain(..), &mut self.queue);
        tracing::debug!(
            path = %self.path,
            queued = self.queue.len() - before,
            "Read cycle complete"
        );

        match rearmed {
            Ok(()) => self.stats.record_rearm(),
            Err(err) => self.fail(WatchError::ArmFailed(err)),
        }
    }

    fn pop(&mut self) -> Option<ChangeEvent> {
        let event = self.queue.pop_front()?;
        self.stats.record_delivered();
        Some(event)
    }

    /// Keeps the first error; later ones are only logged.
    fn record(&mut self, err: WatchError) {
        tracing::warn!(path = %self.path, error = %err, "Watcher error");
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn fail(&mut self, err: WatchError) {
        self.record(err);
        if let Some(mut source) = self.source.take() {
            source.cancel_and_close();
        }
        // Held rename halves will never be paired now.
        self.pairer.flush(&mut self.queue);
        self.state = WatcherState::Failed;
    }
}
