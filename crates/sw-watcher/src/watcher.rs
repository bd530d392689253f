//! The public watcher handle.
//!
//! This module provides the [`Watcher`] type, which owns the platform
//! notification source for one directory and hands out normalized
//! [`ChangeEvent`]s one at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Watcher                               │
//! │  ┌────────────────┐   ┌──────────┐   ┌────────┐   ┌───────────┐  │
//! │  │ Source         │ → │ decode   │ → │ filter │ → │ rename    │  │
//! │  │ (inotify/RDCW) │   │ (bytes)  │   │        │   │ pairing   │  │
//! │  └───────▲────────┘   └──────────┘   └────────┘   └─────┬─────┘  │
//! │          │ re-arm                                       │        │
//! │          └──────────────── cycle ◄──── event queue ◄────┘        │
//! └──────────────────────────────────────────────────────────────────┘
//!                                              │ poll / wait
//!                                              ▼
//!                                           caller
//! ```
//!
//! Everything runs on the caller's thread: `poll` and `wait` drive the cycle
//! themselves. No operation returns an error; failures move the watcher to
//! [`WatcherState::Failed`] and are reported by [`Watcher::last_error`].
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use sw_core::{ChangeFilter, WatchRequest};
//! use sw_watcher::Watcher;
//!
//! let request = WatchRequest::new("/var/log", false, ChangeFilter::NAME);
//! let mut watcher = Watcher::create(request);
//!
//! if !watcher.start() {
//!     eprintln!("cannot watch: {}", watcher.last_error().unwrap_or_default());
//!     return;
//! }
//!
//! while let Some(event) = watcher.wait(Some(Duration::from_secs(5))) {
//!     println!("{event}");
//! }
//! ```

use std::cell::Cell;
use std::marker::PhantomData;
use std::time::Duration;

use camino::Utf8Path;
use sw_core::{ChangeEvent, WatchConfig, WatchRequest};

use crate::error::WatchError;
use crate::platform::{self, Source};
use crate::state::{Machine, WatcherState};
use crate::stats::WatchStats;

/// A handle watching one directory for changes.
///
/// # Lifecycle
///
/// 1. **Creation**: [`Watcher::create`] validates the request and opens the
///    OS notification resource. It never fails; a problem leaves the handle
///    in [`WatcherState::Failed`] with the error recorded.
///
/// 2. **Start**: [`Watcher::start`] arms the first read. With
///    [`WatchConfig::auto_start`] this happens during creation.
///
/// 3. **Delivery**: [`Watcher::poll`] checks without blocking,
///    [`Watcher::wait`] blocks up to a timeout. Each call returns at most one
///    event; events from one read are delivered in the order the OS reported
///    them.
///
/// 4. **Shutdown**: [`Watcher::close`] cancels the outstanding read and
///    releases the OS resources. Dropping the handle does the same.
///
/// # Thread Safety
///
/// Every mutating operation takes `&mut self`. The handle can be moved to
/// another thread but not shared between threads.
///
/// # Examples
///
/// ```
/// use sw_core::{ChangeFilter, WatchRequest};
/// use sw_watcher::{Watcher, WatcherState};
///
/// let mut watcher = Watcher::create(WatchRequest::new(
///     "/definitely/not/here",
///     false,
///     ChangeFilter::all(),
/// ));
///
/// assert_eq!(watcher.state(), WatcherState::Failed);
/// assert!(!watcher.start());
/// assert!(watcher.last_error().is_some());
/// assert_eq!(watcher.poll(), None);
/// ```
pub struct Watcher {
    request: WatchRequest,
    machine: Machine<Source>,
    _not_sync: PhantomData<Cell<()>>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("path", &self.request.path)
            .field("recurse_subtree", &self.request.recurse_subtree)
            .field("filter", &self.request.filter)
            .field("state", &self.machine.state())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates a watcher for `request` with the default [`WatchConfig`].
    #[must_use]
    pub fn create(request: WatchRequest) -> Self {
        Self::with_config(request, &WatchConfig::default())
    }

    /// Creates a watcher for `request` using `config`.
    ///
    /// Invalid requests or configurations, missing directories, and OS
    /// failures all produce a handle in [`WatcherState::Failed`].
    #[must_use]
    pub fn with_config(request: WatchRequest, config: &WatchConfig) -> Self {
        let opened = request
            .validate()
            .and_then(|()| config.validate())
            .map_err(WatchError::from)
            .and_then(|()| platform::open(&request, config));

        match &opened {
            Ok(_) => tracing::debug!(
                path = %request.path,
                recurse_subtree = request.recurse_subtree,
                filter = ?request.filter,
                "Watcher created"
            ),
            Err(err) => {
                tracing::warn!(path = %request.path, error = %err, "Failed to create watcher");
            }
        }

        let machine = Machine::new(
            request.path.clone(),
            opened,
            request.filter,
            config.rename_policy,
        );
        let mut watcher = Self {
            request,
            machine,
            _not_sync: PhantomData,
        };
        if config.auto_start && watcher.machine.state() == WatcherState::Created {
            watcher.start();
        }
        watcher
    }

    /// Arms the watcher.
    ///
    /// Returns `true` if the watcher is watching afterwards. Calling this on a
    /// watching handle is a no-op that returns `true`; on a failed or closed
    /// handle it returns `false`.
    pub fn start(&mut self) -> bool {
        self.machine.start()
    }

    /// Returns the next event if one is available without blocking.
    #[inline]
    pub fn poll(&mut self) -> Option<ChangeEvent> {
        self.machine.next_event(Some(Duration::ZERO))
    }

    /// Returns the next event, blocking for at most `timeout`.
    ///
    /// `None` blocks until an event arrives or the watcher fails. The timeout
    /// bounds the whole call, including reads that produced nothing
    /// deliverable. Returns `None` when the timeout expires.
    #[inline]
    pub fn wait(&mut self, timeout: Option<Duration>) -> Option<ChangeEvent> {
        self.machine.next_event(timeout)
    }

    /// [`Watcher::wait`] with a millisecond timeout.
    ///
    /// Negative values block indefinitely and zero behaves like
    /// [`Watcher::poll`].
    pub fn wait_ms(&mut self, timeout_ms: i64) -> Option<ChangeEvent> {
        let timeout = (timeout_ms >= 0).then(|| Duration::from_millis(timeout_ms.unsigned_abs()));
        self.wait(timeout)
    }

    /// Returns `true` while a read is armed.
    #[inline]
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.machine.state() == WatcherState::Watching
    }

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> WatcherState {
        self.machine.state()
    }

    /// Returns the watched directory, as given at creation.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.machine.path()
    }

    /// Returns the request this watcher was created from.
    #[inline]
    #[must_use]
    pub const fn request(&self) -> &WatchRequest {
        &self.request
    }

    /// Returns a description of the first error this watcher hit.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.machine.error().map(ToString::to_string)
    }

    /// Returns the first error this watcher hit.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&WatchError> {
        self.machine.error()
    }

    /// Returns a snapshot of the delivery counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> WatchStats {
        self.machine.stats()
    }

    /// Stops watching and releases OS resources.
    ///
    /// Undelivered events are discarded. Safe to call more than once.
    pub fn close(&mut self) {
        self.machine.close();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.machine.close();
    }
}
