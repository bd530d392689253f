//! Directory change watching over `ReadDirectoryChangesW` and inotify.
//!
//! This crate watches one directory (optionally with its subtree) and reports
//! normalized [`ChangeEvent`](sw_core::ChangeEvent)s: additions, removals,
//! modifications and renames, restricted to the categories selected by a
//! [`ChangeFilter`](sw_core::ChangeFilter).
//!
//! # Overview
//!
//! The sw-watcher crate is designed to:
//!
//! - Drive the OS notification primitive directly, one outstanding read per
//!   watcher, without background threads
//! - Decode the raw record buffers of both platforms with pure functions that
//!   are testable anywhere
//! - Correlate the two halves of a rename into one event (or a from/to pair)
//! - Recover from kernel buffer overflows by re-arming, without surfacing them
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌───────────────┐   ┌──────────────┐
//! │ platform   │ → │ decode   │ → │ filter        │ → │ rename       │
//! │ (source)   │   │ (bytes)  │   │ (categories)  │   │ (pairing)    │
//! └────────────┘   └──────────┘   └───────────────┘   └──────┬───────┘
//!                                                            ▼
//!                                  Watcher ◄── state (queue, lifecycle)
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! sw-watcher ──► sw-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use sw_core::{ChangeFilter, ChangeKind, WatchRequest};
//! use sw_watcher::Watcher;
//!
//! let request = WatchRequest::new("./data", true, ChangeFilter::NAME | ChangeFilter::DIR_NAME);
//! let mut watcher = Watcher::create(request);
//! assert!(watcher.start());
//!
//! loop {
//!     match watcher.wait(Some(Duration::from_millis(500))) {
//!         Some(event) if event.kind == ChangeKind::Renamed => {
//!             println!("{} -> {}", event.previous_name.unwrap_or_default(), event.name);
//!         }
//!         Some(event) => println!("{event}"),
//!         None if !watcher.is_watching() => break,
//!         None => {}
//!     }
//! }
//! eprintln!("stopped: {:?}", watcher.last_error());
//! ```
//!
//! # Error Handling
//!
//! No watcher operation returns an error. The first failure is kept on the
//! handle as a [`WatchError`]:
//!
//! ```
//! use sw_core::{ChangeFilter, WatchRequest};
//! use sw_watcher::Watcher;
//!
//! let watcher = Watcher::create(WatchRequest::new("/missing", false, ChangeFilter::all()));
//! if let Some(err) = watcher.error() {
//!     assert!(err.is_fatal());
//! }
//! ```
//!
//! # Platforms
//!
//! - **Windows**: one overlapped `ReadDirectoryChangesW`, natively recursive
//! - **Linux**: inotify, with one watch per directory in recursive mode
//! - **Other**: creation fails with [`WatchError::UnsupportedPlatform`]

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod decode;
pub mod error;
pub mod filter;
mod platform;
mod rename;
mod state;
pub mod stats;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export statistics
pub use stats::WatchStats;

// Re-export watcher types
pub use state::WatcherState;
pub use watcher::Watcher;
