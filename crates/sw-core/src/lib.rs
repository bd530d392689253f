//! Core types, configuration, and errors for simple-watcher.
//!
//! This crate provides the platform-independent vocabulary shared by the
//! watcher implementation and its callers:
//!
//! - [`ChangeFilter`] - the change categories a watch subscribes to
//! - [`ChangeEvent`] / [`ChangeKind`] - the portable event model
//! - [`WatchRequest`] - what to watch and how
//! - [`WatchConfig`] / [`Config`] - tunables (buffer size, rename policy)
//! - [`ConfigError`] - configuration loading and validation failures
//!
//! # Examples
//!
//! ```
//! use sw_core::{ChangeFilter, WatchRequest};
//!
//! let request = WatchRequest::new("/tmp", true, ChangeFilter::NAME | ChangeFilter::LAST_WRITE);
//! assert!(request.recurse_subtree);
//! assert!(request.validate().is_ok());
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, RenamePolicy, WatchConfig};
pub use error::ConfigError;
pub use types::{ChangeEvent, ChangeFilter, ChangeKind, WatchRequest};
