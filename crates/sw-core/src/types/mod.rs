//! Domain types for simple-watcher.
//!
//! # Module Organization
//!
//! - [`filter`] - Change categories a watch subscribes to
//! - [`event`] - Portable change events
//! - [`request`] - Watch requests
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use sw_core::types::{ChangeEvent, ChangeFilter, ChangeKind, WatchRequest};
//! ```

mod event;
mod filter;
mod request;

pub use event::{ChangeEvent, ChangeKind};
pub use filter::ChangeFilter;
pub use request::WatchRequest;
