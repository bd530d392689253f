//! Watch requests.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ChangeFilter;

/// What a watcher observes: a directory, whether to include its subtree, and
/// which change categories to report.
///
/// A request is fixed for the lifetime of the watcher built from it.
///
/// # Examples
///
/// ```
/// use sw_core::{ChangeFilter, WatchRequest};
///
/// let request = WatchRequest::from_mask("/var/log", false, 0x11);
/// assert_eq!(request.filter, ChangeFilter::NAME | ChangeFilter::LAST_WRITE);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchRequest {
    /// The directory to watch.
    pub path: Utf8PathBuf,

    /// Whether changes below immediate children are reported.
    pub recurse_subtree: bool,

    /// The change categories to report.
    pub filter: ChangeFilter,
}

impl WatchRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, recurse_subtree: bool, filter: ChangeFilter) -> Self {
        Self {
            path: path.into(),
            recurse_subtree,
            filter,
        }
    }

    /// Creates a request from an external filter bitmask.
    #[must_use]
    pub fn from_mask(path: impl Into<Utf8PathBuf>, recurse_subtree: bool, mask: u32) -> Self {
        Self::new(path, recurse_subtree, ChangeFilter::from_mask(mask))
    }

    /// Returns the watched directory.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Checks the parts of the request that do not depend on the filesystem.
    ///
    /// Whether `path` names an existing directory is decided when the
    /// platform resource is opened.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.is_empty() {
            return Err(ConfigError::invalid_option(
                "filter",
                "at least one change category is required",
            ));
        }
        if self.path.as_str().is_empty() {
            return Err(ConfigError::invalid_option("path", "must not be empty"));
        }
        Ok(())
    }
}
