//! Error types for the sw-watcher crate.
//!
//! This module provides the [`WatchError`] type. Errors are never returned
//! from the watcher's public operations; they are recorded on the handle and
//! reported through [`Watcher::last_error`](crate::Watcher::last_error).

use camino::Utf8PathBuf;
use sw_core::ConfigError;

/// Errors that can occur while watching a directory.
///
/// # Error Recovery Strategy
///
/// - **Resource open** ([`WatchError::ResourceOpenFailed`]): Fatal - recreate the watcher
/// - **Arm** ([`WatchError::ArmFailed`]): Fatal - recreate the watcher
/// - **Read** ([`WatchError::ReadFailed`]): Fatal - queued events stay deliverable
/// - **Overflow** ([`WatchError::DecodeOverflow`]): Recoverable - events were lost, the
///   watcher re-arms by itself
/// - **Unsupported platform** ([`WatchError::UnsupportedPlatform`]): Fatal
/// - **Invalid request** ([`WatchError::InvalidRequest`]): Fatal - fix the request
/// - **Closed** ([`WatchError::Closed`]): Fatal - the handle was closed
///
/// # Examples
///
/// ```
/// use sw_watcher::WatchError;
///
/// fn describe(err: &WatchError) -> &'static str {
///     match err {
///         WatchError::ResourceOpenFailed { .. } => "cannot open directory",
///         WatchError::ArmFailed(_) => "cannot arm read",
///         WatchError::ReadFailed(_) => "read failed",
///         WatchError::DecodeOverflow => "events lost",
///         WatchError::UnsupportedPlatform => "unsupported platform",
///         WatchError::InvalidRequest(_) => "invalid request",
///         WatchError::Closed => "closed",
///     }
/// }
///
/// assert_eq!(describe(&WatchError::DecodeOverflow), "events lost");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The directory could not be opened or registered for notifications.
    ///
    /// The directory may be missing, inaccessible, or not a directory.
    #[error("failed to open {path} for watching: {source}")]
    ResourceOpenFailed {
        /// The directory that could not be opened.
        path: Utf8PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The OS rejected the asynchronous change read.
    #[error("failed to arm change notification: {0}")]
    ArmFailed(#[source] std::io::Error),

    /// Collecting a completed read failed.
    #[error("failed to read change notifications: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// The notification buffer overflowed and events were dropped.
    #[error("notification buffer overflowed; events were lost")]
    DecodeOverflow,

    /// Change notification is not implemented for this platform.
    #[error("directory watching is not supported on this platform")]
    UnsupportedPlatform,

    /// The watch request or configuration was rejected before any OS call.
    #[error("invalid watch request: {0}")]
    InvalidRequest(#[from] ConfigError),

    /// The watcher has been closed.
    #[error("watcher is closed")]
    Closed,
}

impl WatchError {
    /// Creates a new [`WatchError::ResourceOpenFailed`] error.
    #[inline]
    pub fn open_failed(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::ResourceOpenFailed {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    ///
    /// Only buffer overflow is recoverable; the watcher re-arms on its own.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::DecodeOverflow)
    }

    /// Returns `true` if this error is fatal (watching has stopped).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the directory path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::ResourceOpenFailed { path, .. } => Some(path),
            Self::ArmFailed(_)
            | Self::ReadFailed(_)
            | Self::DecodeOverflow
            | Self::UnsupportedPlatform
            | Self::InvalidRequest(_)
            | Self::Closed => None,
        }
    }
}
