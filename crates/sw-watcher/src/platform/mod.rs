//! Platform notification sources.
//!
//! A [`NotificationSource`] owns the OS resources for one watched directory
//! and exposes the arm / wait / read / decode cycle the watcher drives. The
//! implementation is picked at build time:
//!
//! - Windows: `ReadDirectoryChangesW` with overlapped I/O
//! - Linux: inotify, with recursion emulated by one watch per directory
//! - anything else: opening fails with [`WatchError::UnsupportedPlatform`]

use std::time::Duration;

use sw_core::{WatchConfig, WatchRequest};

use crate::decode::RawChange;
use crate::error::WatchError;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(any(target_os = "linux", windows)))]
mod unsupported;
#[cfg(windows)]
mod windows;

/// The source used on this platform.
#[cfg(target_os = "linux")]
pub type Source = linux::InotifySource;
/// The source used on this platform.
#[cfg(windows)]
pub type Source = windows::DirectoryChangesSource;
/// The source used on this platform.
#[cfg(not(any(target_os = "linux", windows)))]
pub type Source = unsupported::UnsupportedSource;

/// Outcome of collecting a completed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// This many bytes of raw records are in the source's buffer.
    Data(usize),
    /// The kernel dropped events; nothing is in the buffer.
    Overflow,
    /// The wake-up carried nothing to read.
    Spurious,
}

/// The arm / wait / read / decode contract every platform implements.
///
/// At most one read is outstanding at a time; `arm` on an already-armed
/// source is a no-op.
pub trait NotificationSource {
    /// Issues the asynchronous read, if the platform needs one.
    fn arm(&mut self) -> std::io::Result<()>;

    /// Blocks until a read has completed or `timeout` elapses.
    ///
    /// `None` waits indefinitely. Returns `false` on timeout.
    fn wait_ready(&mut self, timeout: Option<Duration>) -> std::io::Result<bool>;

    /// Checks for a completed read without blocking.
    fn poll_ready(&mut self) -> std::io::Result<bool> {
        self.wait_ready(Some(Duration::ZERO))
    }

    /// Collects the completed read into the source's buffer.
    fn read_result(&mut self) -> std::io::Result<Completion>;

    /// Decodes the first `len` bytes of the buffer, appending changes to `out`.
    fn decode(&mut self, len: usize, out: &mut Vec<RawChange>);

    /// Cancels any outstanding read and releases every OS resource.
    ///
    /// Safe to call repeatedly and with nothing outstanding.
    fn cancel_and_close(&mut self);
}

/// Opens the platform source for `request`.
///
/// The request must already be validated. The path is checked to be a
/// directory before any OS notification resource is allocated.
pub fn open(request: &WatchRequest, config: &WatchConfig) -> Result<Source, WatchError> {
    let metadata = std::fs::metadata(request.path.as_std_path())
        .map_err(|source| WatchError::open_failed(&request.path, source))?;
    if !metadata.is_dir() {
        return Err(WatchError::open_failed(
            &request.path,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }

    Source::open(request, config)
}

/// Rounds a timeout up to whole milliseconds, saturating at `max`.
pub(crate) fn timeout_millis(timeout: Duration, max: u64) -> u64 {
    let millis = timeout.as_millis() + u128::from(timeout.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(max).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_millis_rounds_up() {
        assert_eq!(timeout_millis(Duration::ZERO, 1000), 0);
        assert_eq!(timeout_millis(Duration::from_micros(1), 1000), 1);
        assert_eq!(timeout_millis(Duration::from_millis(50), 1000), 50);
        assert_eq!(timeout_millis(Duration::from_micros(50_500), 1000), 51);
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_secs(10_000), 1000), 1000);
        assert_eq!(timeout_millis(Duration::MAX, u64::MAX), u64::MAX);
    }

    #[test]
    fn test_open_missing_directory() {
        let request = WatchRequest::new("/nonexistent/sw-watcher/dir", false, Default::default());
        let result = open(&request, &WatchConfig::default());
        assert!(matches!(result, Err(WatchError::ResourceOpenFailed { .. })));
    }

    #[test]
    fn test_open_regular_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = camino::Utf8Path::from_path(file.path()).unwrap();
        let request = WatchRequest::new(path, false, Default::default());

        match open(&request, &WatchConfig::default()) {
            Err(WatchError::ResourceOpenFailed { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotADirectory);
            }
            other => panic!("expected ResourceOpenFailed, got {other:?}"),
        }
    }
}
