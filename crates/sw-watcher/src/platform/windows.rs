//! `ReadDirectoryChangesW` notification source.
//!
//! The directory handle is opened for overlapped I/O and one read is kept
//! outstanding against a manual-reset event. The `OVERLAPPED` block and the
//! record buffer are boxed so their addresses stay fixed while the kernel
//! owns them, even if the source itself is moved.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::io;
use std::iter;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::time::Duration;

use camino::Utf8PathBuf;
use sw_core::{WatchConfig, WatchRequest};
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_IO_INCOMPLETE, ERROR_IO_PENDING, ERROR_NOTIFY_ENUM_DIR,
    HANDLE, INVALID_HANDLE_VALUE, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadDirectoryChangesW, FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OVERLAPPED,
    FILE_LIST_DIRECTORY, FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows_sys::Win32::System::Threading::{CreateEventW, ResetEvent, WaitForSingleObject, INFINITE};
use windows_sys::Win32::System::IO::{CancelIo, GetOverlappedResult, OVERLAPPED};

use super::{timeout_millis, Completion, NotificationSource};
use crate::decode::{windows as records, RawChange};
use crate::error::WatchError;
use crate::filter::notify_filter;

const NO_HANDLE: HANDLE = 0 as HANDLE;

/// A directory handle with one overlapped `ReadDirectoryChangesW` in flight.
pub struct DirectoryChangesSource {
    path: Utf8PathBuf,
    directory: HANDLE,
    event: HANDLE,
    overlapped: Box<OVERLAPPED>,
    /// DWORD-aligned, as `FILE_NOTIFY_INFORMATION` requires.
    buffer: Box<[u32]>,
    notify_filter: u32,
    recursive: bool,
    pending: bool,
}

impl std::fmt::Debug for DirectoryChangesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryChangesSource")
            .field("path", &self.path)
            .field("directory", &self.directory)
            .field("buffer_len", &(self.buffer.len() * 4))
            .field("recursive", &self.recursive)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

// SAFETY: the handles and boxed buffers are owned exclusively by this value
// and are only touched through `&mut self`.
unsafe impl Send for DirectoryChangesSource {}

impl DirectoryChangesSource {
    /// Opens the directory for overlapped change reads.
    pub fn open(request: &WatchRequest, config: &WatchConfig) -> Result<Self, WatchError> {
        let wide: Vec<u16> = request
            .path
            .as_std_path()
            .as_os_str()
            .encode_wide()
            .chain(iter::once(0))
            .collect();

        // SAFETY: `wide` is NUL-terminated and outlives the call; the other
        // arguments are plain flags or null.
        let directory = unsafe {
            CreateFileW(
                wide.as_ptr(),
                FILE_LIST_DIRECTORY,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                ptr::null(),
                OPEN_EXISTING,
                FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OVERLAPPED,
                NO_HANDLE,
            )
        };
        if directory == INVALID_HANDLE_VALUE {
            return Err(WatchError::open_failed(
                &request.path,
                io::Error::last_os_error(),
            ));
        }

        // SAFETY: null attributes and name create an anonymous manual-reset event.
        let event = unsafe { CreateEventW(ptr::null(), 1, 0, ptr::null()) };
        if event == NO_HANDLE {
            let err = io::Error::last_os_error();
            // SAFETY: `directory` is a valid handle we own.
            unsafe { CloseHandle(directory) };
            return Err(WatchError::open_failed(&request.path, err));
        }

        // SAFETY: OVERLAPPED is a plain C struct for which all-zero is valid.
        let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { std::mem::zeroed() });
        overlapped.hEvent = event;

        tracing::debug!(path = %request.path, "Directory handle opened");
        Ok(Self {
            path: request.path.clone(),
            directory,
            event,
            overlapped,
            buffer: vec![0u32; config.buffer_size / 4].into_boxed_slice(),
            notify_filter: notify_filter(request.filter),
            recursive: request.recurse_subtree,
            pending: false,
        })
    }

    fn is_open(&self) -> bool {
        self.directory != NO_HANDLE
    }

    fn buffer_bytes(&self) -> &[u8] {
        // SAFETY: a `[u32]` of length n is valid to view as n * 4 bytes, and
        // no read is outstanding while the shared borrow is held.
        unsafe {
            std::slice::from_raw_parts(self.buffer.as_ptr().cast::<u8>(), self.buffer.len() * 4)
        }
    }
}

impl NotificationSource for DirectoryChangesSource {
    fn arm(&mut self) -> io::Result<()> {
        if !self.is_open() {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        if self.pending {
            return Ok(());
        }

        let len = u32::try_from(self.buffer.len() * 4).unwrap_or(u32::MAX);
        // SAFETY: the buffer and OVERLAPPED are heap allocations owned by
        // `self` that stay in place until the read completes or is cancelled
        // in `cancel_and_close`.
        let ok = unsafe {
            ResetEvent(self.event);
            ReadDirectoryChangesW(
                self.directory,
                self.buffer.as_mut_ptr().cast::<c_void>(),
                len,
                i32::from(self.recursive),
                self.notify_filter,
                ptr::null_mut(),
                &raw mut *self.overlapped,
                None,
            )
        };
        if ok == 0 {
            // SAFETY: reads the calling thread's last-error value.
            let code = unsafe { GetLastError() };
            if code != ERROR_IO_PENDING {
                return Err(io::Error::from_raw_os_error(code as i32));
            }
        }
        self.pending = true;
        Ok(())
    }

    fn wait_ready(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        if !self.is_open() {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        let millis = timeout.map_or(INFINITE, |t| {
            u32::try_from(timeout_millis(t, u64::from(INFINITE - 1))).unwrap_or(INFINITE - 1)
        });

        // SAFETY: `event` is a valid event handle owned by `self`.
        match unsafe { WaitForSingleObject(self.event, millis) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(io::Error::last_os_error()),
        }
    }

    fn read_result(&mut self) -> io::Result<Completion> {
        if !self.is_open() {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        if !self.pending {
            return Ok(Completion::Spurious);
        }

        let mut transferred = 0u32;
        // SAFETY: the OVERLAPPED belongs to the read issued on `directory`.
        let ok = unsafe {
            GetOverlappedResult(self.directory, &*self.overlapped, &raw mut transferred, 0)
        };
        if ok == 0 {
            // SAFETY: reads the calling thread's last-error value.
            let code = unsafe { GetLastError() };
            return match code {
                ERROR_IO_INCOMPLETE => Ok(Completion::Spurious),
                ERROR_NOTIFY_ENUM_DIR => {
                    self.pending = false;
                    Ok(Completion::Overflow)
                }
                _ => {
                    self.pending = false;
                    Err(io::Error::from_raw_os_error(code as i32))
                }
            };
        }

        self.pending = false;
        // Zero bytes on success means the buffer was too small for the batch.
        match transferred {
            0 => Ok(Completion::Overflow),
            len => Ok(Completion::Data(len as usize)),
        }
    }

    fn decode(&mut self, len: usize, out: &mut Vec<RawChange>) {
        let bytes = self.buffer_bytes();
        let records = records::decode(bytes.get(..len).unwrap_or(bytes));
        out.extend(records.into_iter().map(records::NotifyRecord::into_change));
    }

    fn cancel_and_close(&mut self) {
        if !self.is_open() {
            return;
        }

        if self.pending {
            let mut transferred = 0u32;
            // SAFETY: cancels the read issued on `directory`, then waits for
            // the kernel to release the buffer and OVERLAPPED.
            unsafe {
                CancelIo(self.directory);
                GetOverlappedResult(self.directory, &*self.overlapped, &raw mut transferred, 1);
            }
            self.pending = false;
        }

        // SAFETY: both handles are valid and owned by `self`; they are cleared
        // below so they are closed exactly once.
        unsafe {
            CloseHandle(self.directory);
            CloseHandle(self.event);
        }
        self.directory = NO_HANDLE;
        self.event = NO_HANDLE;
        self.overlapped.hEvent = NO_HANDLE;
        tracing::debug!(path = %self.path, "Directory handle closed");
    }
}

impl Drop for DirectoryChangesSource {
    fn drop(&mut self) {
        self.cancel_and_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::RawAction;
    use camino::Utf8Path;
    use std::fs;
    use sw_core::ChangeFilter;
    use tempfile::TempDir;

    fn open_in(dir: &TempDir, filter: ChangeFilter) -> DirectoryChangesSource {
        let path = Utf8Path::from_path(dir.path()).unwrap();
        let request = WatchRequest::new(path, false, filter);
        DirectoryChangesSource::open(&request, &WatchConfig::default()).unwrap()
    }

    fn read_once(source: &mut DirectoryChangesSource) -> Vec<RawChange> {
        assert!(source.wait_ready(Some(Duration::from_secs(2))).unwrap());
        let Completion::Data(len) = source.read_result().unwrap() else {
            panic!("expected data");
        };
        let mut out = Vec::new();
        source.decode(len, &mut out);
        out
    }

    #[test]
    fn test_arm_twice_keeps_one_read() {
        let dir = TempDir::new().unwrap();
        let mut source = open_in(&dir, ChangeFilter::all());
        source.arm().unwrap();
        source.arm().unwrap();
        assert!(!source.poll_ready().unwrap());
    }

    #[test]
    fn test_live_create_is_read() {
        let dir = TempDir::new().unwrap();
        let mut source = open_in(&dir, ChangeFilter::NAME);
        source.arm().unwrap();

        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let changes = read_once(&mut source);
        assert_eq!(changes[0], RawChange::new(RawAction::Created, "a.txt"));
    }

    #[test]
    fn test_rename_halves_are_adjacent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();
        let mut source = open_in(&dir, ChangeFilter::NAME);
        source.arm().unwrap();

        fs::rename(dir.path().join("a.txt"), dir.path().join("b.txt")).unwrap();
        let changes = read_once(&mut source);
        assert_eq!(
            changes,
            vec![
                RawChange::new(RawAction::RenamedOld, "a.txt"),
                RawChange::new(RawAction::RenamedNew, "b.txt"),
            ]
        );
    }

    #[test]
    fn test_close_with_read_outstanding() {
        let dir = TempDir::new().unwrap();
        let mut source = open_in(&dir, ChangeFilter::all());
        source.arm().unwrap();
        source.cancel_and_close();
        source.cancel_and_close();
        assert!(source.arm().is_err());
        assert!(source.wait_ready(Some(Duration::ZERO)).is_err());
    }
}
