//! inotify notification source.
//!
//! inotify has no subtree mode, so recursive requests register one watch per
//! directory. The watch table maps each watch descriptor to the directory's
//! path relative to the root, which is how event names become root-relative.
//! Directories created or moved into the tree are walked and watched as they
//! appear; directories deleted or moved out drop their watches.
//!
//! A new subdirectory is only watched once its creation record has been
//! decoded, which happens on the caller's next `poll` or `wait`. Entries made
//! inside it before then are not reported.
//!
//! Removing or moving the watched root ends the watch: the next re-arm fails
//! and the watcher moves to its failed state.

#![allow(unsafe_code)]

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use sw_core::{WatchConfig, WatchRequest};

use super::{timeout_millis, Completion, NotificationSource};
use crate::decode::linux::{self as records, InotifyRecord};
use crate::decode::{RawAction, RawChange};
use crate::error::WatchError;
use crate::filter::inotify_mask;

/// An inotify instance with its watch table and read buffer.
#[derive(Debug)]
pub struct InotifySource {
    fd: Option<OwnedFd>,
    root: Utf8PathBuf,
    mask: u32,
    recursive: bool,
    follow_new_directories: bool,
    /// Watch descriptor -> directory relative to `root` ("" for the root).
    watches: FxHashMap<i32, String>,
    buffer: Vec<u8>,
    /// Set once the root directory was deleted, moved, or lost its watch.
    root_lost: bool,
}

impl InotifySource {
    /// Creates the inotify instance and registers the initial watches.
    pub fn open(request: &WatchRequest, config: &WatchConfig) -> Result<Self, WatchError> {
        // SAFETY: inotify_init1 takes no pointers; a negative return is an error.
        let raw = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if raw < 0 {
            return Err(WatchError::open_failed(
                &request.path,
                io::Error::last_os_error(),
            ));
        }
        // SAFETY: `raw` is a freshly created descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut source = Self {
            fd: Some(fd),
            root: request.path.clone(),
            mask: inotify_mask(request.filter, request.recurse_subtree),
            recursive: request.recurse_subtree,
            follow_new_directories: config.follow_new_directories,
            watches: FxHashMap::default(),
            buffer: vec![0; config.buffer_size],
            root_lost: false,
        };

        source
            .add_watch("")
            .map_err(|err| WatchError::open_failed(&request.path, err))?;
        if source.recursive {
            source.watch_subdirectories("");
        }

        tracing::debug!(
            path = %source.root,
            watches = source.watches.len(),
            "inotify watches registered"
        );
        Ok(source)
    }

    fn add_watch(&mut self, relative: &str) -> io::Result<i32> {
        let Some(fd) = self.fd.as_ref() else {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        };
        let path = if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        };
        let c_path = CString::new(path.as_str())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        let wd = unsafe { libc::inotify_add_watch(fd.as_raw_fd(), c_path.as_ptr(), self.mask) };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }

        tracing::trace!(wd, dir = %path, "Watch added");
        self.watches.insert(wd, relative.to_owned());
        Ok(wd)
    }

    fn remove_watch(&mut self, wd: i32) {
        self.watches.remove(&wd);
        if let Some(fd) = self.fd.as_ref() {
            // SAFETY: plain integer arguments; failure only means the watch is already gone.
            let _ = unsafe { libc::inotify_rm_watch(fd.as_raw_fd(), wd) };
        }
    }

    /// Watches every directory below `relative` (not `relative` itself).
    fn watch_subdirectories(&mut self, relative: &str) {
        let start = if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        };

        let walker = WalkBuilder::new(start.as_std_path())
            .standard_filters(false)
            .follow_links(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };
            if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                continue;
            }

            let Some(dir) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!(
                    path = %entry.path().display(),
                    "Skipping non-UTF-8 directory"
                );
                continue;
            };
            let Ok(relative) = dir.strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative.as_str().to_owned();

            if let Err(err) = self.add_watch(&relative) {
                // The directory may already be gone again.
                tracing::debug!(dir = %relative, error = %err, "Failed to add watch");
            }
        }
    }

    fn watch_tree(&mut self, relative: &str) {
        if !self.follow_new_directories {
            return;
        }
        match self.add_watch(relative) {
            Ok(_) => self.watch_subdirectories(relative),
            Err(err) => tracing::debug!(dir = %relative, error = %err, "Failed to add watch"),
        }
    }

    /// Rewrites watched paths after a directory moved within the tree.
    fn rename_tree(&mut self, from: &str, to: &str) {
        for dir in self.watches.values_mut() {
            if dir == from {
                *dir = to.to_owned();
            } else if let Some(rest) = dir.strip_prefix(from).and_then(|r| r.strip_prefix('/')) {
                *dir = format!("{to}/{rest}");
            }
        }
    }

    /// Drops the watches for a directory that left the tree, and everything below it.
    fn unwatch_tree(&mut self, relative: &str) {
        let stale: SmallVec<[i32; 8]> = self
            .watches
            .iter()
            .filter(|(_, dir)| {
                dir.as_str() == relative
                    || dir
                        .strip_prefix(relative)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(|(&wd, _)| wd)
            .collect();
        for wd in stale {
            self.remove_watch(wd);
        }
    }

    fn translate(
        &mut self,
        record: InotifyRecord,
        moved_dirs: &mut SmallVec<[(u32, String); 4]>,
        out: &mut Vec<RawChange>,
    ) {
        let Some(action) = record.raw_action() else {
            let is_root = self.watches.get(&record.wd).is_some_and(String::is_empty);
            if is_root && !self.root_lost {
                tracing::warn!(path = %self.root, "Watched directory was removed or moved");
                self.root_lost = true;
            }
            if record.mask & records::IN_IGNORED != 0 {
                self.watches.remove(&record.wd);
            }
            return;
        };
        if action == RawAction::Overflow {
            out.push(RawChange::overflow());
            return;
        }

        let Some(dir) = self.watches.get(&record.wd) else {
            tracing::trace!(wd = record.wd, "Event for a stale watch");
            return;
        };
        // Events about a watched directory itself are also reported, with a
        // name, by the watch on its parent.
        let Some(name) = record.name.as_deref() else {
            return;
        };
        let relative = if dir.is_empty() {
            name.to_owned()
        } else {
            format!("{dir}/{name}")
        };
        let is_dir = record.is_dir();

        if is_dir && self.recursive {
            match action {
                RawAction::Created => self.watch_tree(&relative),
                RawAction::RenamedOld => {
                    moved_dirs.push((record.cookie, relative.clone()));
                }
                RawAction::RenamedNew => {
                    let partner = moved_dirs
                        .iter()
                        .position(|(cookie, _)| record.cookie() == Some(*cookie));
                    match partner {
                        Some(index) => {
                            let (_, from) = moved_dirs.remove(index);
                            self.rename_tree(&from, &relative);
                        }
                        None => self.watch_tree(&relative),
                    }
                }
                RawAction::Deleted | RawAction::Modified | RawAction::Overflow => {}
            }
        }

        tracing::trace!(name = %relative, ?action, is_dir, "Decoded inotify event");
        let mut change = RawChange::new(action, relative).with_is_dir(is_dir);
        if let Some(cookie) = record.cookie() {
            change = change.with_cookie(cookie);
        }
        out.push(change);
    }
}

impl NotificationSource for InotifySource {
    fn arm(&mut self) -> io::Result<()> {
        // The queue is live for as long as the root watch exists.
        if self.fd.is_none() {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        if self.root_lost {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("watched directory {} was removed or moved", self.root),
            ));
        }
        Ok(())
    }

    fn wait_ready(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        let Some(fd) = self.fd.as_ref() else {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        };
        let millis = timeout.map_or(-1, |t| {
            i32::try_from(timeout_millis(t, i32::MAX.unsigned_abs().into())).unwrap_or(i32::MAX)
        });
        let mut pollfd = libc::pollfd {
            fd: fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        // SAFETY: `pollfd` is a valid, exclusively borrowed array of length 1.
        let ready = unsafe { libc::poll(&raw mut pollfd, 1, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ready > 0 && pollfd.revents != 0)
    }

    fn read_result(&mut self) -> io::Result<Completion> {
        let Some(fd) = self.fd.as_ref() else {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        };

        // SAFETY: the pointer and length describe `self.buffer`, which is
        // exclusively borrowed for the duration of the call.
        let read = unsafe {
            libc::read(
                fd.as_raw_fd(),
                self.buffer.as_mut_ptr().cast(),
                self.buffer.len(),
            )
        };
        if read < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(Completion::Spurious),
                _ => Err(err),
            };
        }
        match usize::try_from(read) {
            Ok(0) | Err(_) => Ok(Completion::Spurious),
            Ok(len) => Ok(Completion::Data(len)),
        }
    }

    fn decode(&mut self, len: usize, out: &mut Vec<RawChange>) {
        let decoded = records::decode(self.buffer.get(..len).unwrap_or(&self.buffer));
        let mut moved_dirs = SmallVec::new();

        for record in decoded {
            self.translate(record, &mut moved_dirs, out);
        }

        // A directory moved out of the tree never gets a moved-to partner.
        for (_, from) in moved_dirs {
            self.unwatch_tree(&from);
        }
    }

    fn cancel_and_close(&mut self) {
        if let Some(fd) = self.fd.take() {
            // Closing the descriptor releases every watch registered on it.
            drop(fd);
            self.watches.clear();
            tracing::debug!(path = %self.root, "inotify instance closed");
        }
    }
}

impl Drop for InotifySource {
    fn drop(&mut self) {
        self.cancel_and_close();
    }
}
