//! Translation of [`ChangeFilter`] into platform notification masks, and the
//! user-space admission check applied to decoded changes.
//!
//! Windows filters in the kernel: the `FILE_NOTIFY_CHANGE_*` mask decides what
//! is reported. inotify is coarser (`IN_ATTRIB` covers both attributes and
//! permissions, and emulated recursion needs directory events the caller may
//! not have asked for), so Linux changes are re-checked with [`admits`].
//!
//! # Examples
//!
//! ```
//! use sw_core::ChangeFilter;
//! use sw_watcher::filter::{inotify_mask, notify_filter};
//! use sw_watcher::decode::linux::{IN_CREATE, IN_MODIFY};
//!
//! assert_eq!(notify_filter(ChangeFilter::NAME), 0x1);
//!
//! let mask = inotify_mask(ChangeFilter::SIZE, false);
//! assert_ne!(mask & IN_MODIFY, 0);
//! assert_eq!(mask & IN_CREATE, 0);
//! ```

use sw_core::ChangeFilter;

use crate::decode::linux::{
    IN_ATTRIB, IN_CREATE, IN_DELETE, IN_DELETE_SELF, IN_MODIFY, IN_MOVED_FROM, IN_MOVED_TO,
    IN_MOVE_SELF, IN_ONLYDIR,
};
use crate::decode::{RawAction, RawChange};

/// `FILE_NOTIFY_CHANGE_FILE_NAME`.
pub const FILE_NOTIFY_CHANGE_FILE_NAME: u32 = 0x0000_0001;
/// `FILE_NOTIFY_CHANGE_DIR_NAME`.
pub const FILE_NOTIFY_CHANGE_DIR_NAME: u32 = 0x0000_0002;
/// `FILE_NOTIFY_CHANGE_ATTRIBUTES`.
pub const FILE_NOTIFY_CHANGE_ATTRIBUTES: u32 = 0x0000_0004;
/// `FILE_NOTIFY_CHANGE_SIZE`.
pub const FILE_NOTIFY_CHANGE_SIZE: u32 = 0x0000_0008;
/// `FILE_NOTIFY_CHANGE_LAST_WRITE`.
pub const FILE_NOTIFY_CHANGE_LAST_WRITE: u32 = 0x0000_0010;
/// `FILE_NOTIFY_CHANGE_SECURITY`.
pub const FILE_NOTIFY_CHANGE_SECURITY: u32 = 0x0000_0100;

const NAME_EVENTS: u32 = IN_CREATE | IN_DELETE | IN_MOVED_FROM | IN_MOVED_TO;

/// Builds the `dwNotifyFilter` argument for `ReadDirectoryChangesW`.
#[must_use]
pub const fn notify_filter(filter: ChangeFilter) -> u32 {
    let mut mask = 0;
    if filter.contains(ChangeFilter::NAME) {
        mask |= FILE_NOTIFY_CHANGE_FILE_NAME;
    }
    if filter.contains(ChangeFilter::DIR_NAME) {
        mask |= FILE_NOTIFY_CHANGE_DIR_NAME;
    }
    if filter.contains(ChangeFilter::ATTRIBUTES) {
        mask |= FILE_NOTIFY_CHANGE_ATTRIBUTES;
    }
    if filter.contains(ChangeFilter::SIZE) {
        mask |= FILE_NOTIFY_CHANGE_SIZE;
    }
    if filter.contains(ChangeFilter::LAST_WRITE) {
        mask |= FILE_NOTIFY_CHANGE_LAST_WRITE;
    }
    if filter.contains(ChangeFilter::SECURITY) {
        mask |= FILE_NOTIFY_CHANGE_SECURITY;
    }
    mask
}

/// Builds the `inotify_add_watch` mask for one directory.
///
/// Recursive watches always subscribe to name events so that new and removed
/// subdirectories can be tracked; [`admits`] drops what was not asked for.
#[must_use]
pub const fn inotify_mask(filter: ChangeFilter, recursive: bool) -> u32 {
    let mut mask = IN_ONLYDIR | IN_DELETE_SELF | IN_MOVE_SELF;
    if filter.wants_names() || recursive {
        mask |= NAME_EVENTS;
    }
    if filter.intersects(ChangeFilter::ATTRIBUTES.union(ChangeFilter::SECURITY)) {
        mask |= IN_ATTRIB;
    }
    if filter.intersects(ChangeFilter::SIZE.union(ChangeFilter::LAST_WRITE)) {
        mask |= IN_MODIFY;
    }
    mask
}

/// Returns `true` if a decoded change belongs to a requested category.
///
/// Overflow markers are never admitted; they are accounted for separately.
#[must_use]
pub fn admits(filter: ChangeFilter, change: &RawChange) -> bool {
    match change.action {
        RawAction::Overflow => false,
        RawAction::Modified => filter.wants_modifications(),
        RawAction::Created | RawAction::Deleted | RawAction::RenamedOld | RawAction::RenamedNew => {
            filter.admits_name_change(change.is_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_filter_all() {
        assert_eq!(notify_filter(ChangeFilter::all()), 0x11F);
    }

    #[test]
    fn test_notify_filter_security_bit() {
        assert_eq!(
            notify_filter(ChangeFilter::SECURITY),
            FILE_NOTIFY_CHANGE_SECURITY
        );
        assert_eq!(
            notify_filter(ChangeFilter::SIZE | ChangeFilter::LAST_WRITE),
            FILE_NOTIFY_CHANGE_SIZE | FILE_NOTIFY_CHANGE_LAST_WRITE
        );
    }

    #[test]
    fn test_inotify_mask_names_only() {
        let mask = inotify_mask(ChangeFilter::NAME, false);
        assert_eq!(mask & NAME_EVENTS, NAME_EVENTS);
        assert_eq!(mask & (IN_MODIFY | IN_ATTRIB), 0);
        assert_ne!(mask & IN_ONLYDIR, 0);
    }

    #[test]
    fn test_inotify_mask_recursive_adds_name_events() {
        let mask = inotify_mask(ChangeFilter::SIZE, true);
        assert_eq!(mask & NAME_EVENTS, NAME_EVENTS);
        assert_ne!(mask & IN_MODIFY, 0);
    }

    #[test]
    fn test_inotify_mask_tracks_root_loss() {
        let mask = inotify_mask(ChangeFilter::LAST_WRITE, false);
        assert_ne!(mask & IN_DELETE_SELF, 0);
        assert_ne!(mask & IN_MOVE_SELF, 0);
    }

    #[test]
    fn test_inotify_mask_metadata() {
        assert_ne!(inotify_mask(ChangeFilter::SECURITY, false) & IN_ATTRIB, 0);
        assert_ne!(inotify_mask(ChangeFilter::ATTRIBUTES, false) & IN_ATTRIB, 0);
        assert_eq!(inotify_mask(ChangeFilter::LAST_WRITE, false) & IN_ATTRIB, 0);
    }

    #[test]
    fn test_admits_by_category() {
        let file_created = RawChange::new(RawAction::Created, "a.txt").with_is_dir(false);
        let dir_created = RawChange::new(RawAction::Created, "sub").with_is_dir(true);
        let modified = RawChange::new(RawAction::Modified, "a.txt");

        assert!(admits(ChangeFilter::NAME, &file_created));
        assert!(!admits(ChangeFilter::NAME, &dir_created));
        assert!(admits(ChangeFilter::DIR_NAME, &dir_created));
        assert!(!admits(ChangeFilter::NAME, &modified));
        assert!(admits(ChangeFilter::LAST_WRITE, &modified));
    }

    #[test]
    fn test_size_filter_rejects_renames() {
        let from = RawChange::new(RawAction::RenamedOld, "a.txt").with_is_dir(false);
        let to = RawChange::new(RawAction::RenamedNew, "b.txt").with_is_dir(false);
        assert!(!admits(ChangeFilter::SIZE, &from));
        assert!(!admits(ChangeFilter::SIZE, &to));
    }

    #[test]
    fn test_overflow_never_admitted() {
        assert!(!admits(ChangeFilter::all(), &RawChange::overflow()));
    }
}
