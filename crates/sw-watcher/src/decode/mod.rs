//! Raw notification record decoding.
//!
//! Each platform hands back a byte buffer in its own layout:
//!
//! - [`windows`] - `FILE_NOTIFY_INFORMATION` records linked by `NextEntryOffset`,
//!   names in UTF-16
//! - [`linux`] - packed `inotify_event` records, NUL-padded names
//!
//! Both decoders are plain functions over byte slices and are compiled on every
//! platform. Platform sources translate their records into [`RawChange`]s,
//! which the watcher filters, pairs, and turns into
//! [`ChangeEvent`](sw_core::ChangeEvent)s.

pub mod linux;
pub mod windows;

/// A platform action normalized to the portable vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawAction {
    /// Entry created or moved in.
    Created,
    /// Entry deleted or moved out.
    Deleted,
    /// Content or metadata changed.
    Modified,
    /// Old-name half of a rename.
    RenamedOld,
    /// New-name half of a rename.
    RenamedNew,
    /// The kernel dropped events.
    Overflow,
}

impl RawAction {
    /// Returns `true` for actions that change the set of names in a directory.
    #[inline]
    #[must_use]
    pub const fn is_name_change(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Deleted | Self::RenamedOld | Self::RenamedNew
        )
    }
}

/// One decoded change, before filtering and rename pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    /// The normalized action.
    pub action: RawAction,
    /// Name relative to the watched root.
    pub name: String,
    /// Rename correlation token, when the platform supplies one.
    pub cookie: Option<u32>,
    /// Whether the entry is a directory, when the platform says.
    pub is_dir: Option<bool>,
}

impl RawChange {
    /// Creates a change with no cookie and unknown entry type.
    #[must_use]
    pub fn new(action: RawAction, name: impl Into<String>) -> Self {
        Self {
            action,
            name: name.into(),
            cookie: None,
            is_dir: None,
        }
    }

    /// Creates the marker for a kernel-side overflow.
    #[must_use]
    pub fn overflow() -> Self {
        Self::new(RawAction::Overflow, String::new())
    }

    /// Sets the rename cookie.
    #[must_use]
    pub fn with_cookie(mut self, cookie: u32) -> Self {
        self.cookie = Some(cookie);
        self
    }

    /// Sets the entry type.
    #[must_use]
    pub fn with_is_dir(mut self, is_dir: bool) -> Self {
        self.is_dir = Some(is_dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_change_actions() {
        assert!(RawAction::Created.is_name_change());
        assert!(RawAction::RenamedNew.is_name_change());
        assert!(!RawAction::Modified.is_name_change());
        assert!(!RawAction::Overflow.is_name_change());
    }

    #[test]
    fn test_builders() {
        let change = RawChange::new(RawAction::RenamedOld, "a.txt")
            .with_cookie(7)
            .with_is_dir(false);
        assert_eq!(change.cookie, Some(7));
        assert_eq!(change.is_dir, Some(false));
        assert!(RawChange::overflow().name.is_empty());
    }
}
