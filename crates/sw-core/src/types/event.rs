//! Portable change events.
//!
//! A [`ChangeEvent`] is what a watcher hands back from `poll` or `wait`,
//! regardless of which platform notification mechanism produced it.

use serde::{Deserialize, Serialize};

/// The kind of change observed.
///
/// [`code`](Self::code) gives the stable numeric value used at the external
/// interface; all rename flavours share code 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// An entry was created (or moved into the watched tree).
    Added,
    /// An entry was deleted (or moved out of the watched tree).
    Removed,
    /// Content, size, attributes, timestamps, or permissions changed.
    Modified,
    /// A rename with both names known; the event carries `previous_name`.
    Renamed,
    /// The old-name half of a rename, reported on its own.
    RenamedFrom,
    /// The new-name half of a rename, reported on its own.
    RenamedTo,
}

impl ChangeKind {
    /// Returns the external event code.
    ///
    /// # Examples
    ///
    /// ```
    /// use sw_core::ChangeKind;
    ///
    /// assert_eq!(ChangeKind::Added.code(), 1);
    /// assert_eq!(ChangeKind::RenamedTo.code(), 4);
    /// ```
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Added => 1,
            Self::Removed => 2,
            Self::Modified => 3,
            Self::Renamed | Self::RenamedFrom | Self::RenamedTo => 4,
        }
    }

    /// Returns `true` for any rename flavour.
    #[inline]
    #[must_use]
    pub const fn is_rename(self) -> bool {
        matches!(self, Self::Renamed | Self::RenamedFrom | Self::RenamedTo)
    }
}

/// A single change within the watched directory.
///
/// `name` is relative to the watched root.
///
/// # Examples
///
/// ```
/// use sw_core::{ChangeEvent, ChangeKind};
///
/// let event = ChangeEvent::renamed("a.txt", "b.txt");
/// assert_eq!(event.kind, ChangeKind::Renamed);
/// assert_eq!(event.name, "b.txt");
/// assert_eq!(event.previous_name.as_deref(), Some("a.txt"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,

    /// The affected entry, relative to the watched root.
    ///
    /// For renames this is the new name, except for
    /// [`RenamedFrom`](ChangeKind::RenamedFrom) where it is the old one.
    pub name: String,

    /// The name before a rename, when it is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_name: Option<String>,
}

impl ChangeEvent {
    /// Creates an event without a previous name.
    #[inline]
    #[must_use]
    pub fn new(kind: ChangeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            previous_name: None,
        }
    }

    /// Creates an [`Added`](ChangeKind::Added) event.
    #[inline]
    #[must_use]
    pub fn added(name: impl Into<String>) -> Self {
        Self::new(ChangeKind::Added, name)
    }

    /// Creates a [`Removed`](ChangeKind::Removed) event.
    #[inline]
    #[must_use]
    pub fn removed(name: impl Into<String>) -> Self {
        Self::new(ChangeKind::Removed, name)
    }

    /// Creates a [`Modified`](ChangeKind::Modified) event.
    #[inline]
    #[must_use]
    pub fn modified(name: impl Into<String>) -> Self {
        Self::new(ChangeKind::Modified, name)
    }

    /// Creates a fused [`Renamed`](ChangeKind::Renamed) event.
    #[inline]
    #[must_use]
    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Renamed,
            name: to.into(),
            previous_name: Some(from.into()),
        }
    }

    /// Creates a [`RenamedFrom`](ChangeKind::RenamedFrom) event.
    #[inline]
    #[must_use]
    pub fn renamed_from(name: impl Into<String>) -> Self {
        Self::new(ChangeKind::RenamedFrom, name)
    }

    /// Creates a [`RenamedTo`](ChangeKind::RenamedTo) event.
    #[inline]
    #[must_use]
    pub fn renamed_to(name: impl Into<String>, previous_name: Option<String>) -> Self {
        Self {
            kind: ChangeKind::RenamedTo,
            name: name.into(),
            previous_name,
        }
    }

    /// Returns the external event code of this event's kind.
    #[inline]
    #[must_use]
    pub const fn code(&self) -> u8 {
        self.kind.code()
    }
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.previous_name) {
            (ChangeKind::Renamed | ChangeKind::RenamedTo, Some(previous)) => {
                write!(f, "{:?} {} -> {}", self.kind, previous, self.name)
            }
            _ => write!(f, "{:?} {}", self.kind, self.name),
        }
    }
}
