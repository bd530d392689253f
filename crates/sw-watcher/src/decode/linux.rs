//! `inotify_event` decoding.
//!
//! Layout of one record (native byte order):
//!
//! ```text
//! +0  wd      i32   watch descriptor
//! +4  mask    u32   IN_* bits
//! +8  cookie  u32   links IN_MOVED_FROM to IN_MOVED_TO, 0 otherwise
//! +12 len     u32   length of name, including NUL padding
//! +16 name    [u8; len]
//! ```
//!
//! Records are packed back to back; `len` already covers the alignment padding.

use super::RawAction;

/// File was modified.
pub const IN_MODIFY: u32 = 0x0000_0002;
/// Metadata changed.
pub const IN_ATTRIB: u32 = 0x0000_0004;
/// File opened for writing was closed.
pub const IN_CLOSE_WRITE: u32 = 0x0000_0008;
/// Entry moved out of a watched directory.
pub const IN_MOVED_FROM: u32 = 0x0000_0040;
/// Entry moved into a watched directory.
pub const IN_MOVED_TO: u32 = 0x0000_0080;
/// Entry created.
pub const IN_CREATE: u32 = 0x0000_0100;
/// Entry deleted.
pub const IN_DELETE: u32 = 0x0000_0200;
/// Watched directory itself was deleted.
pub const IN_DELETE_SELF: u32 = 0x0000_0400;
/// Watched directory itself was moved.
pub const IN_MOVE_SELF: u32 = 0x0000_0800;
/// Event queue overflowed.
pub const IN_Q_OVERFLOW: u32 = 0x0000_4000;
/// Watch was removed.
pub const IN_IGNORED: u32 = 0x0000_8000;
/// Only watch the path if it is a directory.
pub const IN_ONLYDIR: u32 = 0x0100_0000;
/// The subject of the event is a directory.
pub const IN_ISDIR: u32 = 0x4000_0000;

const HEADER_LEN: usize = 16;

/// One decoded `inotify_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InotifyRecord {
    /// Watch descriptor the event belongs to.
    pub wd: i32,
    /// `IN_*` bits.
    pub mask: u32,
    /// Rename correlation cookie, 0 when unused.
    pub cookie: u32,
    /// Entry name within the watched directory; `None` for events on the
    /// directory itself.
    pub name: Option<String>,
}

impl InotifyRecord {
    /// Returns `true` if the subject is a directory.
    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.mask & IN_ISDIR != 0
    }

    /// Returns the cookie when the kernel set one.
    #[inline]
    #[must_use]
    pub const fn cookie(&self) -> Option<u32> {
        if self.cookie == 0 {
            None
        } else {
            Some(self.cookie)
        }
    }

    /// Maps the mask to the portable vocabulary.
    ///
    /// Returns `None` for bookkeeping events (`IN_IGNORED`, `IN_DELETE_SELF`,
    /// `IN_MOVE_SELF`) that say nothing about an entry of the directory.
    /// Masks with no recognised change bit are reported as modifications.
    #[must_use]
    pub const fn raw_action(&self) -> Option<RawAction> {
        let mask = self.mask;
        if mask & IN_Q_OVERFLOW != 0 {
            Some(RawAction::Overflow)
        } else if mask & (IN_IGNORED | IN_DELETE_SELF | IN_MOVE_SELF) != 0 {
            None
        } else if mask & IN_CREATE != 0 {
            Some(RawAction::Created)
        } else if mask & IN_DELETE != 0 {
            Some(RawAction::Deleted)
        } else if mask & IN_MOVED_FROM != 0 {
            Some(RawAction::RenamedOld)
        } else if mask & IN_MOVED_TO != 0 {
            Some(RawAction::RenamedNew)
        } else {
            Some(RawAction::Modified)
        }
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let field = bytes.get(at..at + 4)?;
    Some(u32::from_ne_bytes([field[0], field[1], field[2], field[3]]))
}

/// Decodes every complete record in `buf`.
///
/// A truncated trailing record is dropped.
#[must_use]
pub fn decode(buf: &[u8]) -> Vec<InotifyRecord> {
    let mut records = Vec::new();
    let mut offset = 0usize;

    while let (Some(wd), Some(mask), Some(cookie), Some(len)) = (
        read_u32(buf, offset),
        read_u32(buf, offset + 4),
        read_u32(buf, offset + 8),
        read_u32(buf, offset + 12),
    ) {
        let name_start = offset + HEADER_LEN;
        let Some(raw_name) = buf.get(name_start..name_start + len as usize) else {
            tracing::trace!(offset, len, "Truncated inotify record");
            break;
        };

        let end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        let name = (end > 0).then(|| String::from_utf8_lossy(&raw_name[..end]).into_owned());

        records.push(InotifyRecord {
            wd: wd as i32,
            mask,
            cookie,
            name,
        });
        offset = name_start + len as usize;
    }

    records
}
