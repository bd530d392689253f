//! `FILE_NOTIFY_INFORMATION` decoding.
//!
//! Layout of one record (little-endian):
//!
//! ```text
//! +0  NextEntryOffset  u32   bytes from this record to the next, 0 = last
//! +4  Action           u32
//! +8  FileNameLength   u32   in bytes
//! +12 FileName         [u16] not NUL-terminated
//! ```
//!
//! Records are DWORD-aligned by the OS, so padding may sit between the end of
//! a name and the next record; following `NextEntryOffset` skips it.

use smallvec::SmallVec;

use super::{RawAction, RawChange};

/// `FILE_ACTION_ADDED`.
pub const FILE_ACTION_ADDED: u32 = 1;
/// `FILE_ACTION_REMOVED`.
pub const FILE_ACTION_REMOVED: u32 = 2;
/// `FILE_ACTION_MODIFIED`.
pub const FILE_ACTION_MODIFIED: u32 = 3;
/// `FILE_ACTION_RENAMED_OLD_NAME`.
pub const FILE_ACTION_RENAMED_OLD_NAME: u32 = 4;
/// `FILE_ACTION_RENAMED_NEW_NAME`.
pub const FILE_ACTION_RENAMED_NEW_NAME: u32 = 5;

const HEADER_LEN: usize = 12;

/// One decoded `FILE_NOTIFY_INFORMATION` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRecord {
    /// The raw `FILE_ACTION_*` code.
    pub action: u32,
    /// The file name, relative to the watched directory.
    pub name: String,
}

impl NotifyRecord {
    /// Maps the action code to the portable vocabulary.
    ///
    /// Unknown codes are reported as modifications.
    #[must_use]
    pub const fn raw_action(&self) -> RawAction {
        match self.action {
            FILE_ACTION_ADDED => RawAction::Created,
            FILE_ACTION_REMOVED => RawAction::Deleted,
            FILE_ACTION_RENAMED_OLD_NAME => RawAction::RenamedOld,
            FILE_ACTION_RENAMED_NEW_NAME => RawAction::RenamedNew,
            _ => RawAction::Modified,
        }
    }

    /// Converts into a [`RawChange`].
    #[must_use]
    pub fn into_change(self) -> RawChange {
        RawChange::new(self.raw_action(), self.name)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let field = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

/// Decodes every complete record in `buf`.
///
/// Decoding stops at the record whose `NextEntryOffset` is zero, at the end of
/// the buffer, or at the first malformed record.
///
/// # Examples
///
/// ```
/// use sw_watcher::decode::windows::{decode, FILE_ACTION_ADDED};
///
/// let name: Vec<u8> = "a.txt".encode_utf16().flat_map(u16::to_le_bytes).collect();
/// let mut buf = Vec::new();
/// buf.extend_from_slice(&0u32.to_le_bytes());
/// buf.extend_from_slice(&FILE_ACTION_ADDED.to_le_bytes());
/// buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
/// buf.extend_from_slice(&name);
///
/// let records = decode(&buf);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].name, "a.txt");
/// ```
#[must_use]
pub fn decode(buf: &[u8]) -> Vec<NotifyRecord> {
    let mut records = Vec::new();
    let mut offset = 0usize;

    loop {
        let (Some(next), Some(action), Some(name_len)) = (
            read_u32(buf, offset),
            read_u32(buf, offset + 4),
            read_u32(buf, offset + 8),
        ) else {
            break;
        };

        let name_start = offset + HEADER_LEN;
        let Some(name_bytes) = buf.get(name_start..name_start + name_len as usize) else {
            tracing::trace!(offset, name_len, "Truncated notify record");
            break;
        };

        let units: SmallVec<[u16; 128]> = name_bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        records.push(NotifyRecord {
            action,
            name: String::from_utf16_lossy(&units),
        });

        if next == 0 {
            break;
        }
        if (next as usize) < HEADER_LEN {
            tracing::trace!(offset, next, "Notify record offset too small");
            break;
        }
        offset += next as usize;
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(name: &str) -> Vec<u8> {
        name.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    /// Appends one record padded to a DWORD boundary; returns its start offset.
    fn push_record(buf: &mut Vec<u8>, action: u32, name: &str) -> usize {
        let start = buf.len();
        let name = utf16(name);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&action.to_le_bytes());
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(&name);
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
        start
    }

    fn link(buf: &mut [u8], from: usize, to: usize) {
        let next = (to - from) as u32;
        buf[from..from + 4].copy_from_slice(&next.to_le_bytes());
    }

    #[test]
    fn test_single_record() {
        let mut buf = Vec::new();
        push_record(&mut buf, FILE_ACTION_REMOVED, "gone.txt");

        let records = decode(&buf);
        assert_eq!(
            records,
            vec![NotifyRecord {
                action: FILE_ACTION_REMOVED,
                name: "gone.txt".to_owned()
            }]
        );
    }

    #[test]
    fn test_chained_records_with_padding() {
        let mut buf = Vec::new();
        // "a.t" is 6 bytes of name; the record is padded by 2 bytes.
        let first = push_record(&mut buf, FILE_ACTION_RENAMED_OLD_NAME, "a.t");
        let second = push_record(&mut buf, FILE_ACTION_RENAMED_NEW_NAME, "b.txt");
        link(&mut buf, first, second);

        let records = decode(&buf);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw_action(), RawAction::RenamedOld);
        assert_eq!(records[0].name, "a.t");
        assert_eq!(records[1].raw_action(), RawAction::RenamedNew);
        assert_eq!(records[1].name, "b.txt");
    }

    #[test]
    fn test_stops_at_zero_offset() {
        let mut buf = Vec::new();
        push_record(&mut buf, FILE_ACTION_ADDED, "one");
        // Unlinked second record must be ignored.
        push_record(&mut buf, FILE_ACTION_ADDED, "two");

        let records = decode(&buf);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "one");
    }

    #[test]
    fn test_non_ascii_names() {
        let mut buf = Vec::new();
        push_record(&mut buf, FILE_ACTION_ADDED, "résumé-日本.txt");
        assert_eq!(decode(&buf)[0].name, "résumé-日本.txt");
    }

    #[test]
    fn test_subtree_names_keep_separators() {
        let mut buf = Vec::new();
        push_record(&mut buf, FILE_ACTION_MODIFIED, "sub\\dir\\file.txt");
        assert_eq!(decode(&buf)[0].name, "sub\\dir\\file.txt");
    }

    #[test]
    fn test_truncated_name_is_dropped() {
        let mut buf = Vec::new();
        let first = push_record(&mut buf, FILE_ACTION_ADDED, "ok");
        let second = push_record(&mut buf, FILE_ACTION_ADDED, "truncated");
        link(&mut buf, first, second);
        buf.truncate(second + HEADER_LEN + 4);

        let records = decode(&buf);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "ok");
    }

    #[test]
    fn test_offset_past_end_is_dropped() {
        let mut buf = Vec::new();
        let first = push_record(&mut buf, FILE_ACTION_ADDED, "ok");
        buf[first..first + 4].copy_from_slice(&4096u32.to_le_bytes());
        assert_eq!(decode(&buf).len(), 1);
    }

    #[test]
    fn test_empty_buffer() {
        assert!(decode(&[]).is_empty());
        assert!(decode(&[0u8; 8]).is_empty());
    }

    #[test]
    fn test_action_mapping() {
        let record = |action| NotifyRecord {
            action,
            name: String::new(),
        };
        assert_eq!(record(FILE_ACTION_ADDED).raw_action(), RawAction::Created);
        assert_eq!(record(FILE_ACTION_REMOVED).raw_action(), RawAction::Deleted);
        assert_eq!(record(FILE_ACTION_MODIFIED).raw_action(), RawAction::Modified);
        assert_eq!(record(99).raw_action(), RawAction::Modified);
    }

    #[test]
    fn test_into_change() {
        let change = NotifyRecord {
            action: FILE_ACTION_ADDED,
            name: "a.txt".to_owned(),
        }
        .into_change();
        assert_eq!(change, RawChange::new(RawAction::Created, "a.txt"));
        assert_eq!(change.cookie, None);
        assert_eq!(change.is_dir, None);
    }
}
