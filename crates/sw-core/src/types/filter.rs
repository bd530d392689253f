//! Change category flags.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// The categories of change a watcher reports.
    ///
    /// Bit values are stable and form part of the external interface.
    ///
    /// # Examples
    ///
    /// ```
    /// use sw_core::ChangeFilter;
    ///
    /// let filter = ChangeFilter::from_mask(0x3F);
    /// assert_eq!(filter, ChangeFilter::all());
    ///
    /// // Unknown bits are ignored.
    /// assert_eq!(ChangeFilter::from_mask(0x101), ChangeFilter::NAME);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ChangeFilter: u32 {
        /// File creation, deletion, and renames.
        const NAME = 0x0001;
        /// Directory creation, deletion, and renames.
        const DIR_NAME = 0x0002;
        /// Attribute changes.
        const ATTRIBUTES = 0x0004;
        /// File size changes.
        const SIZE = 0x0008;
        /// Last-write time changes.
        const LAST_WRITE = 0x0010;
        /// Security descriptor / permission changes.
        const SECURITY = 0x0020;
    }
}

impl ChangeFilter {
    /// Builds a filter from an external bitmask, dropping unknown bits.
    #[inline]
    #[must_use]
    pub const fn from_mask(mask: u32) -> Self {
        Self::from_bits_truncate(mask)
    }

    /// Returns `true` if any name category (file or directory) is requested.
    #[inline]
    #[must_use]
    pub const fn wants_names(self) -> bool {
        self.intersects(Self::NAME.union(Self::DIR_NAME))
    }

    /// Returns `true` if any content or metadata category is requested.
    #[inline]
    #[must_use]
    pub const fn wants_modifications(self) -> bool {
        self.intersects(
            Self::ATTRIBUTES
                .union(Self::SIZE)
                .union(Self::LAST_WRITE)
                .union(Self::SECURITY),
        )
    }

    /// Returns `true` if name changes of an entry of the given type are requested.
    ///
    /// `is_dir` is `None` when the platform does not say what kind of entry
    /// changed (Windows); either name category admits it then.
    #[inline]
    #[must_use]
    pub const fn admits_name_change(self, is_dir: Option<bool>) -> bool {
        match is_dir {
            Some(true) => self.contains(Self::DIR_NAME),
            Some(false) => self.contains(Self::NAME),
            None => self.wants_names(),
        }
    }
}

impl Default for ChangeFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_values() {
        assert_eq!(ChangeFilter::NAME.bits(), 0x1);
        assert_eq!(ChangeFilter::DIR_NAME.bits(), 0x2);
        assert_eq!(ChangeFilter::ATTRIBUTES.bits(), 0x4);
        assert_eq!(ChangeFilter::SIZE.bits(), 0x8);
        assert_eq!(ChangeFilter::LAST_WRITE.bits(), 0x10);
        assert_eq!(ChangeFilter::SECURITY.bits(), 0x20);
        assert_eq!(ChangeFilter::all().bits(), 0x3F);
    }

    #[test]
    fn test_from_mask_truncates() {
        assert_eq!(ChangeFilter::from_mask(0xFFFF_FFFF), ChangeFilter::all());
        assert!(ChangeFilter::from_mask(0x40).is_empty());
    }

    #[test]
    fn test_name_categories() {
        let files = ChangeFilter::NAME;
        assert!(files.admits_name_change(Some(false)));
        assert!(!files.admits_name_change(Some(true)));
        assert!(files.admits_name_change(None));

        let dirs = ChangeFilter::DIR_NAME;
        assert!(dirs.admits_name_change(Some(true)));
        assert!(!dirs.admits_name_change(Some(false)));

        let size = ChangeFilter::SIZE;
        assert!(!size.wants_names());
        assert!(!size.admits_name_change(None));
        assert!(size.wants_modifications());
    }

    #[test]
    fn test_default_is_all() {
        assert_eq!(ChangeFilter::default(), ChangeFilter::all());
    }
}
