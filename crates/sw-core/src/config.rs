//! Configuration structures for simple-watcher.
//!
//! - [`WatchConfig`] - per-watcher tunables (buffer size, rename policy)
//! - [`Config`] - root configuration, loadable from JSON
//!
//! All configuration types implement [`Default`], and missing fields fall back
//! to their defaults when deserializing.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest accepted raw notification buffer, in bytes.
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Largest accepted raw notification buffer, in bytes.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Default raw notification buffer size, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// How the two halves of a rename are surfaced.
///
/// Both Windows (old-name/new-name records) and Linux (moved-from/moved-to
/// with a shared cookie) report enough information to correlate a rename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum RenamePolicy {
    /// Emit one [`Renamed`](crate::ChangeKind::Renamed) event carrying both names.
    #[default]
    Fuse,
    /// Emit [`RenamedFrom`](crate::ChangeKind::RenamedFrom) followed by
    /// [`RenamedTo`](crate::ChangeKind::RenamedTo); the latter carries the old name.
    Split,
}

/// Configuration for a single watcher.
///
/// # Examples
///
/// ```
/// use sw_core::{RenamePolicy, WatchConfig};
///
/// let config = WatchConfig::default();
/// assert_eq!(config.buffer_size, 8192);
/// assert_eq!(config.rename_policy, RenamePolicy::Fuse);
/// assert!(!config.auto_start);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Size of the raw notification buffer in bytes.
    ///
    /// Must be a multiple of 4 (Windows requires DWORD alignment) and within
    /// [`MIN_BUFFER_SIZE`]..=[`MAX_BUFFER_SIZE`].
    pub buffer_size: usize,

    /// How renames are reported.
    pub rename_policy: RenamePolicy,

    /// Arm the first read as part of creation instead of waiting for `start`.
    pub auto_start: bool,

    /// In recursive mode, start watching directories created after the watch began.
    ///
    /// Only meaningful where recursion is emulated (Linux).
    pub follow_new_directories: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            rename_policy: RenamePolicy::Fuse,
            auto_start: false,
            follow_new_directories: true,
        }
    }
}

impl WatchConfig {
    /// Checks that every option is within its accepted range.
    ///
    /// # Examples
    ///
    /// ```
    /// use sw_core::WatchConfig;
    ///
    /// let config = WatchConfig { buffer_size: 1000, ..WatchConfig::default() };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(ConfigError::invalid_option(
                "buffer_size",
                format!("must be between {MIN_BUFFER_SIZE} and {MAX_BUFFER_SIZE} bytes"),
            ));
        }
        if self.buffer_size % 4 != 0 {
            return Err(ConfigError::invalid_option(
                "buffer_size",
                "must be a multiple of 4",
            ));
        }
        Ok(())
    }
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use sw_core::Config;
///
/// let config = Config::from_json_str(r#"{"watch": {"rename_policy": "split"}}"#).unwrap();
/// assert_eq!(config.watch.buffer_size, 8192);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watcher configuration.
    pub watch: WatchConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.watch.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.rename_policy, RenamePolicy::Fuse);
        assert!(!config.auto_start);
        assert!(config.follow_new_directories);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_buffer_size_bounds() {
        let small = WatchConfig {
            buffer_size: MIN_BUFFER_SIZE - 4,
            ..WatchConfig::default()
        };
        assert!(small.validate().is_err());

        let large = WatchConfig {
            buffer_size: MAX_BUFFER_SIZE + 4,
            ..WatchConfig::default()
        };
        assert!(large.validate().is_err());

        let edge = WatchConfig {
            buffer_size: MIN_BUFFER_SIZE,
            ..WatchConfig::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_buffer_size_alignment() {
        let config = WatchConfig {
            buffer_size: 4098,
            ..WatchConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("multiple of 4"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let config = Config::from_json_str(r#"{"watch": {"rename_policy": "split"}}"#).unwrap();
        assert_eq!(config.watch.rename_policy, RenamePolicy::Split);
        assert_eq!(config.watch.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(config.watch.follow_new_directories);
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let result = Config::from_json_str(r#"{"watch": {"buffer_size": 10}}"#);
        assert!(matches!(result, Err(ConfigError::InvalidOption { .. })));
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("watch.json");
        std::fs::write(&path, r#"{"watch": {"auto_start": true}}"#).unwrap();

        let path = Utf8Path::from_path(&path).unwrap();
        let config = Config::load(path).unwrap();
        assert!(config.watch.auto_start);
    }

    #[test]
    fn test_config_load_missing_file() {
        let result = Config::load(Utf8Path::new("/nonexistent/watch.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_rename_policy_serialization() {
        assert_eq!(
            serde_json::to_string(&RenamePolicy::Fuse).unwrap(),
            r#""fuse""#
        );
        assert_eq!(
            serde_json::to_string(&RenamePolicy::Split).unwrap(),
            r#""split""#
        );
    }
}
