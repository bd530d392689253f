//! Error types for the sw-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration and
//! request validation failures.

use camino::Utf8PathBuf;

/// Errors that can occur while loading or validating configuration.
///
/// # Examples
///
/// ```
/// use sw_core::ConfigError;
///
/// let error = ConfigError::InvalidOption {
///     option: "buffer_size".to_owned(),
///     reason: "must be a multiple of 4".to_owned(),
/// };
/// assert!(error.to_string().contains("buffer_size"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// A configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("filter", "at least one category is required");
        insta::assert_snapshot!(
            error.to_string(),
            @"invalid configuration option 'filter': at least one category is required"
        );
    }

    #[test]
    fn test_read_display_includes_path() {
        let error = ConfigError::Read {
            path: Utf8PathBuf::from("/etc/watcher.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = error.to_string();
        assert!(msg.contains("/etc/watcher.json"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_parse_from_serde() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let error = ConfigError::from(err);
        assert!(error.to_string().starts_with("failed to parse configuration"));
    }
}
