//! Error types for the configuration cascade

use cascade_directory::DirectoryError;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for cascade configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed source syntax
    #[error("Failed to parse configuration file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Semantically invalid configuration
    #[error("Invalid configuration{}: {message}", Location::new(path.as_deref(), key.as_deref()))]
    Configuration {
        path: Option<PathBuf>,
        key: Option<String>,
        message: String,
    },

    /// Environment precondition violated; fatal at startup
    #[error("Initialization failed{}: {message}", Location::new(path.as_deref(), None))]
    Initialization {
        path: Option<PathBuf>,
        message: String,
    },

    /// Filesystem failure in the compiled cache
    #[error("Compiled cache I/O error on {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize a compiled artifact
    #[error("Compiled cache entry {} could not be encoded: {message}", path.display())]
    CacheEncoding { path: PathBuf, message: String },

    /// Project settings could not be loaded
    #[error("Failed to load project settings: {0}")]
    Settings(#[from] figment::Error),

    /// Search-path resolution or source loading failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ConfigError {
    /// Create a Parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a Configuration error tied to a file and key.
    pub fn configuration(
        path: Option<&Path>,
        key: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            path: path.map(Path::to_path_buf),
            key: key.map(str::to_string),
            message: message.into(),
        }
    }

    /// Create an Initialization error.
    pub fn initialization(path: Option<&Path>, message: impl Into<String>) -> Self {
        Self::Initialization {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }

    /// Create a CacheIo error.
    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the error must abort startup rather than a single request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }
}

/// Renders ` in <file> (key '<key>')` for error messages.
struct Location<'a> {
    path: Option<&'a Path>,
    key: Option<&'a str>,
}

impl<'a> Location<'a> {
    fn new(path: Option<&'a Path>, key: Option<&'a str>) -> Self {
        Self { path, key }
    }
}

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = self.path {
            write!(f, " in {}", path.display())?;
        }
        if let Some(key) = self.key {
            write!(f, " (key '{key}')")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_names_file_and_key() {
        let err = ConfigError::configuration(
            Some(Path::new("/p/config/security.yml")),
            Some("is_secur"),
            "unknown directive",
        );
        let message = err.to_string();
        assert!(message.contains("/p/config/security.yml"));
        assert!(message.contains("'is_secur'"));
        assert!(message.contains("unknown directive"));
    }

    #[test]
    fn test_only_initialization_is_fatal() {
        assert!(ConfigError::initialization(None, "x").is_fatal());
        assert!(!ConfigError::parse("/a.yml", "bad").is_fatal());
        assert!(!ConfigError::configuration(None, None, "x").is_fatal());
    }

    #[test]
    fn test_directory_error_is_transparent() {
        let err: ConfigError =
            DirectoryError::invalid_logical_path("x", "expected at least '<configDir>/<fileName>'")
                .into();
        assert!(err.to_string().starts_with("invalid logical path"));
    }
}
