//! Error types for search-path resolution and source loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using DirectoryError.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors that can occur while resolving or reading cascade directories.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The logical path cannot identify a configuration file.
    #[error("invalid logical path '{path}': {reason}")]
    InvalidLogicalPath { path: String, reason: String },

    /// No project root (no marker file found in parent directories).
    #[error("no project root found (looked for '{marker}' from '{start}')")]
    ProjectRootNotFound { marker: String, start: PathBuf },

    /// An enabled plugin has no directory under the plugins directory.
    #[error("plugin '{name}' is enabled but '{path}' is not a directory")]
    PluginNotFound { name: String, path: PathBuf },

    /// A module, generator class or theme name is not a single path segment.
    #[error("invalid {what} name '{name}'")]
    InvalidName { what: String, name: String },

    /// No directory of a lookup chain holds the requested file.
    #[error("unable to find {kind} '{file}' in: {}", join_paths(searched))]
    NotFoundInChain {
        kind: String,
        file: String,
        searched: Vec<PathBuf>,
    },

    /// The plugin discovery glob pattern is invalid.
    #[error("invalid plugin glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Failed to read file.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exceeds size limit.
    #[error("file '{path}' exceeds size limit: {size} bytes > {limit} bytes")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// Path validation failed (potential path traversal).
    #[error("path validation failed for '{path}': potential path traversal")]
    PathValidation { path: PathBuf },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl DirectoryError {
    /// Create an InvalidLogicalPath error.
    pub fn invalid_logical_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLogicalPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileRead error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}
