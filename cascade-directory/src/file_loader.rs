//! Loading the physical files behind a logical path.
//!
//! Given the resolved search entries, every entry whose directory contains the
//! requested file contributes one [`SourceFile`], in precedence order.

use crate::error::{DirectoryError, Result};
use crate::resolver::{SearchEntry, SearchOrigin};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Maximum file size to load (10MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// A configuration file found in the cascade.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// The full path to the file.
    pub path: PathBuf,
    /// The file content.
    pub content: String,
    /// Layer the file came from.
    pub origin: SearchOrigin,
    /// Modification time observed when the file was read.
    pub modified: Option<SystemTime>,
}

/// Read `file_name` from every entry that has it, lowest precedence first.
///
/// Entries without the file are skipped. Unreadable, oversized or escaping
/// files are errors rather than silently skipped.
pub fn load_sources(entries: &[SearchEntry], file_name: &str) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();

    for entry in entries {
        let path = entry.candidate(file_name);
        if !path.is_file() {
            continue;
        }

        let metadata =
            std::fs::metadata(&path).map_err(|e| DirectoryError::file_read(&path, e))?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(DirectoryError::FileTooLarge {
                path,
                size: metadata.len(),
                limit: MAX_FILE_SIZE,
            });
        }

        if !is_path_safe(&path, &entry.directory) {
            return Err(DirectoryError::PathValidation { path });
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| DirectoryError::file_read(&path, e))?;
        tracing::trace!("Loaded '{}' from {}", path.display(), entry.origin);

        sources.push(SourceFile {
            modified: metadata.modified().ok(),
            path,
            content,
            origin: entry.origin.clone(),
        });
    }

    Ok(sources)
}

/// Validate that a path is safe and within the expected directory.
fn is_path_safe(path: &Path, base_dir: &Path) -> bool {
    match (path.canonicalize(), base_dir.canonicalize()) {
        (Ok(canonical_path), Ok(canonical_base)) => canonical_path.starts_with(&canonical_base),
        _ => {
            let path_str = path.to_string_lossy();
            !path_str.contains("..") && !path_str.contains('~')
        }
    }
}
