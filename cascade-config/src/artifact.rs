//! Compiled artifacts and the source fingerprints they depend on

use crate::handler::cache::CacheTable;
use crate::handler::php::PhpOverrides;
use crate::handler::security::SecurityTable;
use crate::handler::settings::SettingsTable;
use crate::handler::view::ViewTable;
use crate::handler::HandlerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One watched candidate file and the modification time seen when it was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub path: PathBuf,
    /// `None` when the file did not exist.
    pub modified: Option<SystemTime>,
}

impl FingerprintEntry {
    /// Stat `path` now.
    pub fn observe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let modified = current_mtime(&path);
        Self { path, modified }
    }

    /// Whether the file still looks the way it did when checked.
    pub fn is_current(&self) -> bool {
        current_mtime(&self.path) == self.modified
    }
}

fn current_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .and_then(|m| m.modified().ok())
}

/// Every candidate file an artifact was built from, present or not.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFingerprint {
    entries: Vec<FingerprintEntry>,
}

impl SourceFingerprint {
    /// Stat every path in order, ignoring duplicates.
    pub fn capture<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut fingerprint = Self::default();
        fingerprint.include(paths);
        fingerprint
    }

    /// Stat additional paths not already covered.
    pub fn include<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            let path = path.into();
            if !self.covers(&path) {
                self.entries.push(FingerprintEntry::observe(path));
            }
        }
    }

    pub fn covers(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// True when no watched file was modified, created or deleted.
    pub fn is_fresh(&self) -> bool {
        self.entries.iter().all(FingerprintEntry::is_current)
    }

    /// Watched files that no longer match.
    pub fn changed(&self) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|e| !e.is_current())
            .map(|e| e.path.as_path())
            .collect()
    }

    /// Files that existed when checked.
    pub fn existing(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|e| e.modified.is_some())
            .map(|e| e.path.as_path())
    }

    pub fn entries(&self) -> &[FingerprintEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The typed result of compiling one merged tree.
///
/// Each variant is directly interpretable at request time; see the handler
/// modules for the query methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "table", rename_all = "snake_case")]
pub enum Artifact {
    Security(SecurityTable),
    View(ViewTable),
    Cache(CacheTable),
    Php(PhpOverrides),
    Settings(SettingsTable),
}

impl Artifact {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Security(_) => HandlerKind::Security,
            Self::View(_) => HandlerKind::View,
            Self::Cache(_) => HandlerKind::Cache,
            Self::Php(_) => HandlerKind::Php,
            Self::Settings(_) => HandlerKind::Settings,
        }
    }

    pub fn as_security(&self) -> Option<&SecurityTable> {
        match self {
            Self::Security(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&ViewTable> {
        match self {
            Self::View(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_cache(&self) -> Option<&CacheTable> {
        match self {
            Self::Cache(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_php(&self) -> Option<&PhpOverrides> {
        match self {
            Self::Php(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_settings(&self) -> Option<&SettingsTable> {
        match self {
            Self::Settings(t) => Some(t),
            _ => None,
        }
    }
}

/// Provenance stored alongside every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub generator: String,
    pub logical_path: String,
    pub generated_at: DateTime<Utc>,
    /// Digest of the non-file inputs the artifact was compiled with.
    #[serde(default)]
    pub inputs: String,
}

/// A compiled artifact together with what it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub header: ArtifactHeader,
    pub fingerprint: SourceFingerprint,
    pub body: Artifact,
}

impl CompiledArtifact {
    pub fn new(logical_path: impl Into<String>, body: Artifact, fingerprint: SourceFingerprint) -> Self {
        Self {
            header: ArtifactHeader {
                generator: format!("cascade {} handler", body.kind()),
                logical_path: logical_path.into(),
                generated_at: Utc::now(),
                inputs: String::new(),
            },
            fingerprint,
            body,
        }
    }

    pub fn kind(&self) -> HandlerKind {
        self.body.kind()
    }

    /// Serialized body alone; identical for identical inputs.
    pub fn body_text(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(&self.body)
    }

    pub fn is_fresh(&self) -> bool {
        self.fingerprint.is_fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_detects_modification() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("cache.yml");
        fs::write(&file, "all: {}").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(1_000_000, 0)).unwrap();

        let fp = SourceFingerprint::capture([&file]);
        assert!(fp.is_fresh());

        set_file_mtime(&file, FileTime::from_unix_time(2_000_000, 0)).unwrap();
        assert!(!fp.is_fresh());
        assert_eq!(fp.changed(), vec![file.as_path()]);
    }

    #[test]
    fn test_fingerprint_detects_created_and_deleted_files() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("override.yml");
        let present = temp.path().join("base.yml");
        fs::write(&present, "all: {}").unwrap();

        let fp = SourceFingerprint::capture([&present, &missing]);
        assert!(fp.is_fresh());
        assert_eq!(fp.existing().collect::<Vec<_>>(), vec![present.as_path()]);

        fs::write(&missing, "all: {}").unwrap();
        assert!(!fp.is_fresh());

        let fp = SourceFingerprint::capture([&present]);
        fs::remove_file(&present).unwrap();
        assert!(!fp.is_fresh());
    }

    #[test]
    fn test_include_skips_covered_paths() {
        let mut fp = SourceFingerprint::capture(["/nonexistent/a.yml"]);
        fp.include(["/nonexistent/a.yml", "/nonexistent/b.yml"]);
        assert_eq!(fp.len(), 2);
        assert!(fp.covers(Path::new("/nonexistent/b.yml")));
    }

    #[test]
    fn test_generator_names_handler_kind() {
        let artifact = CompiledArtifact::new(
            "config/settings.yml",
            Artifact::Settings(SettingsTable::default()),
            SourceFingerprint::default(),
        );
        assert_eq!(artifact.header.generator, "cascade settings handler");
        assert_eq!(artifact.kind(), HandlerKind::Settings);
        assert!(artifact.is_fresh());
    }
}
