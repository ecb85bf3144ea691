//! Persistent store of compiled artifacts
//!
//! Artifacts live at `<root>/<application|_global>/<environment>/<logical path>.cache.yml`.
//! Each file starts with a two-line comment header followed by a YAML envelope
//! holding the header, the source fingerprint and the body. Files are written
//! to a uniquely named sibling and renamed into place, so a reader sees either
//! the previous envelope or the new one, never a partial write.

use crate::artifact::CompiledArtifact;
use crate::error::{ConfigError, Result};
use cascade_directory::LogicalPath;
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Suffix appended to the logical path of every cache file.
pub const CACHE_SUFFIX: &str = ".cache.yml";

/// Directory used when no application is active.
pub const GLOBAL_SCOPE: &str = "_global";

/// Identity of one compiled artifact.
///
/// `inputs` does not affect where the artifact is stored; a stored artifact
/// compiled with different inputs is stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub logical_path: LogicalPath,
    pub environment: String,
    pub application: Option<String>,
    pub inputs: String,
}

impl CacheKey {
    pub fn new(
        logical_path: LogicalPath,
        environment: impl Into<String>,
        application: Option<&str>,
    ) -> Self {
        Self {
            logical_path,
            environment: environment.into(),
            application: application.map(str::to_string),
            inputs: String::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: impl Into<String>) -> Self {
        self.inputs = inputs.into();
        self
    }

    /// Whether both keys name the same file, whatever their inputs.
    pub fn same_location(&self, other: &CacheKey) -> bool {
        self.logical_path == other.logical_path
            && self.environment == other.environment
            && self.application == other.application
    }

    /// Whether `artifact` was compiled for this key and none of its sources changed.
    pub fn accepts(&self, artifact: &CompiledArtifact) -> bool {
        artifact.header.inputs == self.inputs && artifact.is_fresh()
    }

    /// Location of the artifact relative to the cache root.
    pub fn relative_path(&self) -> Result<PathBuf> {
        let scope = match &self.application {
            Some(app) => segment(app, "application")?,
            None => GLOBAL_SCOPE,
        };
        let mut path = PathBuf::from(scope);
        path.push(segment(&self.environment, "environment")?);
        path.push(format!("{}{}", self.logical_path, CACHE_SUFFIX));
        Ok(path)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}/{}]",
            self.logical_path,
            self.application.as_deref().unwrap_or(GLOBAL_SCOPE),
            self.environment
        )
    }
}

fn segment<'a>(name: &'a str, what: &str) -> Result<&'a str> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\']);
    if valid {
        Ok(name)
    } else {
        Err(ConfigError::configuration(
            None,
            None,
            format!("invalid {what} name '{name}' for the compiled cache"),
        ))
    }
}

/// Freshness of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Uncompiled,
    Fresh,
    Stale,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uncompiled => "uncompiled",
            Self::Fresh => "fresh",
            Self::Stale => "stale",
        })
    }
}

/// Compiled artifacts on disk plus an in-process memo.
#[derive(Debug)]
pub struct CompiledCache {
    root: PathBuf,
    memo: DashMap<CacheKey, Arc<CompiledArtifact>>,
}

impl CompiledCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            memo: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> Result<PathBuf> {
        Ok(self.root.join(key.relative_path()?))
    }

    /// The stored artifact, if one exists and none of its sources changed.
    pub fn lookup(&self, key: &CacheKey) -> Result<Option<Arc<CompiledArtifact>>> {
        if let Some(artifact) = self.memo.get(key).map(|a| Arc::clone(a.value())) {
            if key.accepts(&artifact) {
                debug!("Compiled cache hit (memory) for {}", key);
                return Ok(Some(artifact));
            }
            self.memo.remove(key);
        }

        let Some(artifact) = self.read(key)? else {
            return Ok(None);
        };
        if artifact.header.inputs != key.inputs {
            debug!("Compiled artifact for {} was built with other inputs", key);
            return Ok(None);
        }
        if !artifact.is_fresh() {
            debug!(
                "Compiled artifact for {} is stale: {:?}",
                key,
                artifact.fingerprint.changed()
            );
            return Ok(None);
        }

        debug!("Compiled cache hit (disk) for {}", key);
        let artifact = Arc::new(artifact);
        self.memo.insert(key.clone(), Arc::clone(&artifact));
        Ok(Some(artifact))
    }

    /// Persist `artifact` for `key`, replacing any previous entry.
    pub fn store(&self, key: &CacheKey, mut artifact: CompiledArtifact) -> Result<Arc<CompiledArtifact>> {
        artifact.header.inputs = key.inputs.clone();
        let path = self.path_for(key)?;
        let text = render(&path, &artifact)?;

        let dir = path
            .parent()
            .ok_or_else(|| ConfigError::cache_io(&path, std::io::Error::from(ErrorKind::InvalidInput)))?;
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::cache_io(dir, e))?;
        atomic_write(&path, text.as_bytes())?;
        info!("Compiled {} into {}", key, path.display());

        self.forget(key);
        let artifact = Arc::new(artifact);
        self.memo.insert(key.clone(), Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Return the fresh artifact for `key`, compiling and storing it when needed.
    ///
    /// Compilation errors are returned as-is and leave the cache untouched.
    pub fn get_or_compile<F>(&self, key: &CacheKey, compile: F) -> Result<Arc<CompiledArtifact>>
    where
        F: FnOnce() -> Result<CompiledArtifact>,
    {
        if let Some(artifact) = self.lookup(key)? {
            return Ok(artifact);
        }
        let artifact = compile()?;
        self.store(key, artifact)
    }

    pub fn state(&self, key: &CacheKey) -> Result<CacheState> {
        if let Some(artifact) = self.memo.get(key) {
            if key.accepts(&artifact) {
                return Ok(CacheState::Fresh);
            }
        }
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Ok(CacheState::Uncompiled);
        }
        Ok(match self.read(key)? {
            Some(artifact) if key.accepts(&artifact) => CacheState::Fresh,
            _ => CacheState::Stale,
        })
    }

    /// Remove the entry for `key`. Returns whether a file was removed.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        self.forget(key);
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Invalidated {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ConfigError::cache_io(path, e)),
        }
    }

    /// Remove every compiled artifact. Returns how many files were removed.
    pub fn clear_all(&self) -> Result<usize> {
        self.memo.clear();
        if !self.root.is_dir() {
            return Ok(0);
        }

        let pattern = self.root.join("**").join(format!("*{CACHE_SUFFIX}"));
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern).map_err(|e| {
            ConfigError::configuration(None, None, format!("invalid cache root pattern: {e}"))
        })?;

        let mut removed = 0;
        for path in entries.flatten() {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ConfigError::cache_io(path, e)),
            }
        }
        info!("Cleared {} compiled artifact(s) from {}", removed, self.root.display());
        Ok(removed)
    }

    /// Drop memoized artifacts stored at the location of `key`.
    fn forget(&self, key: &CacheKey) {
        self.memo.retain(|k, _| !k.same_location(key));
    }

    /// Read and decode the stored envelope. Corrupt envelopes read as `None`.
    fn read(&self, key: &CacheKey) -> Result<Option<CompiledArtifact>> {
        let path = self.path_for(key)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::cache_io(path, e)),
        };

        match serde_yaml_ng::from_str::<CompiledArtifact>(&content) {
            Ok(artifact) => Ok(Some(artifact)),
            Err(e) => {
                warn!(
                    "Ignoring unreadable compiled artifact {}: {}",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }
}

/// Header comment plus YAML envelope.
fn render(path: &Path, artifact: &CompiledArtifact) -> Result<String> {
    let envelope = serde_yaml_ng::to_string(artifact).map_err(|e| ConfigError::CacheEncoding {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(format!(
        "# auto-generated by {}\n# date: {}\n{}",
        artifact.header.generator,
        artifact.header.generated_at.format("%Y/%m/%d %H:%M:%S"),
        envelope
    ))
}

/// Write to a uniquely named temp file in the target directory, then rename.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| ConfigError::cache_io(path, std::io::Error::from(ErrorKind::InvalidInput)))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    std::fs::write(&tmp, data).map_err(|e| ConfigError::cache_io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(ConfigError::cache_io(path, e));
    }
    Ok(())
}
