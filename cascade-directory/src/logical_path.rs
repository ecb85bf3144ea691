//! Logical configuration paths.
//!
//! A logical path names a configuration concern independently of the physical
//! directory that ends up supplying it. Two shapes are recognized:
//!
//! - global: `config/app.yml`
//! - module-scoped: `modules/blog/config/view.yml`

use crate::error::{DirectoryError, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Directory name that introduces a module-scoped logical path.
pub const MODULES_DIR_NAME: &str = "modules";

/// A validated, location-independent configuration path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalPath {
    raw: String,
    module: Option<String>,
    config_dir: String,
    file_name: String,
}

impl LogicalPath {
    /// Parse a logical path such as `config/view.yml` or `modules/blog/config/view.yml`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DirectoryError::invalid_logical_path(raw, "path is empty"));
        }
        if trimmed.starts_with('/') || Path::new(trimmed).is_absolute() {
            return Err(DirectoryError::invalid_logical_path(
                raw,
                "logical paths are relative to a cascade root",
            ));
        }

        let parts: Vec<&str> = trimmed.split('/').collect();
        if let Some(bad) = parts
            .iter()
            .find(|p| p.is_empty() || **p == "." || **p == "..")
        {
            return Err(DirectoryError::invalid_logical_path(
                raw,
                format!("illegal path segment '{bad}'"),
            ));
        }
        if parts.len() < 2 {
            return Err(DirectoryError::invalid_logical_path(
                raw,
                "expected at least '<configDir>/<fileName>'",
            ));
        }

        let file_name = parts[parts.len() - 1].to_string();
        let config_dir = parts[parts.len() - 2].to_string();

        let module = if parts[0] == MODULES_DIR_NAME && parts.len() > 2 {
            if parts.len() < 4 {
                return Err(DirectoryError::invalid_logical_path(
                    raw,
                    "expected 'modules/<module>/<configDir>/<fileName>'",
                ));
            }
            Some(parts[1].to_string())
        } else {
            None
        };

        Ok(Self {
            raw: parts.join("/"),
            module,
            config_dir,
            file_name,
        })
    }

    /// Build a global logical path `<config_dir>/<file_name>`.
    pub fn global(config_dir: &str, file_name: &str) -> Result<Self> {
        Self::parse(&format!("{config_dir}/{file_name}"))
    }

    /// Build a module-scoped logical path `modules/<module>/<config_dir>/<file_name>`.
    pub fn for_module(module: &str, config_dir: &str, file_name: &str) -> Result<Self> {
        Self::parse(&format!(
            "{MODULES_DIR_NAME}/{module}/{config_dir}/{file_name}"
        ))
    }

    /// The module this path is scoped to, if any.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Whether the path is module-scoped.
    pub fn is_module_scoped(&self) -> bool {
        self.module.is_some()
    }

    /// The configuration file name (e.g. `view.yml`).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The configuration directory name (e.g. `config`).
    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// The global form of this path: `<config_dir>/<file_name>`.
    pub fn global_path(&self) -> PathBuf {
        PathBuf::from(&self.config_dir).join(&self.file_name)
    }

    /// The full relative path.
    pub fn as_path(&self) -> PathBuf {
        PathBuf::from(&self.raw)
    }

    /// The containing relative directory (the path without the file name).
    pub fn directory(&self) -> PathBuf {
        self.as_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// The global containing directory (`<config_dir>`).
    pub fn global_directory(&self) -> PathBuf {
        PathBuf::from(&self.config_dir)
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for LogicalPath {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LogicalPath {
    type Error = DirectoryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LogicalPath> for String {
    fn from(value: LogicalPath) -> Self {
        value.raw
    }
}

/// Whether `relative` stays inside whatever root it is joined to.
pub(crate) fn is_contained(relative: &Path) -> bool {
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
