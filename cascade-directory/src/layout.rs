//! Physical layout of a project and its cascade roots.
//!
//! `ProjectLayout` records where each precedence layer lives on disk: the
//! framework data directory, the project root, the active application, the
//! plugins directory and the directory holding generated overrides.

use crate::error::{DirectoryError, Result};
use std::path::{Path, PathBuf};

/// Marker file identifying a project root.
pub const PROJECT_MARKER: &str = "cascade.yaml";

/// Relative directory names used to derive default roots from the project root.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DirectoryNames {
    /// Framework data directory (framework defaults and core modules).
    pub framework: String,
    /// Directory holding one subdirectory per plugin.
    pub plugins: String,
    /// Directory holding one subdirectory per application.
    pub apps: String,
    /// Directory holding generated overrides.
    pub generated: String,
    /// Directory holding compiled artifacts.
    pub cache: String,
}

impl Default for DirectoryNames {
    fn default() -> Self {
        Self {
            framework: "lib/framework/data".to_string(),
            plugins: "plugins".to_string(),
            apps: "apps".to_string(),
            generated: "cache/generated".to_string(),
            cache: "cache/config".to_string(),
        }
    }
}

/// Where each cascade layer lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    project_root: PathBuf,
    framework_dir: PathBuf,
    plugins_dir: PathBuf,
    apps_dir: PathBuf,
    generated_dir: PathBuf,
    cache_dir: PathBuf,
    application: Option<String>,
}

impl ProjectLayout {
    /// Layout rooted at `project_root` using the default directory names.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_names(project_root, &DirectoryNames::default())
    }

    /// Layout rooted at `project_root` using custom directory names.
    pub fn with_names(project_root: impl Into<PathBuf>, names: &DirectoryNames) -> Self {
        let project_root = project_root.into();
        Self {
            framework_dir: project_root.join(&names.framework),
            plugins_dir: project_root.join(&names.plugins),
            apps_dir: project_root.join(&names.apps),
            generated_dir: project_root.join(&names.generated),
            cache_dir: project_root.join(&names.cache),
            project_root,
            application: None,
        }
    }

    /// Locate the project root from the current directory and build a default layout.
    pub fn discover() -> Result<Self> {
        let start = std::env::current_dir()?;
        let root = find_project_root_from(&start, PROJECT_MARKER).ok_or_else(|| {
            DirectoryError::ProjectRootNotFound {
                marker: PROJECT_MARKER.to_string(),
                start,
            }
        })?;
        Ok(Self::new(root))
    }

    /// Activate an application (adds the application and module-local layers).
    pub fn with_application(mut self, name: impl Into<String>) -> Self {
        self.application = Some(name.into());
        self
    }

    /// Override the framework data directory.
    pub fn with_framework_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.framework_dir = dir.into();
        self
    }

    /// Override the plugins directory.
    pub fn with_plugins_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugins_dir = dir.into();
        self
    }

    /// Override the generated-overrides directory.
    pub fn with_generated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.generated_dir = dir.into();
        self
    }

    /// Override the compiled-artifact cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn framework_dir(&self) -> &Path {
        &self.framework_dir
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    pub fn generated_dir(&self) -> &Path {
        &self.generated_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The active application name.
    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    /// The active application's root directory.
    pub fn app_dir(&self) -> Option<PathBuf> {
        self.application
            .as_ref()
            .map(|name| self.apps_dir.join(name))
    }
}

/// Find the project root by walking up from `start` until `marker` exists.
pub fn find_project_root_from(start: &Path, marker: &str) -> Option<PathBuf> {
    let mut path = start;
    loop {
        if path.join(marker).is_file() {
            return Some(path.to_path_buf());
        }

        match path.parent() {
            Some(parent) => path = parent,
            None => return None,
        }
    }
}
