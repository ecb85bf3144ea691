//! Enabled plugins and the directories they contribute to the cascade.

use crate::error::{DirectoryError, Result};
use crate::logical_path::is_contained;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A plugin enabled for this process.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PluginEntry {
    /// Plugin name (its directory name under the plugins directory).
    pub name: String,
    /// Root directory of the plugin.
    pub root_dir: PathBuf,
    /// Position in the enable list (0 = first registered, lowest precedence).
    pub enabled_order: usize,
}

/// Source of plugin-provided directories for a relative suffix.
///
/// The resolver depends on this trait only, so a registry may be backed by
/// filesystem discovery or by a precompiled manifest.
pub trait PluginDirectories {
    /// Existing directories `<plugin>/<relative>` as `(plugin name, directory)`,
    /// in registration order.
    fn config_directories(&self, relative: &Path) -> Vec<(String, PathBuf)>;
}

/// Ordered list of enabled plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRegistry {
    plugins: Vec<PluginEntry>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a static enable list.
    ///
    /// Every listed plugin must have a directory under `plugins_dir`.
    pub fn from_enable_list<S: AsRef<str>>(plugins_dir: &Path, names: &[S]) -> Result<Self> {
        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref();
            let root_dir = plugins_dir.join(name);
            if !is_contained(Path::new(name)) || !root_dir.is_dir() {
                return Err(DirectoryError::PluginNotFound {
                    name: name.to_string(),
                    path: root_dir,
                });
            }
            registry.register(name, root_dir);
        }
        debug!(
            "Registered {} enabled plugins from {}",
            registry.len(),
            plugins_dir.display()
        );
        Ok(registry)
    }

    /// Build a registry from every directory matching `<plugins_dir>/*`, sorted by name.
    pub fn discover(plugins_dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        for root_dir in glob_dirs(plugins_dir, Path::new(""))? {
            if let Some(name) = root_dir.file_name().and_then(|s| s.to_str()) {
                let name = name.to_string();
                registry.register(name, root_dir);
            }
        }
        debug!(
            "Discovered {} plugins in {}",
            registry.len(),
            plugins_dir.display()
        );
        Ok(registry)
    }

    /// Append a plugin at the end of the precedence order.
    pub fn register(&mut self, name: impl Into<String>, root_dir: impl Into<PathBuf>) {
        let entry = PluginEntry {
            name: name.into(),
            root_dir: root_dir.into(),
            enabled_order: self.plugins.len(),
        };
        trace!(
            "Plugin #{} '{}' at {}",
            entry.enabled_order,
            entry.name,
            entry.root_dir.display()
        );
        self.plugins.push(entry);
    }

    /// Plugins in registration order.
    pub fn plugins(&self) -> &[PluginEntry] {
        &self.plugins
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginDirectories for PluginRegistry {
    fn config_directories(&self, relative: &Path) -> Vec<(String, PathBuf)> {
        if !is_contained(relative) {
            return Vec::new();
        }
        self.plugins
            .iter()
            .map(|p| (p.name.clone(), p.root_dir.join(relative)))
            .filter(|(_, dir)| dir.is_dir())
            .collect()
    }
}

/// Directories matching `<base>/*/<suffix>`, sorted. Zero matches is not an error.
pub fn glob_dirs(base: &Path, suffix: &Path) -> Result<Vec<PathBuf>> {
    let mut pattern_path = base.join("*");
    if !suffix.as_os_str().is_empty() {
        pattern_path.push(suffix);
    }
    let pattern = pattern_path.to_string_lossy().to_string();
    let entries = glob::glob(&pattern).map_err(|e| DirectoryError::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    trace!("Glob '{}' matched {} directories", pattern, dirs.len());
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn plugins_fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        for name in ["sfGuardPlugin", "sfAssetsPlugin", "sfEmptyPlugin"] {
            fs::create_dir_all(temp.path().join(name)).unwrap();
        }
        fs::create_dir_all(temp.path().join("sfGuardPlugin/config")).unwrap();
        fs::create_dir_all(temp.path().join("sfAssetsPlugin/config")).unwrap();
        fs::write(temp.path().join("README"), "not a plugin").unwrap();
        temp
    }

    #[test]
    fn test_enable_list_keeps_registration_order() {
        let temp = plugins_fixture();
        let registry =
            PluginRegistry::from_enable_list(temp.path(), &["sfGuardPlugin", "sfAssetsPlugin"])
                .unwrap();

        let names: Vec<&str> = registry.plugins().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sfGuardPlugin", "sfAssetsPlugin"]);
        assert_eq!(registry.plugins()[1].enabled_order, 1);
    }

    #[test]
    fn test_enable_list_missing_plugin() {
        let temp = plugins_fixture();
        let err = PluginRegistry::from_enable_list(temp.path(), &["nopePlugin"]).unwrap_err();
        assert!(matches!(err, DirectoryError::PluginNotFound { .. }));

        let err = PluginRegistry::from_enable_list(temp.path(), &["../escape"]).unwrap_err();
        assert!(matches!(err, DirectoryError::PluginNotFound { .. }));
    }

    #[test]
    fn test_discover_is_sorted_and_skips_files() {
        let temp = plugins_fixture();
        let registry = PluginRegistry::discover(temp.path()).unwrap();
        let names: Vec<&str> = registry.plugins().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sfAssetsPlugin", "sfEmptyPlugin", "sfGuardPlugin"]);
    }

    #[test]
    fn test_discover_missing_plugins_dir() {
        let temp = TempDir::new().unwrap();
        let registry = PluginRegistry::discover(&temp.path().join("plugins")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_config_directories_only_existing() {
        let temp = plugins_fixture();
        let registry = PluginRegistry::from_enable_list(
            temp.path(),
            &["sfEmptyPlugin", "sfGuardPlugin", "sfAssetsPlugin"],
        )
        .unwrap();

        let dirs = registry.config_directories(Path::new("config"));
        let names: Vec<&str> = dirs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["sfGuardPlugin", "sfAssetsPlugin"]);

        assert!(registry
            .config_directories(Path::new("../config"))
            .is_empty());
    }

    #[test]
    fn test_glob_dirs_zero_matches() {
        let temp = plugins_fixture();
        let dirs = glob_dirs(temp.path(), Path::new("modules/blog/config")).unwrap();
        assert!(dirs.is_empty());

        let dirs = glob_dirs(temp.path(), Path::new("config")).unwrap();
        assert_eq!(dirs.len(), 2);
    }
}
