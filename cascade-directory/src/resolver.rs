//! Search-path resolution for logical configuration paths.
//!
//! # Precedence
//!
//! Directories are returned lowest precedence first; later entries override
//! earlier ones when their files are merged:
//!
//! 1. Framework global default (`<framework>/config`)
//! 2. Framework core module (`<framework>/modules/<m>/config`, module-scoped paths only)
//! 3. Plugins, in registration order (`<plugin>/config`)
//! 4. Project root (`<project>/config`)
//! 5. Application root (`<app>/config`)
//! 6. Plugin module overrides (`<plugin>/modules/<m>/config`, module-scoped only)
//! 7. Module-local overrides (`<app>/modules/<m>/config`)
//! 8. Generated overrides (`<generated>/<logical dir>`)

use crate::layout::ProjectLayout;
use crate::logical_path::LogicalPath;
use crate::plugin::PluginDirectories;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// The precedence layer a search directory belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "layer", content = "plugin", rename_all = "snake_case")]
pub enum SearchOrigin {
    Framework,
    CoreModule,
    Plugin(String),
    Project,
    Application,
    PluginModule(String),
    Module,
    Generated,
}

impl SearchOrigin {
    /// Shipped defaults that user-owned layers are expected to override.
    pub fn is_overridable(&self) -> bool {
        matches!(
            self,
            Self::Framework | Self::CoreModule | Self::Plugin(_) | Self::PluginModule(_)
        )
    }
}

impl fmt::Display for SearchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framework => write!(f, "framework"),
            Self::CoreModule => write!(f, "core module"),
            Self::Plugin(name) => write!(f, "plugin {name}"),
            Self::Project => write!(f, "project"),
            Self::Application => write!(f, "application"),
            Self::PluginModule(name) => write!(f, "plugin module {name}"),
            Self::Module => write!(f, "module"),
            Self::Generated => write!(f, "generated"),
        }
    }
}

/// One directory in the cascade for a logical path.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchEntry {
    /// Directory that may contain the logical path's file.
    pub directory: PathBuf,
    /// Layer the directory came from.
    pub origin: SearchOrigin,
    /// Whether later entries are expected to override this one.
    pub is_overridable: bool,
}

impl SearchEntry {
    pub fn new(directory: PathBuf, origin: SearchOrigin) -> Self {
        let is_overridable = origin.is_overridable();
        Self {
            directory,
            origin,
            is_overridable,
        }
    }

    /// The path `file_name` would have inside this entry's directory.
    pub fn candidate(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }
}

/// Computes the ordered search directories for logical paths.
pub struct PathResolver<'a> {
    layout: &'a ProjectLayout,
    plugins: &'a dyn PluginDirectories,
}

impl<'a> PathResolver<'a> {
    pub fn new(layout: &'a ProjectLayout, plugins: &'a dyn PluginDirectories) -> Self {
        Self { layout, plugins }
    }

    pub fn layout(&self) -> &'a ProjectLayout {
        self.layout
    }

    pub fn plugins(&self) -> &'a dyn PluginDirectories {
        self.plugins
    }

    /// Existing directories that may supply `path`, lowest precedence first.
    ///
    /// Missing directories are skipped; an empty result means no configuration.
    pub fn resolve(&self, path: &LogicalPath) -> Vec<SearchEntry> {
        let entries = dedup_existing(self.layers(path));
        debug!(
            "Resolved {} search directories for '{}'",
            entries.len(),
            path
        );
        for entry in &entries {
            trace!("  {} ({})", entry.directory.display(), entry.origin);
        }
        entries
    }

    /// Candidate file paths for `path` in every resolved directory, in order.
    pub fn candidates(&self, path: &LogicalPath) -> Vec<PathBuf> {
        self.resolve(path)
            .iter()
            .map(|entry| entry.candidate(path.file_name()))
            .collect()
    }

    /// Every file path that could supply `path`, whether or not it exists.
    ///
    /// A cached artifact depends on all of these: creating any of them may
    /// change the merge result.
    pub fn watched_files(&self, path: &LogicalPath) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.layers(path)
            .into_iter()
            .map(|entry| entry.candidate(path.file_name()))
            .filter(|candidate| seen.insert(candidate.clone()))
            .collect()
    }

    /// All layer directories for `path`, existing or not.
    fn layers(&self, path: &LogicalPath) -> Vec<SearchEntry> {
        let global_dir = path.global_directory();
        let local_dir = path.directory();
        let module_scoped = path.is_module_scoped();
        let app_dir = self.layout.app_dir();

        let mut candidates: Vec<SearchEntry> = Vec::new();

        candidates.push(SearchEntry::new(
            self.layout.framework_dir().join(&global_dir),
            SearchOrigin::Framework,
        ));
        if module_scoped {
            candidates.push(SearchEntry::new(
                self.layout.framework_dir().join(&local_dir),
                SearchOrigin::CoreModule,
            ));
        }

        for (name, dir) in self.plugins.config_directories(&global_dir) {
            candidates.push(SearchEntry::new(dir, SearchOrigin::Plugin(name)));
        }

        candidates.push(SearchEntry::new(
            self.layout.project_root().join(&global_dir),
            SearchOrigin::Project,
        ));

        if let Some(app_dir) = &app_dir {
            candidates.push(SearchEntry::new(
                app_dir.join(&global_dir),
                SearchOrigin::Application,
            ));
        }

        if module_scoped {
            for (name, dir) in self.plugins.config_directories(&local_dir) {
                candidates.push(SearchEntry::new(dir, SearchOrigin::PluginModule(name)));
            }
            if let Some(app_dir) = &app_dir {
                candidates.push(SearchEntry::new(
                    app_dir.join(&local_dir),
                    SearchOrigin::Module,
                ));
            }
        }

        candidates.push(SearchEntry::new(
            self.layout.generated_dir().join(&local_dir),
            SearchOrigin::Generated,
        ));

        candidates
    }
}

/// Keep existing directories only, first occurrence wins.
fn dedup_existing(candidates: Vec<SearchEntry>) -> Vec<SearchEntry> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    candidates
        .into_iter()
        .filter(|entry| entry.directory.is_dir())
        .filter(|entry| seen.insert(normalize(&entry.directory)))
        .collect()
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRegistry;
    use std::fs;
    use tempfile::TempDir;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
    }

    #[test]
    fn test_full_precedence_chain_for_module_path() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        mkdirs(
            root,
            &[
                "lib/framework/data/config",
                "lib/framework/data/modules/blog/config",
                "plugins/alphaPlugin/config",
                "plugins/alphaPlugin/modules/blog/config",
                "plugins/betaPlugin/config",
                "config",
                "apps/frontend/config",
                "apps/frontend/modules/blog/config",
                "cache/generated/modules/blog/config",
            ],
        );

        let layout = ProjectLayout::new(root).with_application("frontend");
        let plugins =
            PluginRegistry::from_enable_list(layout.plugins_dir(), &["betaPlugin", "alphaPlugin"])
                .unwrap();
        let resolver = PathResolver::new(&layout, &plugins);

        let path = LogicalPath::parse("modules/blog/config/view.yml").unwrap();
        let origins: Vec<SearchOrigin> = resolver
            .resolve(&path)
            .into_iter()
            .map(|e| e.origin)
            .collect();

        assert_eq!(
            origins,
            vec![
                SearchOrigin::Framework,
                SearchOrigin::CoreModule,
                SearchOrigin::Plugin("betaPlugin".to_string()),
                SearchOrigin::Plugin("alphaPlugin".to_string()),
                SearchOrigin::Project,
                SearchOrigin::Application,
                SearchOrigin::PluginModule("alphaPlugin".to_string()),
                SearchOrigin::Module,
                SearchOrigin::Generated,
            ]
        );
    }

    #[test]
    fn test_global_path_skips_module_layers() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        mkdirs(
            root,
            &["lib/framework/data/config", "config", "apps/frontend/config"],
        );

        let layout = ProjectLayout::new(root).with_application("frontend");
        let plugins = PluginRegistry::new();
        let resolver = PathResolver::new(&layout, &plugins);

        let path = LogicalPath::parse("config/settings.yml").unwrap();
        let entries = resolver.resolve(&path);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].origin, SearchOrigin::Framework);
        assert!(entries[0].is_overridable);
        assert_eq!(entries[2].origin, SearchOrigin::Application);
        assert!(!entries[2].is_overridable);
    }

    #[test]
    fn test_no_directories_yields_empty() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp.path());
        let plugins = PluginRegistry::new();
        let resolver = PathResolver::new(&layout, &plugins);

        let path = LogicalPath::parse("modules/blog/config/cache.yml").unwrap();
        assert!(resolver.resolve(&path).is_empty());
        assert!(resolver.candidates(&path).is_empty());
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        mkdirs(root, &["config"]);

        // Framework data dir pointed at the project root: both rules reach `<root>/config`
        let layout = ProjectLayout::new(root).with_framework_dir(root);
        let plugins = PluginRegistry::new();
        let resolver = PathResolver::new(&layout, &plugins);

        let path = LogicalPath::parse("config/app.yml").unwrap();
        let entries = resolver.resolve(&path);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].origin, SearchOrigin::Framework);
    }

    #[test]
    fn test_candidates_join_file_name() {
        let temp = TempDir::new().unwrap();
        mkdirs(temp.path(), &["config"]);
        let layout = ProjectLayout::new(temp.path());
        let plugins = PluginRegistry::new();
        let resolver = PathResolver::new(&layout, &plugins);

        let path = LogicalPath::parse("config/app.yml").unwrap();
        assert_eq!(
            resolver.candidates(&path),
            vec![temp.path().join("config/app.yml")]
        );
    }

    #[test]
    fn test_watched_files_include_missing_layers() {
        let temp = TempDir::new().unwrap();
        mkdirs(temp.path(), &["config"]);
        let layout = ProjectLayout::new(temp.path()).with_application("frontend");
        let plugins = PluginRegistry::new();
        let resolver = PathResolver::new(&layout, &plugins);

        let path = LogicalPath::parse("modules/blog/config/cache.yml").unwrap();
        let watched = resolver.watched_files(&path);

        assert!(watched.contains(&temp.path().join("config/cache.yml")));
        assert!(watched.contains(
            &temp
                .path()
                .join("apps/frontend/modules/blog/config/cache.yml")
        ));
        assert_eq!(
            watched.last().unwrap(),
            &temp.path().join("cache/generated/modules/blog/config/cache.yml")
        );
        assert_eq!(resolver.candidates(&path).len(), 1);
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(SearchOrigin::Framework.to_string(), "framework");
        assert_eq!(
            SearchOrigin::Plugin("x".to_string()).to_string(),
            "plugin x"
        );
    }
}
