//! Shared fixture for cascade integration tests

#![allow(dead_code)] // Not every test file uses every helper

use cascade_config::{ConfigCascade, ConfigContext, HandlerRegistry, Result};
use cascade_directory::{PluginRegistry, ProjectLayout};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project tree with the default directory names.
pub struct ProjectFixture {
    temp: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write `content` at `rel` under the project root, creating directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Rewrite a file and move its modification time forward.
    pub fn touch_write(&self, rel: &str, content: &str, unix_time: i64) -> PathBuf {
        let path = self.write(rel, content);
        set_file_mtime(&path, FileTime::from_unix_time(unix_time, 0)).unwrap();
        path
    }

    pub fn set_mtime(&self, rel: &str, unix_time: i64) {
        set_file_mtime(self.root().join(rel), FileTime::from_unix_time(unix_time, 0)).unwrap();
    }

    pub fn layout(&self, app: &str) -> ProjectLayout {
        ProjectLayout::new(self.root()).with_application(app)
    }

    pub fn context(&self, app: &str, env: &str) -> ConfigContext {
        ConfigContext::new(self.layout(app)).with_environment(env)
    }

    /// Cascade for `app`/`env` with every plugin directory enabled.
    pub fn cascade(&self, app: &str, env: &str) -> Result<ConfigCascade> {
        self.cascade_with(self.context(app, env))
    }

    pub fn cascade_with(&self, context: ConfigContext) -> Result<ConfigCascade> {
        let plugins = PluginRegistry::discover(context.layout().plugins_dir())?;
        ConfigCascade::new(context, plugins, HandlerRegistry::new())
    }
}
