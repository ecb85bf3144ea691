//! Project settings loaded with figment
//!
//! Sources in precedence order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. `<project>/cascade.yaml`
//! 3. `CASCADE_` environment variables, `__` separating nested keys
//!    (`CASCADE_DIRECTORIES__CACHE=tmp/cache`)

use crate::context::{ConfigContext, DEFAULT_ENVIRONMENT};
use crate::error::Result;
use crate::handler::{HandlerKind, HandlerRegistry};
use crate::runtime::{RuntimeDescription, StaticRuntime};
use cascade_directory::{DirectoryNames, PluginRegistry, ProjectLayout, PROJECT_MARKER};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Prefix of environment variables overriding project settings.
pub const ENV_PREFIX: &str = "CASCADE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    pub environment: String,
    pub application: Option<String>,
    /// Clear compiled artifacts whenever a cascade is created.
    pub debug: bool,
    pub directories: DirectoryNames,
    /// Enabled plugins in registration order; every plugin directory when unset.
    pub plugins: Option<Vec<String>>,
    /// Extra logical-path patterns, tried before the built-in mappings.
    pub handlers: IndexMap<String, HandlerKind>,
    /// Constants available to `%NAME%` placeholders.
    pub constants: IndexMap<String, String>,
    /// Runtime settings and extensions checked by `config/php.yml`.
    pub runtime: RuntimeDescription,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            application: None,
            debug: false,
            directories: DirectoryNames::default(),
            plugins: None,
            handlers: IndexMap::new(),
            constants: IndexMap::new(),
            runtime: RuntimeDescription::default(),
        }
    }
}

impl ProjectSettings {
    /// Load settings for the project rooted at `project_root`.
    pub fn load(project_root: &Path) -> Result<Self> {
        let settings: Self = Self::figment(project_root).extract()?;
        debug!(
            "Loaded project settings for {} (environment '{}')",
            project_root.display(),
            settings.environment
        );
        Ok(settings)
    }

    /// The layered figment behind [`ProjectSettings::load`].
    pub fn figment(project_root: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(project_root.join(PROJECT_MARKER)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn layout(&self, project_root: &Path) -> ProjectLayout {
        let layout = ProjectLayout::with_names(project_root, &self.directories);
        match &self.application {
            Some(app) => layout.with_application(app),
            None => layout,
        }
    }

    /// Registry of enabled plugins: the configured list, or every plugin directory.
    pub fn plugin_registry(&self, layout: &ProjectLayout) -> Result<PluginRegistry> {
        let registry = match &self.plugins {
            Some(names) => PluginRegistry::from_enable_list(layout.plugins_dir(), names.as_slice())?,
            None => PluginRegistry::discover(layout.plugins_dir())?,
        };
        Ok(registry)
    }

    pub fn handler_registry(&self) -> Result<HandlerRegistry> {
        HandlerRegistry::with_mappings(
            self.handlers
                .iter()
                .map(|(pattern, kind)| (pattern.as_str(), *kind)),
        )
    }

    /// Compilation context for this project.
    pub fn context(&self, project_root: &Path) -> ConfigContext {
        let runtime = StaticRuntime::from_description(&self.runtime)
            .with_source(project_root.join(PROJECT_MARKER).display().to_string());
        ConfigContext::new(self.layout(project_root))
            .with_environment(&self.environment)
            .with_debug(self.debug)
            .with_constants(&self.constants)
            .with_runtime(Arc::new(runtime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let settings = ProjectSettings::load(temp.path()).unwrap();
        assert_eq!(settings, ProjectSettings::default());
    }

    #[test]
    #[serial]
    fn test_file_values() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(PROJECT_MARKER),
            r#"
environment: prod
application: frontend
plugins: [sfGuardPlugin]
directories:
  cache: var/cache
handlers:
  "config/app.yml": settings
constants:
  sf_web_dir: /web
runtime:
  settings:
    display_errors: {value: "0"}
  extensions: [mbstring]
"#,
        )
        .unwrap();

        let settings = ProjectSettings::load(temp.path()).unwrap();
        assert_eq!(settings.environment, "prod");
        assert_eq!(settings.application.as_deref(), Some("frontend"));
        assert_eq!(settings.plugins, Some(vec!["sfGuardPlugin".to_string()]));
        assert_eq!(settings.directories.cache, "var/cache");
        assert_eq!(settings.directories.plugins, "plugins");
        assert_eq!(settings.handlers["config/app.yml"], HandlerKind::Settings);
        assert_eq!(settings.runtime.extensions, vec!["mbstring".to_string()]);

        let layout = settings.layout(temp.path());
        assert_eq!(layout.cache_dir(), temp.path().join("var/cache"));
        assert_eq!(layout.application(), Some("frontend"));

        let ctx = settings.context(temp.path());
        assert_eq!(ctx.environment(), "prod");
        assert_eq!(ctx.constant("SF_WEB_DIR"), Some("/web"));
        assert!(ctx.runtime().has_extension("mbstring"));
    }

    #[test]
    #[serial]
    fn test_environment_variables_override_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(PROJECT_MARKER), "environment: prod\n").unwrap();

        std::env::set_var("CASCADE_ENVIRONMENT", "test");
        std::env::set_var("CASCADE_DIRECTORIES__CACHE", "tmp/cache");
        let settings = ProjectSettings::load(temp.path());
        std::env::remove_var("CASCADE_ENVIRONMENT");
        std::env::remove_var("CASCADE_DIRECTORIES__CACHE");

        let settings = settings.unwrap();
        assert_eq!(settings.environment, "test");
        assert_eq!(settings.directories.cache, "tmp/cache");
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_settings_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(PROJECT_MARKER), "plugins: {not: a list}\n").unwrap();
        let err = ProjectSettings::load(temp.path()).unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::Settings(_)));
    }

    #[test]
    #[serial]
    fn test_plugin_registry_from_settings() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("plugins/b")).unwrap();
        fs::create_dir_all(temp.path().join("plugins/a")).unwrap();

        let mut settings = ProjectSettings::default();
        let layout = settings.layout(temp.path());
        let discovered = settings.plugin_registry(&layout).unwrap();
        let names: Vec<&str> = discovered.plugins().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        settings.plugins = Some(vec!["b".to_string(), "missing".to_string()]);
        assert!(settings.plugin_registry(&layout).is_err());
    }
}
