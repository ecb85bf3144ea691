//! The entry point tying resolution, merging, compilation and caching together

use crate::artifact::{Artifact, CompiledArtifact};
use crate::cache::{CacheKey, CacheState, CompiledCache};
use crate::context::ConfigContext;
use crate::error::{ConfigError, Result};
use crate::handler::{CompileContext, ConfigHandler, HandlerKind, HandlerRegistry};
use crate::merge::{CascadeMerger, MergeOutcome};
use crate::settings::ProjectSettings;
use cascade_directory::{LogicalPath, PathResolver, PluginRegistry, SearchEntry};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Logical path of the settings whose values become `%NAME%` constants.
pub const SETTINGS_PATH: &str = "config/settings.yml";

/// Logical path of the runtime overrides applied at startup.
pub const RUNTIME_PATH: &str = "config/php.yml";

/// Loads compiled configuration for one project, environment and application.
///
/// Creating a cascade reads no configuration file. Settings constants are
/// compiled the first time a view needs them.
pub struct ConfigCascade {
    context: ConfigContext,
    plugins: PluginRegistry,
    handlers: HandlerRegistry,
    cache: CompiledCache,
    /// Digest of the context and handler mappings, part of every cache key.
    inputs: String,
}

impl ConfigCascade {
    /// Build a cascade. In debug mode every compiled artifact is discarded first.
    pub fn new(
        context: ConfigContext,
        plugins: PluginRegistry,
        handlers: HandlerRegistry,
    ) -> Result<Self> {
        let cache = CompiledCache::new(context.layout().cache_dir());
        if context.debug() {
            let removed = cache.clear_all()?;
            debug!("Debug mode: discarded {} compiled artifact(s)", removed);
        }

        let inputs = context.inputs_digest(
            handlers
                .mappings()
                .map(|(pattern, kind)| format!("{pattern}={kind}")),
        );
        Ok(Self {
            context,
            plugins,
            handlers,
            cache,
            inputs,
        })
    }

    /// Build a cascade from `<project_root>/cascade.yaml` and the environment.
    pub fn open(project_root: &Path) -> Result<Self> {
        let settings = ProjectSettings::load(project_root)?;
        Self::from_settings(project_root, &settings)
    }

    pub fn from_settings(project_root: &Path, settings: &ProjectSettings) -> Result<Self> {
        let context = settings.context(project_root);
        let plugins = settings.plugin_registry(context.layout())?;
        let handlers = settings.handler_registry()?;
        Self::new(context, plugins, handlers)
    }

    pub fn context(&self) -> &ConfigContext {
        &self.context
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn cache(&self) -> &CompiledCache {
        &self.cache
    }

    /// Resolver over this cascade's layout and plugins.
    pub fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(self.context.layout(), &self.plugins)
    }

    /// Directories that may supply `path`, lowest precedence first.
    pub fn resolve(&self, path: &LogicalPath) -> Vec<SearchEntry> {
        self.resolver().resolve(path)
    }

    pub fn key_for(&self, path: &LogicalPath) -> CacheKey {
        CacheKey::new(
            path.clone(),
            self.context.environment(),
            self.context.application(),
        )
        .with_inputs(&self.inputs)
    }

    /// Merge the sources of `path` with its handler's rules, without compiling.
    pub fn merge(&self, path: &LogicalPath) -> Result<MergeOutcome> {
        let handler = self.handlers.handler_for(path)?;
        self.merge_with(handler, path)
    }

    fn merge_with(&self, handler: &dyn ConfigHandler, path: &LogicalPath) -> Result<MergeOutcome> {
        let entries = self.resolve(path);
        CascadeMerger::new(handler.rules()).merge(&entries, path.file_name())
    }

    /// The compiled artifact for `path`, recompiling only when an input changed.
    pub fn load(&self, path: &LogicalPath) -> Result<Arc<CompiledArtifact>> {
        let handler = self.handlers.handler_for(path)?;
        let key = self.key_for(path);
        self.cache
            .get_or_compile(&key, || self.compile_with(handler, path, CacheUse::ReadWrite))
    }

    /// Compile `path` without consulting or updating the cache.
    pub fn compile(&self, path: &LogicalPath) -> Result<CompiledArtifact> {
        let handler = self.handlers.handler_for(path)?;
        self.compile_with(handler, path, CacheUse::Bypass)
    }

    fn compile_with(
        &self,
        handler: &dyn ConfigHandler,
        path: &LogicalPath,
        cache_use: CacheUse,
    ) -> Result<CompiledArtifact> {
        let outcome = self.merge_with(handler, path)?;
        let sources: Vec<&Path> = outcome.sources.iter().map(|s| s.path.as_path()).collect();

        let resolver = self.resolver();
        let mut fingerprint = outcome.fingerprint;
        fingerprint.include(resolver.watched_files(path));

        let config = if handler.kind() == HandlerKind::View {
            // Asset names depend on settings constants.
            let settings = LogicalPath::parse(SETTINGS_PATH)?;
            fingerprint.include(resolver.watched_files(&settings));
            Cow::Owned(self.settings_context_with(cache_use)?)
        } else {
            Cow::Borrowed(&self.context)
        };

        let ctx = CompileContext::new(path, &config, &sources);
        let body = handler.compile(&outcome.tree, &ctx)?;

        info!(
            "Compiled '{}' with the {} handler from {} source(s)",
            path,
            handler.kind(),
            sources.len()
        );
        Ok(CompiledArtifact::new(path.as_str(), body, fingerprint))
    }

    pub fn state(&self, path: &LogicalPath) -> Result<CacheState> {
        self.cache.state(&self.key_for(path))
    }

    pub fn invalidate(&self, path: &LogicalPath) -> Result<bool> {
        self.cache.invalidate(&self.key_for(path))
    }

    /// Discard every compiled artifact.
    pub fn clear_cache(&self) -> Result<usize> {
        self.cache.clear_all()
    }

    /// Apply the overrides of `config/php.yml` to the context runtime.
    ///
    /// Fails with an initialization error when a startup check fails against
    /// the runtime as it is now, even when the overrides come from the cache.
    pub fn apply_runtime_overrides(&self) -> Result<usize> {
        let path = LogicalPath::parse(RUNTIME_PATH)?;
        let artifact = self.load(&path)?;
        match &artifact.body {
            Artifact::Php(overrides) => overrides.apply(self.context.runtime()),
            other => Err(ConfigError::configuration(
                None,
                None,
                format!("'{}' compiled to a {} artifact", RUNTIME_PATH, other.kind()),
            )),
        }
    }

    /// The context extended with the `%NAME%` constants of the compiled settings.
    pub fn settings_context(&self) -> Result<ConfigContext> {
        self.settings_context_with(CacheUse::ReadWrite)
    }

    fn settings_context_with(&self, cache_use: CacheUse) -> Result<ConfigContext> {
        let mut context = self.context.clone();
        let path = LogicalPath::parse(SETTINGS_PATH)?;
        if self.handlers.kind_for(&path) != Some(HandlerKind::Settings) {
            return Ok(context);
        }

        let artifact = match cache_use {
            CacheUse::ReadWrite => self.load(&path)?,
            CacheUse::Bypass => Arc::new(self.compile(&path)?),
        };
        if let Some(settings) = artifact.body.as_settings() {
            let constants: Vec<(String, String)> = settings
                .constants()
                .map(|(name, value)| (name.to_string(), value))
                .collect();
            debug!("Loaded {} settings constant(s)", constants.len());
            context.extend_constants(constants);
        }
        Ok(context)
    }
}

/// Whether a compilation may read and write the compiled cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheUse {
    ReadWrite,
    Bypass,
}
