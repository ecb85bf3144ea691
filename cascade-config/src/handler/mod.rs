//! Handlers that compile a merged tree into a typed artifact
//!
//! Each logical path is mapped to one [`HandlerKind`] by glob pattern. The
//! default mappings cover the framework's own files; project settings may add
//! more, and their patterns are tried first.

pub mod cache;
pub mod php;
pub mod security;
pub mod settings;
pub mod view;

use crate::artifact::Artifact;
use crate::context::ConfigContext;
use crate::error::{ConfigError, Result};
use crate::merge::MergeRules;
use crate::value::MergedTree;
use cascade_directory::LogicalPath;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::trace;

/// The closed set of configuration handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Security,
    View,
    Cache,
    Php,
    Settings,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 5] = [
        HandlerKind::Security,
        HandlerKind::View,
        HandlerKind::Cache,
        HandlerKind::Php,
        HandlerKind::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::View => "view",
            Self::Cache => "cache",
            Self::Php => "php",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default logical-path patterns, in match order.
pub const DEFAULT_MAPPINGS: &[(&str, HandlerKind)] = &[
    ("config/php.yml", HandlerKind::Php),
    ("config/settings.yml", HandlerKind::Settings),
    ("config/app.yml", HandlerKind::Settings),
    ("config/security.yml", HandlerKind::Security),
    ("modules/*/config/security.yml", HandlerKind::Security),
    ("modules/*/config/view.yml", HandlerKind::View),
    ("modules/*/config/cache.yml", HandlerKind::Cache),
];

/// Everything a handler may read while compiling.
pub struct CompileContext<'a> {
    pub logical_path: &'a LogicalPath,
    pub config: &'a ConfigContext,
    /// Files that were merged, lowest precedence first.
    pub sources: &'a [&'a Path],
}

impl<'a> CompileContext<'a> {
    pub fn new(
        logical_path: &'a LogicalPath,
        config: &'a ConfigContext,
        sources: &'a [&'a Path],
    ) -> Self {
        Self {
            logical_path,
            config,
            sources,
        }
    }

    /// Most specific merged file, for error messages.
    pub fn primary_path(&self) -> Option<&'a Path> {
        self.sources.last().copied()
    }

    pub fn configuration_error(&self, key: Option<&str>, message: impl Into<String>) -> ConfigError {
        ConfigError::configuration(self.primary_path(), key, message)
    }
}

/// Compiles the merged tree of one logical path.
pub trait ConfigHandler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    /// Validation applied while merging this handler's sources.
    fn rules(&self) -> MergeRules {
        MergeRules::new()
    }

    fn compile(&self, tree: &MergedTree, ctx: &CompileContext<'_>) -> Result<Artifact>;
}

/// Maps logical paths to handlers.
pub struct HandlerRegistry {
    handlers: HashMap<HandlerKind, Box<dyn ConfigHandler>>,
    mappings: Vec<(Pattern, HandlerKind)>,
}

impl HandlerRegistry {
    /// Registry with every built-in handler and the default mappings.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            mappings: Vec::new(),
        };
        registry.register(Box::new(security::SecurityHandler));
        registry.register(Box::new(view::ViewHandler));
        registry.register(Box::new(cache::CacheHandler));
        registry.register(Box::new(php::PhpHandler));
        registry.register(Box::new(settings::SettingsHandler));

        for (pattern, kind) in DEFAULT_MAPPINGS {
            if let Ok(pattern) = Pattern::new(pattern) {
                registry.mappings.push((pattern, *kind));
            }
        }
        registry
    }

    /// Registry with extra mappings that take precedence over the defaults.
    pub fn with_mappings<'p, I>(mappings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'p str, HandlerKind)>,
    {
        let mut registry = Self::new();
        let mut extra = Vec::new();
        for (pattern, kind) in mappings {
            let compiled = Pattern::new(pattern).map_err(|e| {
                ConfigError::configuration(
                    None,
                    Some(pattern),
                    format!("invalid handler pattern: {e}"),
                )
            })?;
            extra.push((compiled, kind));
        }
        extra.append(&mut registry.mappings);
        registry.mappings = extra;
        Ok(registry)
    }

    /// Path patterns and their handler kinds, in match order.
    pub fn mappings(&self) -> impl Iterator<Item = (&str, HandlerKind)> + '_ {
        self.mappings
            .iter()
            .map(|(pattern, kind)| (pattern.as_str(), *kind))
    }

    /// Replace the handler for its kind.
    pub fn register(&mut self, handler: Box<dyn ConfigHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn kind_for(&self, path: &LogicalPath) -> Option<HandlerKind> {
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        let kind = self
            .mappings
            .iter()
            .find(|(pattern, _)| pattern.matches_with(path.as_str(), options))
            .map(|(_, kind)| *kind);
        trace!("Handler for '{}': {:?}", path, kind);
        kind
    }

    pub fn get(&self, kind: HandlerKind) -> Option<&dyn ConfigHandler> {
        self.handlers.get(&kind).map(Box::as_ref)
    }

    /// The handler responsible for `path`.
    pub fn handler_for(&self, path: &LogicalPath) -> Result<&dyn ConfigHandler> {
        self.kind_for(path)
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| {
                ConfigError::configuration(
                    None,
                    None,
                    format!("no configuration handler is registered for '{path}'"),
                )
            })
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
