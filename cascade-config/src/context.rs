//! Explicit compilation context passed to every handler

use crate::runtime::{RuntimeEnvironment, StaticRuntime};
use cascade_directory::{ProjectLayout, PROJECT_MARKER};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Environment used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Where the project lives and which environment/application is active.
#[derive(Debug, Clone)]
pub struct ConfigContext {
    layout: ProjectLayout,
    environment: String,
    debug: bool,
    constants: IndexMap<String, String>,
    runtime: Arc<dyn RuntimeEnvironment>,
    /// Runtime fingerprint taken when the runtime was installed, before any
    /// override was applied to it.
    runtime_fingerprint: String,
}

impl ConfigContext {
    pub fn new(layout: ProjectLayout) -> Self {
        let runtime = StaticRuntime::new();
        Self {
            layout,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            debug: false,
            constants: IndexMap::new(),
            runtime_fingerprint: runtime.fingerprint(),
            runtime: Arc::new(runtime),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn RuntimeEnvironment>) -> Self {
        self.runtime_fingerprint = runtime.fingerprint();
        self.runtime = runtime;
        self
    }

    /// Add constants available to `%NAME%` placeholders. Names are case-insensitive.
    pub fn with_constants<I, K, V>(mut self, constants: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.extend_constants(constants);
        self
    }

    pub fn extend_constants<I, K, V>(&mut self, constants: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in constants {
            self.constants
                .insert(name.as_ref().to_ascii_lowercase(), value.into());
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn application(&self) -> Option<&str> {
        self.layout.application()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn constant(&self, name: &str) -> Option<&str> {
        self.constants
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn constants(&self) -> &IndexMap<String, String> {
        &self.constants
    }

    pub fn runtime(&self) -> &dyn RuntimeEnvironment {
        self.runtime.as_ref()
    }

    /// SHA-256 over every input other than source files that can change a
    /// compiled artifact: the project settings file, directories, environment,
    /// constants, runtime and `extra` (e.g. handler mappings).
    pub fn inputs_digest<I, S>(&self, extra: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let layout = &self.layout;
        let mut hasher = Sha256::new();
        for dir in [
            layout.project_root().join(PROJECT_MARKER),
            layout.framework_dir().to_path_buf(),
            layout.plugins_dir().to_path_buf(),
            layout.generated_dir().to_path_buf(),
        ] {
            hasher.update(dir.to_string_lossy().as_bytes());
            hasher.update([0]);
        }
        hasher.update(self.environment.as_bytes());
        hasher.update([0]);
        hasher.update(self.application().unwrap_or_default().as_bytes());
        hasher.update([0]);

        let mut constants: Vec<_> = self.constants.iter().collect();
        constants.sort();
        for (name, value) in constants {
            hasher.update(format!("%{name}%={value}").as_bytes());
            hasher.update([0]);
        }

        hasher.update(self.runtime_fingerprint.as_bytes());
        hasher.update([0]);
        for item in extra {
            hasher.update(item.as_ref().as_bytes());
            hasher.update([0]);
        }
        format!("{:x}", hasher.finalize())
    }
}
