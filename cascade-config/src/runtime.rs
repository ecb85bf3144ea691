//! The host runtime whose settings the php handler inspects and overrides

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a runtime setting could not be changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("unknown runtime setting '{0}'")]
    UnknownSetting(String),

    #[error("runtime setting '{0}' cannot be overridden")]
    Locked(String),
}

/// One runtime setting as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSetting {
    pub value: String,
    /// Whether the setting may be changed at run time.
    #[serde(default = "default_overridable")]
    pub overridable: bool,
}

fn default_overridable() -> bool {
    true
}

/// Host runtime queried at compile time and mutated when overrides are applied.
pub trait RuntimeEnvironment: Send + Sync + fmt::Debug {
    /// Current setting for `key` (lower-case), if the runtime knows it.
    fn setting(&self, key: &str) -> Option<RuntimeSetting>;

    fn has_extension(&self, name: &str) -> bool;

    /// Change a setting. Returns the previous value.
    fn set(&self, key: &str, value: &str) -> Result<String, RuntimeError>;

    /// Where the runtime's own configuration comes from, for error messages.
    fn describe(&self) -> String {
        "runtime configuration".to_string()
    }

    /// Stable text covering every setting and extension compiled artifacts
    /// may depend on. Two runtimes with the same fingerprint compile alike.
    fn fingerprint(&self) -> String {
        self.describe()
    }
}

/// Runtime description as written in project settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeDescription {
    pub settings: IndexMap<String, RuntimeSetting>,
    pub extensions: Vec<String>,
}

/// A runtime backed by a fixed table of settings.
#[derive(Debug, Default)]
pub struct StaticRuntime {
    settings: DashMap<String, RuntimeSetting>,
    extensions: Vec<String>,
    source: Option<String>,
}

impl StaticRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_description(description: &RuntimeDescription) -> Self {
        let runtime = Self::new();
        for (key, setting) in &description.settings {
            runtime
                .settings
                .insert(key.to_ascii_lowercase(), setting.clone());
        }
        Self {
            extensions: description.extensions.clone(),
            ..runtime
        }
    }

    pub fn with_setting(self, key: &str, value: &str, overridable: bool) -> Self {
        self.settings.insert(
            key.to_ascii_lowercase(),
            RuntimeSetting {
                value: value.to_string(),
                overridable,
            },
        );
        self
    }

    pub fn with_extension(mut self, name: &str) -> Self {
        self.extensions.push(name.to_string());
        self
    }

    /// Name the origin of the description (e.g. the settings file).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.settings.get(key).map(|s| s.value.clone())
    }
}

impl RuntimeEnvironment for StaticRuntime {
    fn setting(&self, key: &str) -> Option<RuntimeSetting> {
        self.settings.get(key).map(|s| s.clone())
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(name))
    }

    fn set(&self, key: &str, value: &str) -> Result<String, RuntimeError> {
        let mut entry = self
            .settings
            .get_mut(key)
            .ok_or_else(|| RuntimeError::UnknownSetting(key.to_string()))?;
        if !entry.overridable {
            return Err(RuntimeError::Locked(key.to_string()));
        }
        Ok(std::mem::replace(&mut entry.value, value.to_string()))
    }

    fn describe(&self) -> String {
        match &self.source {
            Some(source) => format!("runtime settings from {source}"),
            None => "built-in runtime settings".to_string(),
        }
    }

    fn fingerprint(&self) -> String {
        let mut settings: Vec<String> = self
            .settings
            .iter()
            .map(|entry| {
                let lock = if entry.overridable { "" } else { "!" };
                format!("{}{}={}", lock, entry.key(), entry.value)
            })
            .collect();
        settings.sort();

        let mut extensions: Vec<String> =
            self.extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        extensions.sort();

        format!(
            "{}\n{}\n{}",
            self.describe(),
            settings.join("\n"),
            extensions.join(",")
        )
    }
}
