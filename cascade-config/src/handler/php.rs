//! Runtime setting overrides and startup checks

use super::{CompileContext, ConfigHandler, HandlerKind};
use crate::artifact::Artifact;
use crate::error::{ConfigError, Result};
use crate::runtime::RuntimeEnvironment;
use crate::value::{ConfigValue, Mapping, MergedTree};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

const SECTIONS: &[&str] = &["set", "check", "warn", "extensions"];

/// One runtime setting to change at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOverride {
    pub key: String,
    pub value: String,
}

/// A setting the runtime must already have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeCheck {
    pub key: String,
    pub expected: String,
}

/// Compiled overrides and the startup requirements they were compiled against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhpOverrides {
    pub overrides: Vec<RuntimeOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<RuntimeCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// File reported when a requirement fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl PhpOverrides {
    /// Fail with an initialization error unless `runtime` meets every check
    /// and has every required extension.
    pub fn verify(&self, runtime: &dyn RuntimeEnvironment) -> Result<()> {
        for check in &self.checks {
            let actual = runtime.setting(&check.key).map(|s| s.value);
            let matches = actual
                .as_deref()
                .is_some_and(|value| same_setting(value, &check.expected));
            if !matches {
                return Err(ConfigError::initialization(
                    self.source.as_deref(),
                    format!(
                        "runtime setting '{}' must be '{}' but is '{}' ({})",
                        check.key,
                        check.expected,
                        actual.as_deref().unwrap_or("unset"),
                        runtime.describe()
                    ),
                ));
            }
        }

        if let Some(missing) = self.extensions.iter().find(|e| !runtime.has_extension(e)) {
            return Err(ConfigError::initialization(
                self.source.as_deref(),
                format!(
                    "extension '{}' must be loaded ({})",
                    missing,
                    runtime.describe()
                ),
            ));
        }
        Ok(())
    }

    /// Verify the startup requirements, then apply every override to
    /// `runtime`. Returns how many overrides were applied.
    pub fn apply(&self, runtime: &dyn RuntimeEnvironment) -> Result<usize> {
        self.verify(runtime)?;
        for o in &self.overrides {
            runtime
                .set(&o.key, &o.value)
                .map_err(|e| ConfigError::initialization(self.source.as_deref(), e.to_string()))?;
            debug!("Set runtime '{}' to '{}'", o.key, o.value);
        }
        Ok(self.overrides.len())
    }
}

/// Compiles `php.yml`.
#[derive(Debug, Default)]
pub struct PhpHandler;

impl PhpHandler {
    fn section<'t>(
        &self,
        tree: &'t MergedTree,
        name: &str,
        ctx: &CompileContext<'_>,
    ) -> Result<Option<&'t Mapping>> {
        match tree.get(name) {
            None | Some(ConfigValue::Null) => Ok(None),
            Some(ConfigValue::Mapping(m)) => Ok(Some(m)),
            Some(_) => Err(ctx.configuration_error(
                Some(name),
                format!("section '{name}' must be a mapping of setting names to values"),
            )),
        }
    }

    /// Existing runtime setting for `key`, or a configuration error.
    fn known_setting(
        &self,
        runtime: &dyn RuntimeEnvironment,
        section: &str,
        key: &str,
        ctx: &CompileContext<'_>,
    ) -> Result<crate::runtime::RuntimeSetting> {
        runtime.setting(key).ok_or_else(|| {
            ctx.configuration_error(
                Some(&format!("{section}.{key}")),
                format!("'{key}' is not a runtime setting"),
            )
        })
    }
}

impl ConfigHandler for PhpHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Php
    }

    fn compile(&self, tree: &MergedTree, ctx: &CompileContext<'_>) -> Result<Artifact> {
        if let Some(unknown) = tree.categories().find(|c| !SECTIONS.contains(c)) {
            return Err(ctx.configuration_error(
                Some(unknown),
                format!("unknown section, expected one of: {}", SECTIONS.join(", ")),
            ));
        }

        let runtime = ctx.config.runtime();
        let mut overrides = Vec::new();

        if let Some(set) = self.section(tree, "set", ctx)? {
            for (key, value) in set {
                let key = key.to_ascii_lowercase();
                let setting = self.known_setting(runtime, "set", &key, ctx)?;
                if !setting.overridable {
                    return Err(ctx.configuration_error(
                        Some(&format!("set.{key}")),
                        format!("runtime setting '{key}' cannot be overridden"),
                    ));
                }
                overrides.push(RuntimeOverride {
                    key,
                    value: scalar(value, "set", ctx)?,
                });
            }
        }

        let mut checks = Vec::new();
        if let Some(check) = self.section(tree, "check", ctx)? {
            for (key, expected) in check {
                let key = key.to_ascii_lowercase();
                self.known_setting(runtime, "check", &key, ctx)?;
                checks.push(RuntimeCheck {
                    key,
                    expected: scalar(expected, "check", ctx)?,
                });
            }
        }

        if let Some(warn_section) = self.section(tree, "warn", ctx)? {
            for (key, expected) in warn_section {
                let key = key.to_ascii_lowercase();
                let setting = self.known_setting(runtime, "warn", &key, ctx)?;
                let expected = scalar(expected, "warn", ctx)?;
                if !same_setting(&setting.value, &expected) {
                    warn!(
                        "Runtime setting '{}' is better set to '{}' (current value is '{}', {})",
                        key,
                        expected,
                        setting.value,
                        runtime.describe()
                    );
                }
            }
        }

        let mut extensions = Vec::new();
        match tree.get("extensions") {
            None | Some(ConfigValue::Null) => {}
            Some(ConfigValue::Sequence(names)) => {
                for name in names {
                    extensions.push(scalar(name, "extensions", ctx)?);
                }
            }
            Some(_) => {
                return Err(ctx.configuration_error(
                    Some("extensions"),
                    "extensions must be a list of extension names",
                ))
            }
        }

        let compiled = PhpOverrides {
            overrides,
            checks,
            extensions,
            source: ctx.primary_path().map(PathBuf::from),
        };
        compiled.verify(runtime)?;
        Ok(Artifact::Php(compiled))
    }
}

fn scalar(value: &ConfigValue, section: &str, ctx: &CompileContext<'_>) -> Result<String> {
    value.to_scalar_string().ok_or_else(|| {
        ctx.configuration_error(Some(section), format!("expected a scalar value, got '{value}'"))
    })
}

/// Compare setting values the way the runtime reports switches.
fn same_setting(actual: &str, expected: &str) -> bool {
    normalize(actual) == normalize(expected)
}

fn normalize(value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" => "1".to_string(),
        "off" | "no" | "false" | "none" => String::new(),
        other => other.to_string(),
    }
}
