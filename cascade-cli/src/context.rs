//! Project discovery and settings shared by every command

use crate::cli::{Cli, OutputFormat};
use crate::error::CliResult;
use anyhow::Context;
use cascade_config::{ConfigCascade, ProjectSettings};
use cascade_directory::{find_project_root_from, LogicalPath, PROJECT_MARKER};
use std::path::PathBuf;

/// Settings for one invocation: project root, project settings with the
/// command-line overrides applied, and the output format.
#[derive(Debug)]
pub struct CliContext {
    pub project_root: PathBuf,
    pub settings: ProjectSettings,
    pub format: OutputFormat,
}

impl CliContext {
    pub fn new(cli: &Cli) -> CliResult<Self> {
        let project_root = match &cli.project {
            Some(root) => root.clone(),
            None => {
                let cwd = std::env::current_dir().context("Failed to read the current directory")?;
                find_project_root_from(&cwd, PROJECT_MARKER).unwrap_or(cwd)
            }
        };
        tracing::debug!("Using project root {}", project_root.display());

        let mut settings = ProjectSettings::load(&project_root)?;
        if let Some(app) = &cli.app {
            settings.application = Some(app.clone());
        }
        if let Some(env) = &cli.env {
            settings.environment = env.clone();
        }

        Ok(Self {
            project_root,
            settings,
            format: cli.format,
        })
    }

    pub fn cascade(&self) -> CliResult<ConfigCascade> {
        Ok(ConfigCascade::from_settings(&self.project_root, &self.settings)?)
    }

    pub fn logical_path(raw: &str) -> CliResult<LogicalPath> {
        Ok(LogicalPath::parse(raw)?)
    }
}
