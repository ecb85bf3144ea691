use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "cascade")]
#[command(version)]
#[command(about = "Inspect, compile and cache cascading YAML configuration")]
#[command(long_about = "
cascade resolves logical configuration paths such as
modules/blog/config/view.yml against the framework, plugin, project,
application and module layers of a project, merges every file found,
and compiles the result into a cached artifact.

Global arguments can be used with any command:
  --project     Project root (default: nearest directory holding cascade.yaml)
  --app         Active application
  --env         Active environment
  --format      Output format (table, json, yaml)
  --verbose     Trace every searched directory
  --debug       Debug logging
  --quiet       Suppress all output except errors

Example usage:
  cascade resolve modules/blog/config/view.yml
  cascade --app frontend --env prod compile config/settings.yml
  cascade lookup template blog indexSuccess.php
  cascade cache status modules/blog/config/cache.yml
  cascade cache clear
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Active application
    #[arg(short, long, global = true)]
    pub app: Option<String>,

    /// Active environment
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the directories that supply a logical path, lowest precedence first
    Resolve {
        /// Logical path, e.g. modules/blog/config/view.yml
        path: String,
    },
    /// Compile a logical path, reusing the cached artifact when still fresh
    Compile {
        /// Logical path, e.g. config/settings.yml
        path: String,

        /// Recompile without reading or writing the cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Find a template, helper or generator file; the first directory holding it wins
    Lookup {
        #[command(subcommand)]
        chain: LookupCommands,
    },
    /// Apply config/php.yml to the configured runtime, running startup checks
    Check,
    /// Inspect or clear compiled artifacts
    Cache {
        #[command(subcommand)]
        subcommand: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum LookupCommands {
    /// Template directories of a module
    Template {
        module: String,
        /// File to find; lists the directories when omitted
        file: Option<String>,
    },
    /// Helper directories, including a module's own helpers
    Helper {
        #[arg(long)]
        module: Option<String>,
        file: Option<String>,
    },
    /// Template directories of a generator theme
    GeneratorTemplate {
        class: String,
        theme: String,
        file: Option<String>,
    },
    /// Skeleton directories of a generator theme
    GeneratorSkeleton {
        class: String,
        theme: String,
        file: Option<String>,
    },
}

impl LookupCommands {
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Template { file, .. }
            | Self::Helper { file, .. }
            | Self::GeneratorTemplate { file, .. }
            | Self::GeneratorSkeleton { file, .. } => file.as_deref(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show whether the artifact for a logical path is fresh, stale or uncompiled
    Status {
        path: String,
    },
    /// Remove the artifact for one logical path
    Invalidate {
        path: String,
    },
    /// Remove every compiled artifact
    Clear,
}
