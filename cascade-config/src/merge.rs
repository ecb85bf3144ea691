//! Loading and deep-merging the files behind a logical path

use crate::artifact::SourceFingerprint;
use crate::error::{ConfigError, Result};
use crate::value::{ConfigValue, Mapping, MergedTree};
use cascade_directory::{load_sources, SearchEntry, SourceFile};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Validation applied while merging one logical path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeRules {
    /// Categories that must appear in at least one file.
    pub required_categories: &'static [&'static str],
    /// When set, the only keys allowed inside a category.
    pub directives: Option<&'static [&'static str]>,
    /// Whether having no file at all is an error.
    pub require_source: bool,
}

impl MergeRules {
    pub const fn new() -> Self {
        Self {
            required_categories: &[],
            directives: None,
            require_source: false,
        }
    }

    pub const fn required_categories(mut self, categories: &'static [&'static str]) -> Self {
        self.required_categories = categories;
        self
    }

    pub const fn strict(mut self, directives: &'static [&'static str]) -> Self {
        self.directives = Some(directives);
        self
    }

    pub const fn require_source(mut self) -> Self {
        self.require_source = true;
        self
    }
}

/// Result of merging every source of a logical path.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub tree: MergedTree,
    /// Files that contributed, lowest precedence first.
    pub sources: Vec<SourceFile>,
    /// Every candidate file watched, captured before the files were read.
    pub fingerprint: SourceFingerprint,
}

impl MergeOutcome {
    pub fn source_paths(&self) -> Vec<&Path> {
        self.sources.iter().map(|s| s.path.as_path()).collect()
    }

    /// Most specific contributing file, used to locate errors.
    pub fn primary_path(&self) -> Option<&Path> {
        self.sources.last().map(|s| s.path.as_path())
    }
}

/// Folds cascade sources into a single tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeMerger {
    rules: MergeRules,
}

impl CascadeMerger {
    pub fn new(rules: MergeRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &MergeRules {
        &self.rules
    }

    /// Merge `file_name` from every entry, in entry order.
    pub fn merge(&self, entries: &[SearchEntry], file_name: &str) -> Result<MergeOutcome> {
        let fingerprint =
            SourceFingerprint::capture(entries.iter().map(|e| e.candidate(file_name)));
        let sources = load_sources(entries, file_name)?;

        if sources.is_empty() && self.rules.require_source {
            return Err(ConfigError::configuration(
                None,
                None,
                format!(
                    "configuration file '{}' not found in any of [{}]",
                    file_name,
                    searched(entries)
                ),
            ));
        }

        let mut tree = MergedTree::new();
        for source in &sources {
            let parsed = parse_source(&source.path, &source.content)?;
            self.check_directives(&source.path, &parsed)?;
            trace!("Merging {} ({})", source.path.display(), source.origin);
            tree.merge(parsed);
        }

        self.check_required(&tree, &sources, entries, file_name)?;

        debug!(
            "Merged {} source(s) for '{}' into {} categories",
            sources.len(),
            file_name,
            tree.root().len()
        );
        Ok(MergeOutcome {
            tree,
            sources,
            fingerprint,
        })
    }

    fn check_directives(&self, path: &Path, parsed: &Mapping) -> Result<()> {
        let Some(directives) = self.rules.directives else {
            return Ok(());
        };

        for (category, value) in parsed {
            let keys = match value {
                ConfigValue::Null => continue,
                ConfigValue::Mapping(keys) => keys,
                _ => {
                    return Err(ConfigError::configuration(
                        Some(path),
                        Some(category),
                        "category must be a mapping of directives",
                    ))
                }
            };
            if let Some(unknown) = keys.keys().find(|k| !directives.contains(&k.as_str())) {
                return Err(ConfigError::configuration(
                    Some(path),
                    Some(&format!("{category}.{unknown}")),
                    format!("unknown directive, expected one of: {}", directives.join(", ")),
                ));
            }
        }
        Ok(())
    }

    fn check_required(
        &self,
        tree: &MergedTree,
        sources: &[SourceFile],
        entries: &[SearchEntry],
        file_name: &str,
    ) -> Result<()> {
        if let Some(missing) = self
            .rules
            .required_categories
            .iter()
            .find(|c| !tree.has_category(c))
        {
            if sources.is_empty() {
                return Err(ConfigError::configuration(
                    None,
                    None,
                    format!(
                        "required category '{}' is missing: no '{}' found in any of [{}]",
                        missing,
                        file_name,
                        searched(entries)
                    ),
                ));
            }
            let files: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();
            return Err(ConfigError::configuration(
                files.last().map(PathBuf::as_path),
                None,
                format!(
                    "required category '{}' is missing from {}",
                    missing,
                    files
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }
        Ok(())
    }
}

fn searched(entries: &[SearchEntry]) -> String {
    entries
        .iter()
        .map(|e| e.directory.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse one file's YAML into a top-level mapping.
///
/// An empty document is an empty mapping.
pub fn parse_source(path: &Path, content: &str) -> Result<Mapping> {
    let value: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(content).map_err(|e| ConfigError::parse(path, e))?;
    match ConfigValue::from_yaml(value).map_err(|e| ConfigError::parse(path, e))? {
        ConfigValue::Mapping(mapping) => Ok(mapping),
        ConfigValue::Null => Ok(Mapping::new()),
        other => Err(ConfigError::parse(
            path,
            format!("top level must be a mapping, found {}", type_name(&other)),
        )),
    }
}

fn type_name(value: &ConfigValue) -> &'static str {
    match value {
        ConfigValue::Null => "null",
        ConfigValue::Bool(_) => "a boolean",
        ConfigValue::Integer(_) | ConfigValue::Float(_) => "a number",
        ConfigValue::String(_) => "a string",
        ConfigValue::Sequence(_) => "a sequence",
        ConfigValue::Mapping(_) => "a mapping",
    }
}

/// An asset-list element: a name, optionally with options.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetEntry {
    pub name: String,
    pub options: Mapping,
}

impl AssetEntry {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Mapping(m) => {
                let (name, options) = m.iter().next()?;
                Some(Self {
                    name: name.clone(),
                    options: options.as_mapping().cloned().unwrap_or_default(),
                })
            }
            other => Some(Self {
                name: other.to_scalar_string()?,
                options: Mapping::new(),
            }),
        }
    }
}

/// Evaluate removal sigils in a concatenated asset list.
///
/// Elements are processed in order: `-*` drops everything accumulated so far,
/// `-name` drops accumulated entries called `name`, anything else is appended.
/// Empty names are ignored.
pub fn resolve_asset_list<'a, I>(values: I) -> Vec<AssetEntry>
where
    I: IntoIterator<Item = &'a ConfigValue>,
{
    let mut resolved: Vec<AssetEntry> = Vec::new();
    for entry in values.into_iter().filter_map(AssetEntry::from_value) {
        match entry.name.strip_prefix('-') {
            Some("*") => resolved.clear(),
            Some(removed) => resolved.retain(|e| e.name != removed),
            None if entry.name.is_empty() => {}
            None => resolved.push(entry),
        }
    }
    resolved
}
