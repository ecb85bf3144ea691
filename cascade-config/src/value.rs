//! Configuration value tree and deep-merge semantics
//!
//! Every parsed configuration file becomes a [`Mapping`] of string keys to
//! [`ConfigValue`]s. Files are folded into a [`MergedTree`] in cascade order:
//!
//! - scalar keys present on both sides take the later value
//! - keys present on one side only are kept
//! - mappings present on both sides are merged recursively
//! - sequences present on both sides are concatenated (earlier elements first)
//! - an empty (`null`) value never erases a mapping or sequence declared earlier

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Insertion-ordered mapping with string keys.
pub type Mapping = IndexMap<String, ConfigValue>;

/// A node of a configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ConfigValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigValue>),
    Mapping(Mapping),
}

impl ConfigValue {
    /// Convert a parsed YAML document into a configuration value.
    ///
    /// Mapping keys must be scalars; they are converted to strings.
    pub fn from_yaml(value: serde_yaml_ng::Value) -> Result<Self, String> {
        use serde_yaml_ng::Value;

        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::String(s),
            Value::Sequence(seq) => Self::Sequence(
                seq.into_iter()
                    .map(Self::from_yaml)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    let key = match key {
                        Value::String(s) => s,
                        Value::Bool(b) => b.to_string(),
                        Value::Number(n) => n.to_string(),
                        Value::Null => "~".to_string(),
                        other => return Err(format!("unsupported mapping key {other:?}")),
                    };
                    out.insert(key, Self::from_yaml(value)?);
                }
                Self::Mapping(out)
            }
            Value::Tagged(tagged) => Self::from_yaml(tagged.value)?,
        })
    }

    /// Deep-merge `other` into `self` (`other` has higher precedence).
    pub fn deep_merge(&mut self, other: ConfigValue) {
        match (self, other) {
            (Self::Mapping(base), Self::Mapping(overlay)) => merge_mappings(base, overlay),
            (Self::Sequence(base), Self::Sequence(overlay)) => base.extend(overlay),
            (Self::Mapping(_) | Self::Sequence(_), Self::Null) => {}
            (slot, other) => *slot = other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Interpret the value as a switch, accepting the usual YAML spellings.
    ///
    /// `on`/`yes`/`true`/non-zero numbers are true; `off`/`no`/`false`/`0`,
    /// empty strings, null and empty collections are false.
    pub fn as_flag(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "" | "0" | "off" | "no" | "false"
            ),
            Self::Sequence(s) => !s.is_empty(),
            Self::Mapping(m) => !m.is_empty(),
        }
    }

    /// Scalar rendering used when a value is compared or emitted as text.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(true) => Some("1".to_string()),
            Self::Bool(false) => Some(String::new()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Sequence(_) | Self::Mapping(_) => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_scalar_string() {
            Some(s) => f.write_str(&s),
            None => match serde_yaml_ng::to_string(self) {
                Ok(yaml) => f.write_str(yaml.trim_end()),
                Err(_) => write!(f, "{self:?}"),
            },
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<Mapping> for ConfigValue {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(s: Vec<ConfigValue>) -> Self {
        Self::Sequence(s)
    }
}

fn merge_mappings(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => existing.deep_merge(value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

/// Categories that hold defaults for every other category, lowest last.
pub const FALLBACK_CATEGORIES: [&str; 2] = ["all", "default"];

/// The merged configuration for one logical path.
///
/// Top-level keys are categories (`all`, `default`, action/view names,
/// environment names, or handler sections such as `set`/`check`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedTree {
    root: Mapping,
}

impl MergedTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a parsed file on top of the tree.
    pub fn merge(&mut self, overlay: Mapping) {
        merge_mappings(&mut self.root, overlay);
    }

    /// Merge two trees, `overlay` taking precedence.
    pub fn merged(mut self, overlay: MergedTree) -> Self {
        self.merge(overlay.root);
        self
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn into_root(self) -> Mapping {
        self.root
    }

    pub fn get(&self, category: &str) -> Option<&ConfigValue> {
        self.root.get(category)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.root.contains_key(category)
    }

    /// The category's mapping, if the category is a mapping.
    pub fn category(&self, category: &str) -> Option<&Mapping> {
        self.root.get(category).and_then(ConfigValue::as_mapping)
    }

    /// Category names in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Category names other than `all` and `default`, in declaration order.
    pub fn specific_categories(&self) -> impl Iterator<Item = &str> {
        self.categories()
            .filter(|c| !FALLBACK_CATEGORIES.contains(c))
    }

    /// Resolve `key` for `category`, falling back to `all` then `default`.
    pub fn lookup(&self, category: &str, key: &str) -> Option<&ConfigValue> {
        std::iter::once(category)
            .chain(FALLBACK_CATEGORIES)
            .filter_map(|c| self.category(c))
            .find_map(|m| m.get(key))
    }

    /// Merge `key` across `default`, `all` and `category` (category wins).
    pub fn merged_value(&self, category: &str, key: &str) -> Option<ConfigValue> {
        let mut order = vec!["default", "all"];
        if !FALLBACK_CATEGORIES.contains(&category) {
            order.push(category);
        }

        let mut layers = order
            .into_iter()
            .filter_map(|c| self.category(c).and_then(|m| m.get(key)).cloned());

        let mut merged = layers.next()?;
        for layer in layers {
            merged.deep_merge(layer);
        }
        Some(merged)
    }
}

impl From<Mapping> for MergedTree {
    fn from(root: Mapping) -> Self {
        Self { root }
    }
}
