//! Per-action access rules

use super::{CompileContext, ConfigHandler, HandlerKind};
use crate::artifact::Artifact;
use crate::error::Result;
use crate::merge::MergeRules;
use crate::value::{ConfigValue, MergedTree};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const DIRECTIVES: &[&str] = &["is_secure", "credentials"];

/// A single required credential, or a choice between several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credential {
    Name(String),
    AnyOf(Vec<String>),
}

impl Credential {
    fn is_satisfied_by(&self, granted: &[&str]) -> bool {
        match self {
            Self::Name(name) => granted.contains(&name.as_str()),
            Self::AnyOf(names) => names.iter().any(|n| granted.contains(&n.as_str())),
        }
    }
}

/// Access rule for one action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityRule {
    pub is_secure: bool,
    /// Every element must be satisfied.
    pub credentials: Vec<Credential>,
}

impl SecurityRule {
    /// Whether a user holding `granted` may run the action.
    pub fn allows(&self, authenticated: bool, granted: &[&str]) -> bool {
        if !self.is_secure {
            return true;
        }
        authenticated && self.credentials.iter().all(|c| c.is_satisfied_by(granted))
    }
}

/// Compiled security table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityTable {
    pub actions: IndexMap<String, SecurityRule>,
    pub default: SecurityRule,
}

impl SecurityTable {
    /// The rule for `action`, falling back to the default rule.
    pub fn rule_for(&self, action: &str) -> &SecurityRule {
        self.actions.get(action).unwrap_or(&self.default)
    }
}

/// Compiles `security.yml`.
#[derive(Debug, Default)]
pub struct SecurityHandler;

impl SecurityHandler {
    fn rule(&self, tree: &MergedTree, category: &str, ctx: &CompileContext<'_>) -> Result<SecurityRule> {
        let is_secure = tree
            .lookup(category, "is_secure")
            .map(ConfigValue::as_flag)
            .unwrap_or(false);
        let credentials = match tree.lookup(category, "credentials") {
            None | Some(ConfigValue::Null) => Vec::new(),
            Some(value) => parse_credentials(value).ok_or_else(|| {
                ctx.configuration_error(
                    Some(&format!("{category}.credentials")),
                    "credentials must be a name or a list of names and name lists",
                )
            })?,
        };
        Ok(SecurityRule {
            is_secure,
            credentials,
        })
    }
}

fn parse_credentials(value: &ConfigValue) -> Option<Vec<Credential>> {
    match value {
        ConfigValue::Sequence(items) => items.iter().map(parse_credential).collect(),
        scalar => parse_credential(scalar).map(|c| vec![c]),
    }
}

fn parse_credential(value: &ConfigValue) -> Option<Credential> {
    match value {
        ConfigValue::Sequence(names) => names
            .iter()
            .map(|n| n.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Credential::AnyOf),
        ConfigValue::Mapping(_) | ConfigValue::Null => None,
        scalar => scalar.to_scalar_string().map(Credential::Name),
    }
}

impl ConfigHandler for SecurityHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Security
    }

    fn rules(&self) -> MergeRules {
        MergeRules::new()
            .required_categories(&["all"])
            .strict(DIRECTIVES)
    }

    fn compile(&self, tree: &MergedTree, ctx: &CompileContext<'_>) -> Result<Artifact> {
        let mut actions = IndexMap::new();
        for action in tree.specific_categories() {
            actions.insert(action.to_string(), self.rule(tree, action, ctx)?);
        }
        let default = self.rule(tree, "all", ctx)?;

        Ok(Artifact::Security(SecurityTable { actions, default }))
    }
}
