//! Output caching registrations per action

use super::{CompileContext, ConfigHandler, HandlerKind};
use crate::artifact::Artifact;
use crate::error::Result;
use crate::merge::MergeRules;
use crate::value::{ConfigValue, MergedTree};
use serde::{Deserialize, Serialize};

const DIRECTIVES: &[&str] = &["activate", "type", "lifetime", "uri"];

/// Action name used for the registration built from `all`.
pub const DEFAULT_ACTION: &str = "DEFAULT";

const DEFAULT_TYPE: &str = "slot";
const DEFAULT_LIFETIME: i64 = 86400;

/// One cache registration handed to the cache manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRegistration {
    pub module: String,
    pub action: String,
    #[serde(rename = "type")]
    pub cache_type: String,
    /// Seconds.
    pub lifetime: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// An action declared in the file. `registration` is `None` when caching is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheAction {
    pub action: String,
    pub registration: Option<CacheRegistration>,
}

/// Compiled cache table, actions in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheTable {
    pub actions: Vec<CacheAction>,
    pub default: Option<CacheRegistration>,
}

impl CacheTable {
    /// Registration applying to `action`.
    ///
    /// The first declared action with that name decides; a declared but
    /// inactive action yields `None` rather than the default registration.
    pub fn registration_for(&self, action: &str) -> Option<&CacheRegistration> {
        match self.actions.iter().find(|a| a.action == action) {
            Some(declared) => declared.registration.as_ref(),
            None => self.default.as_ref(),
        }
    }

    /// Every active registration, the default last.
    pub fn registrations(&self) -> impl Iterator<Item = &CacheRegistration> {
        self.actions
            .iter()
            .filter_map(|a| a.registration.as_ref())
            .chain(self.default.as_ref())
    }
}

/// Compiles module `cache.yml`.
#[derive(Debug, Default)]
pub struct CacheHandler;

impl CacheHandler {
    fn registration(
        &self,
        tree: &MergedTree,
        category: &str,
        action: &str,
        ctx: &CompileContext<'_>,
    ) -> Result<Option<CacheRegistration>> {
        let active = tree
            .lookup(category, "activate")
            .map(ConfigValue::as_flag)
            .unwrap_or(false);
        if !active {
            return Ok(None);
        }

        let cache_type = tree
            .lookup(category, "type")
            .and_then(ConfigValue::to_scalar_string)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TYPE.to_string());

        let lifetime = match tree.lookup(category, "lifetime") {
            None | Some(ConfigValue::Null) => DEFAULT_LIFETIME,
            Some(value) => value.as_i64().filter(|l| *l >= 0).ok_or_else(|| {
                ctx.configuration_error(
                    Some(&format!("{category}.lifetime")),
                    format!("lifetime must be a non-negative number of seconds, got '{value}'"),
                )
            })?,
        };

        let uri = tree
            .lookup(category, "uri")
            .and_then(ConfigValue::to_scalar_string)
            .filter(|u| !u.is_empty());

        Ok(Some(CacheRegistration {
            module: ctx.logical_path.module().unwrap_or_default().to_string(),
            action: action.to_string(),
            cache_type,
            lifetime,
            uri,
        }))
    }
}

impl ConfigHandler for CacheHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Cache
    }

    fn rules(&self) -> MergeRules {
        MergeRules::new().strict(DIRECTIVES)
    }

    fn compile(&self, tree: &MergedTree, ctx: &CompileContext<'_>) -> Result<Artifact> {
        let mut actions = Vec::new();
        for action in tree.specific_categories() {
            actions.push(CacheAction {
                action: action.to_string(),
                registration: self.registration(tree, action, action, ctx)?,
            });
        }
        let default = self.registration(tree, "all", DEFAULT_ACTION, ctx)?;

        Ok(Artifact::Cache(CacheTable { actions, default }))
    }
}
