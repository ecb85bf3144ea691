//! Flat settings for the current environment
//!
//! `all` is merged with the category named after the environment, then every
//! nested key is flattened to `<prefix><section>_<key>`. Sections whose name
//! starts with a dot only group keys and do not appear in the flattened name.

use super::{CompileContext, ConfigHandler, HandlerKind};
use crate::artifact::Artifact;
use crate::error::Result;
use crate::value::{ConfigValue, Mapping, MergedTree};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of names produced from `config/<stem>.yml`.
pub fn prefix_for(file_name: &str) -> String {
    match file_name.trim_end_matches(".yml") {
        "settings" => "sf_".to_string(),
        stem => format!("{}_", stem.to_ascii_lowercase()),
    }
}

/// Compiled settings, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SettingsTable {
    pub values: IndexMap<String, ConfigValue>,
}

impl SettingsTable {
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(&name.to_ascii_lowercase())
    }

    /// Scalar settings rendered as text, for `%NAME%` placeholders.
    pub fn constants(&self) -> impl Iterator<Item = (&str, String)> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.to_scalar_string().map(|s| (k.as_str(), s)))
    }
}

/// Compiles `config/settings.yml` and `config/app.yml`.
#[derive(Debug, Default)]
pub struct SettingsHandler;

impl ConfigHandler for SettingsHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Settings
    }

    fn compile(&self, tree: &MergedTree, ctx: &CompileContext<'_>) -> Result<Artifact> {
        let environment = ctx.config.environment();
        let mut merged = ConfigValue::Mapping(Mapping::new());
        for category in ["all", environment] {
            match tree.get(category) {
                None | Some(ConfigValue::Null) => {}
                Some(ConfigValue::Mapping(m)) => merged.deep_merge(ConfigValue::Mapping(m.clone())),
                Some(_) => {
                    return Err(ctx.configuration_error(
                        Some(category),
                        "category must be a mapping of settings",
                    ))
                }
            }
        }

        let prefix = prefix_for(ctx.logical_path.file_name());
        let mut values = IndexMap::new();
        if let ConfigValue::Mapping(root) = merged {
            for (key, value) in root {
                flatten(&prefix, &key, value, &mut values);
            }
        }

        Ok(Artifact::Settings(SettingsTable { values }))
    }
}

fn flatten(prefix: &str, key: &str, value: ConfigValue, out: &mut IndexMap<String, ConfigValue>) {
    match value {
        ConfigValue::Mapping(section) => {
            let section_prefix = match key.strip_prefix('.') {
                Some(_) => prefix.to_string(),
                None => format!("{prefix}{key}_"),
            };
            for (child, value) in section {
                out.insert(
                    format!("{section_prefix}{child}").to_ascii_lowercase(),
                    value,
                );
            }
        }
        scalar => {
            out.insert(format!("{prefix}{key}").to_ascii_lowercase(), scalar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ConfigContext;
    use crate::merge::parse_source;
    use cascade_directory::{LogicalPath, ProjectLayout};
    use std::path::Path;

    fn compile(logical: &str, env: &str, src: &str) -> Result<SettingsTable> {
        let tree = MergedTree::from(parse_source(Path::new("settings.yml"), src).unwrap());
        let path = LogicalPath::parse(logical).unwrap();
        let config = ConfigContext::new(ProjectLayout::new("/p")).with_environment(env);
        let sources = [Path::new("/p/config/settings.yml")];
        let ctx = CompileContext::new(&path, &config, &sources);
        let artifact = SettingsHandler.compile(&tree, &ctx)?;
        Ok(artifact.as_settings().unwrap().clone())
    }

    const SRC: &str = r#"
all:
  .settings:
    charset: utf-8
    web_dir: /web
  mailer:
    host: localhost
prod:
  .settings:
    web_dir: /var/www
dev:
  mailer:
    host: mailcatcher
"#;

    #[test]
    fn test_environment_overrides_all() {
        let prod = compile("config/settings.yml", "prod", SRC).unwrap();
        assert_eq!(prod.get("sf_web_dir"), Some(&ConfigValue::from("/var/www")));
        assert_eq!(prod.get("SF_CHARSET"), Some(&ConfigValue::from("utf-8")));
        assert_eq!(prod.get("sf_mailer_host"), Some(&ConfigValue::from("localhost")));

        let dev = compile("config/settings.yml", "dev", SRC).unwrap();
        assert_eq!(dev.get("sf_web_dir"), Some(&ConfigValue::from("/web")));
        assert_eq!(dev.get("sf_mailer_host"), Some(&ConfigValue::from("mailcatcher")));
    }

    #[test]
    fn test_app_prefix_and_constants() {
        let table = compile(
            "config/app.yml",
            "dev",
            "all:\n  upload:\n    max: 10\n  tags: [a, b]\n",
        )
        .unwrap();
        let constants: Vec<(&str, String)> = table.constants().collect();
        assert_eq!(constants, vec![("app_upload_max", "10".to_string())]);
        assert!(table.get("app_tags").is_some());
    }

    #[test]
    fn test_prefix_for() {
        assert_eq!(prefix_for("settings.yml"), "sf_");
        assert_eq!(prefix_for("app.yml"), "app_");
    }
}
