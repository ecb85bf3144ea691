//! View configuration: templates, layouts, head elements and assets
//!
//! Compilation makes two passes over the view categories. The first maps
//! `<action><view>` to a template name; the second maps `<template><view>` to
//! everything rendered around that template. Both passes fall back to `all`,
//! which itself inherits from `default`.
//!
//! Stylesheet and javascript lists are the concatenation of the `default`,
//! `all` and view lists, evaluated with the removal sigils of
//! [`resolve_asset_list`](crate::merge::resolve_asset_list).

use super::{CompileContext, ConfigHandler, HandlerKind};
use crate::artifact::Artifact;
use crate::context::ConfigContext;
use crate::error::{ConfigError, Result};
use crate::merge::{resolve_asset_list, MergeRules};
use crate::value::{ConfigValue, MergedTree};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const DIRECTIVES: &[&str] = &[
    "template",
    "layout",
    "has_layout",
    "http_metas",
    "metas",
    "stylesheets",
    "javascripts",
    "escaping",
    "components",
];

/// Layout used when `layout` is not configured anywhere.
pub const DEFAULT_LAYOUT: &str = "layout";

/// Decorator template wrapped around a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRule {
    pub name: String,
    /// Skip the layout for XMLHttpRequests. Set when the view did not choose
    /// its layout explicitly.
    pub xhr_exempt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stylesheet {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Escaping {
    pub strategy: Option<String>,
    pub method: Option<String>,
}

/// Component rendered into a named slot of the layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentSlot {
    pub module: Option<String>,
    pub component: Option<String>,
}

/// Everything configured around one template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSettings {
    pub layout: Option<LayoutRule>,
    pub http_metas: IndexMap<String, String>,
    /// HTML-escaped values.
    pub metas: IndexMap<String, String>,
    pub stylesheets: Vec<Stylesheet>,
    pub javascripts: Vec<String>,
    pub escaping: Escaping,
    pub components: IndexMap<String, ComponentSlot>,
}

/// Compiled view table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewTable {
    /// `<action><view>` to template name, in declaration order.
    pub templates: IndexMap<String, String>,
    pub default_template: Option<String>,
    /// `<template><view>` to settings, in declaration order.
    pub views: IndexMap<String, ViewSettings>,
    pub default: ViewSettings,
}

/// A view resolved for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedView<'a> {
    pub template: String,
    pub layout: Option<&'a str>,
    pub settings: &'a ViewSettings,
}

impl ViewTable {
    /// Resolve the view `view` (e.g. `Success`) of `action`.
    pub fn resolve(&self, action: &str, view: &str, is_xhr: bool) -> ResolvedView<'_> {
        let template = self
            .templates
            .get(&format!("{action}{view}"))
            .or(self.default_template.as_ref())
            .cloned()
            .unwrap_or_else(|| action.to_string());

        let settings = self
            .views
            .get(&format!("{template}{view}"))
            .unwrap_or(&self.default);

        let layout = settings
            .layout
            .as_ref()
            .filter(|rule| !(is_xhr && rule.xhr_exempt))
            .map(|rule| rule.name.as_str());

        ResolvedView {
            template,
            layout,
            settings,
        }
    }
}

/// Compiles module `view.yml`.
#[derive(Debug, Default)]
pub struct ViewHandler;

impl ConfigHandler for ViewHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::View
    }

    fn rules(&self) -> MergeRules {
        MergeRules::new().strict(DIRECTIVES)
    }

    fn compile(&self, tree: &MergedTree, ctx: &CompileContext<'_>) -> Result<Artifact> {
        let compiler = ViewCompiler::new(tree, ctx)?;

        let mut templates = IndexMap::new();
        for category in tree.specific_categories() {
            if let Some(template) = compiler.template(category) {
                templates.insert(category.to_string(), template);
            }
        }

        let mut views = IndexMap::new();
        for category in tree.specific_categories() {
            views.insert(category.to_string(), compiler.settings(category)?);
        }

        Ok(Artifact::View(ViewTable {
            templates,
            default_template: compiler.template("all"),
            views,
            default: compiler.settings("all")?,
        }))
    }
}

/// Per-compilation state: the tree plus compiled placeholder patterns.
struct ViewCompiler<'t> {
    tree: &'t MergedTree,
    ctx: &'t CompileContext<'t>,
    constant: Regex,
    escaped_entity: Regex,
}

impl<'t> ViewCompiler<'t> {
    const CONSTANT_PATTERN: &'static str = r"%([A-Za-z_][A-Za-z0-9_]*)%";
    const ESCAPED_ENTITY_PATTERN: &'static str = r"&amp;(#?\w+;)";

    fn new(tree: &'t MergedTree, ctx: &'t CompileContext<'t>) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                ConfigError::configuration(None, None, format!("invalid view pattern: {e}"))
            })
        };
        Ok(Self {
            tree,
            ctx,
            constant: compile(Self::CONSTANT_PATTERN)?,
            escaped_entity: compile(Self::ESCAPED_ENTITY_PATTERN)?,
        })
    }

    fn template(&self, category: &str) -> Option<String> {
        self.tree
            .lookup(category, "template")
            .and_then(ConfigValue::to_scalar_string)
            .filter(|t| !t.is_empty())
    }

    fn settings(&self, category: &str) -> Result<ViewSettings> {
        Ok(ViewSettings {
            layout: self.layout(category),
            http_metas: self.string_map(category, "http_metas")?,
            metas: self
                .string_map(category, "metas")?
                .into_iter()
                .map(|(name, content)| {
                    let escaped = self.escape_meta(&content);
                    (name, escaped)
                })
                .collect(),
            stylesheets: self.stylesheets(category),
            javascripts: self.javascripts(category),
            escaping: self.escaping(category)?,
            components: self.components(category)?,
        })
    }

    fn layout(&self, category: &str) -> Option<LayoutRule> {
        let has_layout = self
            .tree
            .lookup(category, "has_layout")
            .map(ConfigValue::as_flag)
            .unwrap_or(true);
        if !has_layout {
            return None;
        }

        let name = match self.tree.lookup(category, "layout") {
            None => DEFAULT_LAYOUT.to_string(),
            // YAML 1.1 switches (`off`, `no`) arrive as strings.
            Some(value) if !value.as_flag() => return None,
            Some(value) => value.to_scalar_string().filter(|n| !n.is_empty())?,
        };

        let local = category != "all"
            && self
                .tree
                .category(category)
                .is_some_and(|c| c.contains_key("layout") || c.contains_key("has_layout"));

        Some(LayoutRule {
            name,
            xhr_exempt: !local,
        })
    }

    fn string_map(&self, category: &str, key: &str) -> Result<IndexMap<String, String>> {
        match self.tree.merged_value(category, key) {
            None | Some(ConfigValue::Null) => Ok(IndexMap::new()),
            Some(ConfigValue::Mapping(m)) => m
                .into_iter()
                .map(|(name, value)| {
                    value
                        .to_scalar_string()
                        .map(|v| (name.clone(), v))
                        .ok_or_else(|| {
                            self.ctx.configuration_error(
                                Some(&format!("{category}.{key}.{name}")),
                                "expected a scalar value",
                            )
                        })
                })
                .collect(),
            Some(_) => Err(self.ctx.configuration_error(
                Some(&format!("{category}.{key}")),
                "expected a mapping",
            )),
        }
    }

    /// Escape HTML special characters, leaving existing entities intact.
    fn escape_meta(&self, content: &str) -> String {
        let escaped = html_escape::encode_quoted_attribute(content);
        self.escaped_entity
            .replace_all(&escaped, "&$1")
            .into_owned()
    }

    fn replace_constants<'s>(&self, value: &'s str) -> Cow<'s, str> {
        replace_constants(&self.constant, self.ctx.config, value)
    }

    fn asset_values(&self, category: &str, key: &str) -> Vec<ConfigValue> {
        match self.tree.merged_value(category, key) {
            None | Some(ConfigValue::Null) => Vec::new(),
            Some(ConfigValue::Sequence(items)) => items,
            Some(single) => vec![single],
        }
    }

    fn stylesheets(&self, category: &str) -> Vec<Stylesheet> {
        resolve_asset_list(&self.asset_values(category, "stylesheets"))
            .into_iter()
            .map(|entry| {
                let mut position = None;
                let mut options = IndexMap::new();
                for (key, value) in entry.options {
                    let value = value.to_string();
                    if key == "position" {
                        position = Some(value);
                    } else {
                        options.insert(key, value);
                    }
                }
                Stylesheet {
                    name: self.replace_constants(&entry.name).into_owned(),
                    position,
                    options,
                }
            })
            .collect()
    }

    fn javascripts(&self, category: &str) -> Vec<String> {
        resolve_asset_list(&self.asset_values(category, "javascripts"))
            .into_iter()
            .map(|entry| self.replace_constants(&entry.name).into_owned())
            .collect()
    }

    fn escaping(&self, category: &str) -> Result<Escaping> {
        match self.tree.lookup(category, "escaping") {
            None | Some(ConfigValue::Null) => Ok(Escaping::default()),
            Some(ConfigValue::Mapping(m)) => Ok(Escaping {
                strategy: m.get("strategy").and_then(ConfigValue::to_scalar_string),
                method: m.get("method").and_then(ConfigValue::to_scalar_string),
            }),
            Some(_) => Err(self.ctx.configuration_error(
                Some(&format!("{category}.escaping")),
                "expected a mapping with 'strategy' and/or 'method'",
            )),
        }
    }

    fn components(&self, category: &str) -> Result<IndexMap<String, ComponentSlot>> {
        match self.tree.merged_value(category, "components") {
            None | Some(ConfigValue::Null) => Ok(IndexMap::new()),
            Some(ConfigValue::Mapping(m)) => Ok(m
                .into_iter()
                .map(|(name, value)| {
                    let slot = match value.as_sequence() {
                        Some(parts) if !parts.is_empty() => ComponentSlot {
                            module: parts.first().and_then(ConfigValue::to_scalar_string),
                            component: parts.get(1).and_then(ConfigValue::to_scalar_string),
                        },
                        _ => ComponentSlot::default(),
                    };
                    (name, slot)
                })
                .collect()),
            Some(_) => Err(self.ctx.configuration_error(
                Some(&format!("{category}.components")),
                "expected a mapping of slot names to [module, component]",
            )),
        }
    }
}

/// Replace `%NAME%` with the context constant `name`; unknown names are kept.
fn replace_constants<'s>(pattern: &Regex, config: &ConfigContext, value: &'s str) -> Cow<'s, str> {
    pattern.replace_all(value, |caps: &regex::Captures<'_>| {
        config
            .constant(&caps[1])
            .map(str::to_string)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::parse_source;
    use cascade_directory::{LogicalPath, ProjectLayout};
    use std::path::Path;

    fn compile_with(src: &str, config: ConfigContext) -> Result<ViewTable> {
        let tree = MergedTree::from(parse_source(Path::new("view.yml"), src).unwrap());
        let path = LogicalPath::parse("modules/blog/config/view.yml").unwrap();
        let sources = [Path::new("/p/view.yml")];
        let ctx = CompileContext::new(&path, &config, &sources);
        let artifact = ViewHandler.compile(&tree, &ctx)?;
        Ok(artifact.as_view().unwrap().clone())
    }

    fn compile(src: &str) -> Result<ViewTable> {
        compile_with(src, ConfigContext::new(ProjectLayout::new("/p")))
    }

    fn names(sheets: &[Stylesheet]) -> Vec<&str> {
        sheets.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_template_override_then_view_settings() {
        let table = compile(
            r#"
all:
  stylesheets: [main]
showSuccess:
  template: post
postSuccess:
  layout: wide
  stylesheets: [post]
"#,
        )
        .unwrap();

        let view = table.resolve("show", "Success", false);
        assert_eq!(view.template, "post");
        assert_eq!(view.layout, Some("wide"));
        assert_eq!(names(&view.settings.stylesheets), vec!["main", "post"]);

        let other = table.resolve("list", "Success", false);
        assert_eq!(other.template, "list");
        assert_eq!(other.layout, Some(DEFAULT_LAYOUT));
        assert_eq!(names(&other.settings.stylesheets), vec!["main"]);
    }

    #[test]
    fn test_xhr_layout_exemption() {
        let table = compile(
            r#"
all: {layout: site}
indexSuccess: {metas: {title: Home}}
editSuccess: {has_layout: on}
"#,
        )
        .unwrap();

        assert_eq!(table.resolve("index", "Success", false).layout, Some("site"));
        assert_eq!(table.resolve("index", "Success", true).layout, None);
        assert_eq!(table.resolve("edit", "Success", true).layout, Some("site"));
        assert_eq!(table.resolve("other", "Success", true).layout, None);
    }

    #[test]
    fn test_layout_disabled() {
        let table = compile(
            r#"
all: {layout: site}
rawSuccess: {has_layout: off}
plainSuccess: {layout: false}
"#,
        )
        .unwrap();
        assert_eq!(table.resolve("raw", "Success", false).layout, None);
        assert_eq!(table.resolve("plain", "Success", false).layout, None);
    }

    #[test]
    fn test_layout_switch_words_disable_layout() {
        let table = compile(
            r#"
all: {layout: site}
rawSuccess: {layout: off}
bareSuccess: {layout: no}
blankSuccess: {layout: ""}
"#,
        )
        .unwrap();
        assert_eq!(table.resolve("raw", "Success", false).layout, None);
        assert_eq!(table.resolve("bare", "Success", false).layout, None);
        assert_eq!(table.resolve("blank", "Success", false).layout, None);
        assert_eq!(table.resolve("index", "Success", false).layout, Some("site"));
    }

    #[test]
    fn test_asset_sigils_apply_over_all_level() {
        let table = compile(
            r#"
default:
  javascripts: [prototype]
all:
  stylesheets: [main, print]
  javascripts: [app]
indexSuccess:
  stylesheets: [-main, index]
  javascripts: ['-*', widget]
"#,
        )
        .unwrap();

        let index = table.resolve("index", "Success", false).settings;
        assert_eq!(names(&index.stylesheets), vec!["print", "index"]);
        assert_eq!(index.javascripts, vec!["widget"]);

        let fallback = &table.default;
        assert_eq!(fallback.javascripts, vec!["prototype", "app"]);
    }

    #[test]
    fn test_stylesheet_position_and_options() {
        let table = compile(
            r#"
all:
  stylesheets:
    - {print: {media: print, position: last}}
    - main
"#,
        )
        .unwrap();
        let sheets = &table.default.stylesheets;
        assert_eq!(sheets[0].position.as_deref(), Some("last"));
        assert_eq!(sheets[0].options.get("media").map(String::as_str), Some("print"));
        assert!(sheets[1].options.is_empty());
    }

    #[test]
    fn test_constants_replaced_in_asset_names() {
        let config = ConfigContext::new(ProjectLayout::new("/p"))
            .with_constants([("sf_admin_web_dir", "/admin")]);
        let table = compile_with(
            "all:\n  stylesheets: ['%SF_ADMIN_WEB_DIR%/css/main', '%UNKNOWN%/x']\n",
            config,
        )
        .unwrap();
        assert_eq!(
            names(&table.default.stylesheets),
            vec!["/admin/css/main", "%UNKNOWN%/x"]
        );
    }

    #[test]
    fn test_metas_are_escaped_preserving_entities() {
        let table = compile(
            r#"
all:
  metas:
    title: "Tom & Jerry <show>"
    description: "caf&eacute; &amp; more"
  http_metas:
    content-type: text/html
"#,
        )
        .unwrap();
        let metas = &table.default.metas;
        assert_eq!(metas["title"], "Tom &amp; Jerry &lt;show&gt;");
        assert_eq!(metas["description"], "caf&eacute; &amp; more");
        assert_eq!(table.default.http_metas["content-type"], "text/html");
    }

    #[test]
    fn test_metas_merge_default_all_view() {
        let table = compile(
            r#"
default: {metas: {robots: index}}
all: {metas: {title: Blog}}
showSuccess: {metas: {title: Post}}
"#,
        )
        .unwrap();
        let show = table.resolve("show", "Success", false).settings;
        assert_eq!(show.metas["robots"], "index");
        assert_eq!(show.metas["title"], "Post");
    }

    #[test]
    fn test_escaping_and_components() {
        let table = compile(
            r#"
all:
  escaping: {strategy: both, method: ESC_ENTITIES}
  components:
    sidebar: [blog, recent]
    footer: []
"#,
        )
        .unwrap();
        let default = &table.default;
        assert_eq!(default.escaping.strategy.as_deref(), Some("both"));
        assert_eq!(default.escaping.method.as_deref(), Some("ESC_ENTITIES"));
        assert_eq!(
            default.components["sidebar"],
            ComponentSlot {
                module: Some("blog".to_string()),
                component: Some("recent".to_string())
            }
        );
        assert_eq!(default.components["footer"], ComponentSlot::default());
    }

    #[test]
    fn test_bad_metas_type() {
        let err = compile("all: {metas: [a, b]}").unwrap_err();
        assert!(err.to_string().contains("all.metas"));
    }
}
