//! First-match lookup chains for templates, helpers and generator files.
//!
//! Configuration files are merged across every layer, but templates and
//! helpers are not: the first directory holding the file wins. Chains are
//! therefore ordered highest precedence first, the reverse of
//! [`PathResolver::resolve`].
//!
//! | Chain | Order |
//! |-------|-------|
//! | templates | module, plugin modules, core module, generated `auto<Module>` |
//! | helpers | module, plugin modules, application, project, plugins, framework |
//! | generator templates / skeletons | plugins, project theme, framework `default` theme |

use crate::error::{DirectoryError, Result};
use crate::logical_path::{is_contained, MODULES_DIR_NAME};
use crate::resolver::{PathResolver, SearchEntry, SearchOrigin};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Template directory inside a module.
pub const TEMPLATES_DIR_NAME: &str = "templates";

/// Helper directory below a `lib` directory.
pub const HELPER_DIR: &str = "lib/helper";

/// Theme used by the framework when a project theme lacks a file.
pub const DEFAULT_THEME: &str = "default";

/// Ordered directories searched for one kind of file, first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupChain {
    kind: &'static str,
    entries: Vec<SearchEntry>,
}

impl LookupChain {
    fn new(kind: &'static str, entries: Vec<SearchEntry>) -> Self {
        trace!("{} chain: {} directories", kind, entries.len());
        Self { kind, entries }
    }

    /// What the chain holds (`template`, `helper`, ...), for messages.
    pub fn kind(&self) -> &str {
        self.kind
    }

    /// Every searched directory, existing or not, highest precedence first.
    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.directory.as_path())
    }

    /// The first entry whose directory holds a readable `file`.
    pub fn entry_for(&self, file: &str) -> Option<&SearchEntry> {
        if !is_contained(Path::new(file)) {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| std::fs::File::open(entry.candidate(file)).is_ok_and(|f| is_file(&f)))
    }

    /// Path of the first readable `file` in the chain.
    ///
    /// The error lists every searched directory.
    pub fn find_first(&self, file: &str) -> Result<PathBuf> {
        match self.entry_for(file) {
            Some(entry) => {
                let found = entry.candidate(file);
                debug!("Found {} '{}' at {} ({})", self.kind, file, found.display(), entry.origin);
                Ok(found)
            }
            None => Err(DirectoryError::NotFoundInChain {
                kind: self.kind.to_string(),
                file: file.to_string(),
                searched: self.directories().map(Path::to_path_buf).collect(),
            }),
        }
    }
}

fn is_file(file: &std::fs::File) -> bool {
    file.metadata().map(|m| m.is_file()).unwrap_or(false)
}

/// A single normal path component such as a module or theme name.
fn segment<'n>(name: &'n str, what: &str) -> Result<&'n str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(DirectoryError::InvalidName {
            what: what.to_string(),
            name: name.to_string(),
        }),
    }
}

/// `blog` becomes `autoBlog`, the directory of a generated module.
fn generated_module_name(module: &str) -> String {
    let mut chars = module.chars();
    match chars.next() {
        Some(first) => format!("auto{}{}", first.to_uppercase(), chars.as_str()),
        None => "auto".to_string(),
    }
}

impl PathResolver<'_> {
    /// Directories searched for the templates of `module`.
    pub fn template_dirs(&self, module: &str) -> Result<LookupChain> {
        let module = segment(module, "module")?;
        let suffix = Path::new(MODULES_DIR_NAME).join(module).join(TEMPLATES_DIR_NAME);
        let layout = self.layout();

        let mut entries = Vec::new();
        if let Some(app_dir) = layout.app_dir() {
            entries.push(SearchEntry::new(app_dir.join(&suffix), SearchOrigin::Module));
        }
        for (name, dir) in self.plugins().config_directories(&suffix) {
            entries.push(SearchEntry::new(dir, SearchOrigin::PluginModule(name)));
        }
        entries.push(SearchEntry::new(
            layout.framework_dir().join(&suffix),
            SearchOrigin::CoreModule,
        ));
        entries.push(SearchEntry::new(
            layout
                .generated_dir()
                .join(MODULES_DIR_NAME)
                .join(generated_module_name(module))
                .join(TEMPLATES_DIR_NAME),
            SearchOrigin::Generated,
        ));
        Ok(LookupChain::new("template", entries))
    }

    /// Directories searched for helpers, including those of `module` when given.
    pub fn helper_dirs(&self, module: Option<&str>) -> Result<LookupChain> {
        let layout = self.layout();
        let app_dir = layout.app_dir();
        let mut entries = Vec::new();

        if let Some(module) = module {
            let suffix = Path::new(MODULES_DIR_NAME)
                .join(segment(module, "module")?)
                .join(HELPER_DIR);
            if let Some(app_dir) = &app_dir {
                entries.push(SearchEntry::new(app_dir.join(&suffix), SearchOrigin::Module));
            }
            for (name, dir) in self.plugins().config_directories(&suffix) {
                entries.push(SearchEntry::new(dir, SearchOrigin::PluginModule(name)));
            }
        }

        if let Some(app_dir) = &app_dir {
            entries.push(SearchEntry::new(
                app_dir.join(HELPER_DIR),
                SearchOrigin::Application,
            ));
        }
        entries.push(SearchEntry::new(
            layout.project_root().join(HELPER_DIR),
            SearchOrigin::Project,
        ));
        for (name, dir) in self.plugins().config_directories(Path::new(HELPER_DIR)) {
            entries.push(SearchEntry::new(dir, SearchOrigin::Plugin(name)));
        }
        entries.push(SearchEntry::new(
            layout.framework_dir().join(HELPER_DIR),
            SearchOrigin::Framework,
        ));
        Ok(LookupChain::new("helper", entries))
    }

    /// Directories searched for the templates of generator `class` in `theme`.
    pub fn generator_template_dirs(&self, class: &str, theme: &str) -> Result<LookupChain> {
        self.generator_dirs("generator template", class, theme, "template")
    }

    /// Directories searched for the skeleton of generator `class` in `theme`.
    pub fn generator_skeleton_dirs(&self, class: &str, theme: &str) -> Result<LookupChain> {
        self.generator_dirs("generator skeleton", class, theme, "skeleton")
    }

    fn generator_dirs(
        &self,
        kind: &'static str,
        class: &str,
        theme: &str,
        leaf: &str,
    ) -> Result<LookupChain> {
        let class = segment(class, "generator class")?;
        let theme = segment(theme, "generator theme")?;
        let layout = self.layout();
        let themed = Path::new("generator").join(class).join(theme).join(leaf);

        let mut entries = Vec::new();
        for (name, dir) in self
            .plugins()
            .config_directories(&Path::new("data").join(&themed))
        {
            entries.push(SearchEntry::new(dir, SearchOrigin::Plugin(name)));
        }
        entries.push(SearchEntry::new(
            layout.project_root().join("data").join(&themed),
            SearchOrigin::Project,
        ));
        entries.push(SearchEntry::new(
            layout
                .framework_dir()
                .join("generator")
                .join(class)
                .join(DEFAULT_THEME)
                .join(leaf),
            SearchOrigin::Framework,
        ));
        Ok(LookupChain::new(kind, entries))
    }
}
