//! Search-path resolution for cascading configuration directories.
//!
//! A logical configuration path such as `modules/blog/config/view.yml` may be
//! supplied by many physical directories: framework defaults, core modules,
//! enabled plugins, the project, the application, module-local overrides and
//! generated overrides. This crate computes that ordered list and loads the
//! files found in it.
//!
//! # Overview
//!
//! - [`LogicalPath`] - A validated, location-independent configuration path
//! - [`ProjectLayout`] - Where each cascade layer lives on disk
//! - [`PluginRegistry`] - The ordered list of enabled plugins
//! - [`PathResolver`] - Produces the ordered [`SearchEntry`] list for a logical path
//! - [`load_sources`] - Reads the matching files in precedence order
//! - [`LookupChain`] - First-match directories for templates, helpers and generators
//!
//! # Example
//!
//! ```no_run
//! use cascade_directory::{
//!     load_sources, LogicalPath, PathResolver, PluginRegistry, ProjectLayout,
//! };
//!
//! let layout = ProjectLayout::discover()?.with_application("frontend");
//! let plugins = PluginRegistry::discover(layout.plugins_dir())?;
//! let resolver = PathResolver::new(&layout, &plugins);
//!
//! let path = LogicalPath::parse("modules/blog/config/view.yml")?;
//! let entries = resolver.resolve(&path);
//! for source in load_sources(&entries, path.file_name())? {
//!     println!("{} ({})", source.path.display(), source.origin);
//! }
//! # Ok::<(), cascade_directory::DirectoryError>(())
//! ```

mod error;
mod file_loader;
mod layout;
mod logical_path;
mod lookup;
mod plugin;
mod resolver;

// Re-export main types
pub use error::{DirectoryError, Result};
pub use file_loader::{load_sources, SourceFile, MAX_FILE_SIZE};
pub use layout::{find_project_root_from, DirectoryNames, ProjectLayout, PROJECT_MARKER};
pub use logical_path::{LogicalPath, MODULES_DIR_NAME};
pub use lookup::{LookupChain, DEFAULT_THEME, HELPER_DIR, TEMPLATES_DIR_NAME};
pub use plugin::{glob_dirs, PluginDirectories, PluginEntry, PluginRegistry};
pub use resolver::{PathResolver, SearchEntry, SearchOrigin};
