//! Configuration cascade: merge, compile and cache
//!
//! Builds on [`cascade_directory`] search-path resolution:
//!
//! 1. The files behind a logical path are deep-merged in precedence order
//!    ([`CascadeMerger`]).
//! 2. The handler mapped to the path compiles the merged tree into a typed
//!    [`Artifact`] ([`HandlerRegistry`]).
//! 3. The artifact is stored with a fingerprint of every watched source and
//!    reused until one of them changes ([`CompiledCache`]).
//!
//! [`ConfigCascade`] runs the whole flow for one project.
//!
//! # Example
//!
//! ```no_run
//! use cascade_config::ConfigCascade;
//! use cascade_directory::LogicalPath;
//!
//! let cascade = ConfigCascade::open(std::path::Path::new("/srv/blog"))?;
//! let path = LogicalPath::parse("modules/blog/config/cache.yml")?;
//! let artifact = cascade.load(&path)?;
//! if let Some(table) = artifact.body.as_cache() {
//!     println!("{:?}", table.registration_for("index"));
//! }
//! # Ok::<(), cascade_config::ConfigError>(())
//! ```

pub mod artifact;
pub mod cache;
pub mod cascade;
pub mod context;
pub mod error;
pub mod handler;
pub mod merge;
pub mod runtime;
pub mod settings;
pub mod value;

pub use artifact::{Artifact, ArtifactHeader, CompiledArtifact, FingerprintEntry, SourceFingerprint};
pub use cache::{CacheKey, CacheState, CompiledCache};
pub use cascade::{ConfigCascade, RUNTIME_PATH, SETTINGS_PATH};
pub use context::ConfigContext;
pub use error::{ConfigError, Result};
pub use handler::{CompileContext, ConfigHandler, HandlerKind, HandlerRegistry};
pub use merge::{resolve_asset_list, AssetEntry, CascadeMerger, MergeOutcome, MergeRules};
pub use runtime::{RuntimeDescription, RuntimeEnvironment, RuntimeError, RuntimeSetting, StaticRuntime};
pub use settings::ProjectSettings;
pub use value::{ConfigValue, Mapping, MergedTree};
