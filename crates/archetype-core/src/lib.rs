//! Chart scaffolding engine
//!
//! Creates a new Helm chart from a starter and renders its values file and
//! templates in place with `((`/`))` delimited Go-style templates:
//!
//! - [`values`] and [`strvals`] resolve the configuration tree from values
//!   files and `--set` expressions
//! - [`starter`] copies a starter chart into place
//! - [`scaffold`] renders the new chart and prunes templates left blank
//! - [`templates`] is the template engine and helper library

pub mod chart;
pub mod config;
pub mod error;
pub mod fs;
pub mod prune;
pub mod render;
pub mod scaffold;
pub mod starter;
pub mod strvals;
pub mod templates;
pub mod values;

pub use chart::ChartMetadata;
pub use config::{ArchetypeConfig, ConfigError, ConfigManager};
pub use error::{ArchetypeError, Result};
pub use fs::{DirEntry, FileSystem, MemoryFileSystem, OsFileSystem};
pub use prune::BlankPruner;
pub use render::Renderer;
pub use scaffold::{Archetype, BundleLayout, RunSummary};
pub use starter::StarterCreator;
pub use templates::{Delimiters, MissingKey, TemplateEngine, TemplateError, Value};
pub use values::{ValuesError, ValuesOptions};
