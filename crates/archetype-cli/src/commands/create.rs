// Create a chart from a starter and render it in place

use std::path::{Path, PathBuf};
use std::sync::Arc;

use archetype_core::{
    Archetype, ArchetypeConfig, BundleLayout, ConfigManager, FileSystem, MissingKey, OsFileSystem,
    RunSummary, StarterCreator, TemplateEngine, ValuesOptions,
};
use tracing::debug;

use super::Command;
use crate::error::{CliError, CliResult};
use crate::output;

/// Create a new chart named `name` from `starter`
pub struct CreateCommand {
    name: String,
    starter: String,
    values: ValuesOptions,
    config_path: Option<PathBuf>,
    starters_dir: Option<PathBuf>,
    strict: bool,
    fs: Arc<dyn FileSystem>,
}

impl CreateCommand {
    pub fn new(name: String, starter: String) -> Self {
        Self {
            name,
            starter,
            values: ValuesOptions::default(),
            config_path: None,
            starters_dir: None,
            strict: false,
            fs: Arc::new(OsFileSystem::new()),
        }
    }

    pub fn with_values(mut self, values: ValuesOptions) -> Self {
        self.values = values;
        self
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn with_starters_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.starters_dir = dir;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    fn load_config(&self) -> CliResult<ArchetypeConfig> {
        let manager = match &self.config_path {
            Some(path) => {
                let manager = ConfigManager::with_path(path.clone());
                if !manager.has_config_file(self.fs.as_ref()) {
                    return Err(CliError::InvalidArgument {
                        message: format!("config file {} does not exist", path.display()),
                    });
                }
                manager
            }
            None => ConfigManager::new(),
        };
        debug!(path = %manager.config_path().display(), "loading configuration");
        Ok(manager.load_config(self.fs.as_ref())?)
    }

    /// Run the whole workflow and report what was rendered
    pub fn create(&self) -> CliResult<(PathBuf, RunSummary)> {
        if self.name.trim().is_empty() {
            return Err(CliError::InvalidArgument {
                message: "chart name must not be empty".to_string(),
            });
        }

        let config = self.load_config()?;
        let values = self.values.merge_values(self.fs.as_ref())?;

        let missing_key = if self.strict {
            MissingKey::Error
        } else {
            config.missing_key()
        };
        let engine = TemplateEngine::new()
            .with_delimiters(config.delimiters())
            .with_missing_key(missing_key);

        let chart_path = PathBuf::from(&self.name);
        let archetype = Archetype::new(&chart_path, values, Arc::clone(&self.fs))
            .with_engine(engine)
            .with_layout(BundleLayout {
                values_file: config.values_file.clone(),
                templates_dir: config.templates_dir.clone(),
            });

        let starters_dir = self
            .starters_dir
            .clone()
            .or_else(|| config.starters_dir.clone())
            .unwrap_or_else(StarterCreator::default_starters_dir);
        let creator = StarterCreator::new(Arc::clone(&self.fs), starters_dir);
        let starter = creator.resolve_starter(&self.starter);

        let parent = chart_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let dest = creator.create_from(&archetype.chart_metadata(), parent, &starter)?;

        let summary = archetype.run()?;
        Ok((dest, summary))
    }
}

impl Command for CreateCommand {
    fn execute(&self) -> CliResult<()> {
        let (dest, summary) = self.create()?;
        output::print_success(&format!(
            "Created chart {} ({} rendered, {} removed)",
            dest.display(),
            summary.rendered.len(),
            summary.pruned.len()
        ));
        if summary.rendered.is_empty() {
            output::print_info("starter has no values file or templates to render");
        }
        let removed: Vec<String> = summary
            .pruned
            .iter()
            .map(|p| format!("removed {}", p.display()))
            .collect();
        output::print_list(&removed);
        Ok(())
    }
}
