//! Settings loaded from a TOML file layered under `ARCHETYPE_*` variables

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;
use thiserror::Error;

use crate::fs::FileSystem;
use crate::templates::{Delimiters, MissingKey};

/// Configuration result type
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Prefix of the environment variables layered over the file
pub const ENV_PREFIX: &str = "ARCHETYPE";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Scaffolding settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArchetypeConfig {
    /// Where named starters live; defaults to the helm data directory
    pub starters_dir: Option<PathBuf>,
    /// Values file rendered at the chart root
    pub values_file: String,
    /// Directory whose direct children are rendered
    pub templates_dir: String,
    pub left_delimiter: String,
    pub right_delimiter: String,
    /// Treat missing keys as errors
    pub strict: bool,
}

impl Default for ArchetypeConfig {
    fn default() -> Self {
        Self {
            starters_dir: None,
            values_file: "values.yaml".to_string(),
            templates_dir: "templates".to_string(),
            left_delimiter: "((".to_string(),
            right_delimiter: "))".to_string(),
            strict: false,
        }
    }
}

impl ArchetypeConfig {
    pub fn delimiters(&self) -> Delimiters {
        Delimiters::new(&self.left_delimiter, &self.right_delimiter)
    }

    pub fn missing_key(&self) -> MissingKey {
        if self.strict {
            MissingKey::Error
        } else {
            MissingKey::Zero
        }
    }
}

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager reading the default config file
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Create with custom config path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("helm-archetype")
            .join("config.toml")
    }

    /// Whether the config file is present on `fs`
    pub fn has_config_file(&self, fs: &dyn FileSystem) -> bool {
        fs.exists(&self.config_path) && !fs.is_dir(&self.config_path)
    }

    /// Load the file from `fs` (if present) overlaid with environment
    /// variables, then validate
    pub fn load_config(&self, fs: &dyn FileSystem) -> Result<ArchetypeConfig> {
        self.load_with_env(fs, None)
    }

    /// Load with `env` standing in for the process environment when given
    fn load_with_env(
        &self,
        fs: &dyn FileSystem,
        env: Option<Map<String, String>>,
    ) -> Result<ArchetypeConfig> {
        let mut builder = Config::builder();
        if self.has_config_file(fs) {
            let contents = fs.read_to_string(&self.config_path)?;
            builder = builder.add_source(File::from_str(&contents, FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let config = builder.build()?;
        let archetype_config: ArchetypeConfig = config.try_deserialize()?;
        self.validate_config(&archetype_config)?;
        Ok(archetype_config)
    }

    pub fn validate_config(&self, config: &ArchetypeConfig) -> Result<()> {
        if config.left_delimiter.is_empty() || config.right_delimiter.is_empty() {
            return Err(ConfigError::Validation(
                "Delimiters must not be empty".to_string(),
            ));
        }
        if config.left_delimiter == config.right_delimiter {
            return Err(ConfigError::Validation(format!(
                "Left and right delimiters must differ, both are {:?}",
                config.left_delimiter
            )));
        }
        if config.values_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Values file name must not be empty".to_string(),
            ));
        }
        if config.templates_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Templates directory name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    const CONFIG: &str = "/home/u/.config/helm-archetype/config.toml";

    fn manager() -> ConfigManager {
        ConfigManager::with_path(PathBuf::from(CONFIG))
    }

    fn env(vars: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let fs = MemoryFileSystem::new();
        assert!(!manager().has_config_file(&fs));
        let config = manager().load_with_env(&fs, env(&[])).unwrap();
        assert_eq!(config, ArchetypeConfig::default());
        assert_eq!(config.delimiters(), Delimiters::default());
        assert_eq!(config.missing_key(), MissingKey::Zero);
    }

    #[test]
    fn test_file_values_apply() {
        let fs = MemoryFileSystem::new();
        fs.insert(
            CONFIG,
            "strict = true\nleft_delimiter = \"[[\"\nright_delimiter = \"]]\"\nstarters_dir = \"/opt/starters\"\n",
        );
        assert!(manager().has_config_file(&fs));
        let config = manager().load_with_env(&fs, env(&[])).unwrap();
        assert!(config.strict);
        assert_eq!(config.delimiters(), Delimiters::new("[[", "]]"));
        assert_eq!(config.starters_dir, Some(PathBuf::from("/opt/starters")));
        assert_eq!(config.values_file, "values.yaml");
    }

    #[test]
    fn test_env_overrides_file() {
        let fs = MemoryFileSystem::new();
        fs.insert(CONFIG, "templates_dir = \"tpl\"\n");
        let config = manager()
            .load_with_env(&fs, env(&[
                ("ARCHETYPE_TEMPLATES_DIR", "manifests"),
                ("ARCHETYPE_STRICT", "true"),
                ("OTHER_VALUES_FILE", "ignored.yaml"),
            ]))
            .unwrap();
        assert_eq!(config.templates_dir, "manifests");
        assert!(config.strict);
        assert_eq!(config.values_file, "values.yaml");
    }

    #[test]
    fn test_invalid_env_fails_validation() {
        let err = manager()
            .load_with_env(&MemoryFileSystem::new(), env(&[("ARCHETYPE_RIGHT_DELIMITER", "((")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_validation() {
        let mgr = manager();
        let same = ArchetypeConfig {
            right_delimiter: "((".to_string(),
            ..Default::default()
        };
        assert!(matches!(mgr.validate_config(&same), Err(ConfigError::Validation(_))));
        let empty = ArchetypeConfig {
            values_file: " ".to_string(),
            ..Default::default()
        };
        assert!(mgr.validate_config(&empty).is_err());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let fs = MemoryFileSystem::new();
        fs.insert(CONFIG, "strict = = true\n");
        let err = manager().load_with_env(&fs, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_directory_is_not_a_config_file() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new(CONFIG)).unwrap();
        assert!(!manager().has_config_file(&fs));
        assert_eq!(
            manager().load_with_env(&fs, env(&[])).unwrap(),
            ArchetypeConfig::default()
        );
    }
}
