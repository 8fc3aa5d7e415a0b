//! Error types for chart scaffolding

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::templates::TemplateError;
use crate::values::ValuesError;

/// Errors that can occur while scaffolding a chart
#[derive(Debug, Error)]
pub enum ArchetypeError {
    /// A file could not be read, or was not valid UTF-8
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file's template syntax is malformed
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// A template failed while executing against the values
    #[error("Failed to render {path}: {source}")]
    Execution {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// Rendered output could not be written back
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blank template could not be deleted
    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Values or settings could not be resolved
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The starter chart could not be copied into place
    #[error("Failed to create chart {name} from starter {}: {reason}", starter.display())]
    ScaffoldCreation {
        name: String,
        starter: PathBuf,
        reason: String,
    },
}

impl ArchetypeError {
    /// The file the failed operation was working on, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::Execution { path, .. }
            | Self::Write { path, .. }
            | Self::Delete { path, .. } => Some(path),
            Self::ScaffoldCreation { starter, .. } => Some(starter),
            Self::Configuration(_) => None,
        }
    }
}

impl From<ValuesError> for ArchetypeError {
    fn from(err: ValuesError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<ConfigError> for ArchetypeError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for scaffolding operations
pub type Result<T> = std::result::Result<T, ArchetypeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = ArchetypeError::Delete {
            path: PathBuf::from("/c/templates/x.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Failed to delete /c/templates/x.yaml: denied");
        assert_eq!(err.path(), Some(std::path::Path::new("/c/templates/x.yaml")));
    }

    #[test]
    fn test_values_error_becomes_configuration() {
        let err: ArchetypeError = ValuesError::Remote("https://x/values.yaml".into()).into();
        assert!(matches!(err, ArchetypeError::Configuration(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
