// CLI error types and user-facing messages

use archetype_core::{ArchetypeError, ConfigError, ValuesError};
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Scaffold(#[from] ArchetypeError),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<ValuesError> for CliError {
    fn from(err: ValuesError) -> Self {
        CliError::Config(format!("could not merge values: {}", err))
    }
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'helm-archetype --help' for usage information.",
                    message
                )
            }
            CliError::Config(msg) => format!(
                "Configuration error: {}\n\nCheck your values files, --set flags and config file.",
                msg
            ),
            CliError::Scaffold(err @ ArchetypeError::ScaffoldCreation { .. }) => format!(
                "{}\n\nCheck that the starter exists and contains a Chart.yaml.",
                err
            ),
            CliError::Scaffold(ArchetypeError::Configuration(msg)) => {
                format!("Configuration error: {}", msg)
            }
            CliError::Scaffold(err) => format!("Scaffolding failed: {}", err),
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }
}

pub type CliResult<T> = Result<T, CliError>;
