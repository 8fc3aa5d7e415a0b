//! Template error types

use thiserror::Error;

/// Errors raised while parsing or executing a template
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// Malformed template source
    #[error("template: {name}:{line}: {message}")]
    Syntax {
        /// Template name
        name: String,
        /// Line number where the problem was detected
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// Failure while evaluating a parsed template
    #[error("template: {name}:{line}: executing \"{name}\" at <{context}>: {message}")]
    Execution {
        /// Template name
        name: String,
        /// Line of the failing action
        line: usize,
        /// Source form of the failing expression
        context: String,
        /// Description of the problem
        message: String,
    },
}

impl TemplateError {
    pub(crate) fn syntax(name: &str, line: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            name: name.to_string(),
            line,
            message: message.into(),
        }
    }

    /// True for errors raised before execution started
    pub fn is_syntax(&self) -> bool {
        matches!(self, TemplateError::Syntax { .. })
    }
}
