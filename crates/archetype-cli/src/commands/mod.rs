// Command handlers for helm-archetype

pub mod create;

pub use create::CreateCommand;

use crate::error::CliResult;

/// Trait for command handlers
pub trait Command {
    /// Execute the command
    fn execute(&self) -> CliResult<()>;
}
