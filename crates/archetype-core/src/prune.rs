//! Deletion of templates that rendered to nothing but whitespace

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{ArchetypeError, Result};
use crate::fs::FileSystem;

// Blank lines anywhere, plus a trailing newline run followed by whitespace.
// `\s` is spelled out as the ASCII class so Unicode spaces are not stripped.
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[\t\n\f\r ]*$[\r\n]*|[\r\n]+[\t\n\f\r ]+\z")
        .unwrap_or_else(|e| unreachable!("blank-line pattern is valid: {e}"))
});

/// Strip blank lines the same way the pruner does
pub fn strip_blank_lines(content: &str) -> String {
    BLANK_LINES.replace_all(content, "").into_owned()
}

/// Removes files whose rendered content is blank
#[derive(Debug, Clone)]
pub struct BlankPruner {
    fs: Arc<dyn FileSystem>,
}

impl BlankPruner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Delete `path` if it holds only blank lines.
    ///
    /// Returns whether the file was deleted. Non-blank files are left
    /// exactly as they were.
    pub fn prune_if_blank(&self, path: &Path) -> Result<bool> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|source| ArchetypeError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        if !strip_blank_lines(&content).is_empty() {
            debug!(path = %path.display(), "template has content, keeping");
            return Ok(false);
        }

        self.fs
            .remove_file(path)
            .map_err(|source| ArchetypeError::Delete {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Removed blank template {}", path.display());
        Ok(true)
    }
}
