//! In-place rendering of a single chart file

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{ArchetypeError, Result};
use crate::fs::FileSystem;
use crate::templates::{TemplateEngine, Value};

/// Renders one file against the configuration tree and writes it back
#[derive(Debug, Clone)]
pub struct Renderer {
    fs: Arc<dyn FileSystem>,
    engine: TemplateEngine,
}

impl Renderer {
    /// Create a renderer using the default `((`/`))` engine
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_engine(fs, TemplateEngine::new())
    }

    pub fn with_engine(fs: Arc<dyn FileSystem>, engine: TemplateEngine) -> Self {
        Self { fs, engine }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Render `path` in place.
    ///
    /// The file is only rewritten after parsing and execution both succeed,
    /// so a failed render leaves the original bytes untouched.
    pub fn render(&self, path: &Path, values: &Value) -> Result<()> {
        info!("Rendering file {}", path.display());

        let source = self
            .fs
            .read_to_string(path)
            .map_err(|source| ArchetypeError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path.display().to_string();
        let template = self
            .engine
            .parse(&name, &source)
            .map_err(|source| ArchetypeError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let output = template
            .execute(values)
            .map_err(|source| ArchetypeError::Execution {
                path: path.to_path_buf(),
                source,
            })?;

        self.fs
            .write(path, output.as_bytes())
            .map_err(|source| ArchetypeError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), bytes = output.len(), "wrote rendered file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn values() -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>("Values:\n  enable: true\n").unwrap())
    }

    #[test]
    fn test_render_rewrites_file() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/c/values.yaml", "some: (( .Values.enable ))\nimage: {{ .Values.image }}\n");
        let renderer = Renderer::new(fs.clone());
        renderer.render(Path::new("/c/values.yaml"), &values()).unwrap();
        assert_eq!(
            fs.read_to_string(Path::new("/c/values.yaml")).unwrap(),
            "some: true\nimage: {{ .Values.image }}\n"
        );
    }

    #[test]
    fn test_failed_render_keeps_original() {
        let fs = Arc::new(MemoryFileSystem::new());
        let original = "a: (( .Values.enable.deeper.x ))\n";
        fs.insert("/c/t.yaml", original);
        let renderer = Renderer::new(fs.clone());
        let err = renderer.render(Path::new("/c/t.yaml"), &values()).unwrap_err();
        assert!(matches!(err, ArchetypeError::Execution { .. }));
        assert_eq!(fs.read_to_string(Path::new("/c/t.yaml")).unwrap(), original);
    }

    #[test]
    fn test_parse_error_kind() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/c/t.yaml", "((if .Values.enable))x");
        let err = Renderer::new(fs).render(Path::new("/c/t.yaml"), &values()).unwrap_err();
        assert!(matches!(err, ArchetypeError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let fs = Arc::new(MemoryFileSystem::new());
        let err = Renderer::new(fs).render(Path::new("/nope"), &values()).unwrap_err();
        assert!(matches!(err, ArchetypeError::Read { .. }));
    }
}
