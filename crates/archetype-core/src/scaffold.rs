//! Rendering a freshly created chart in place
//!
//! [`Archetype::run`] renders the chart's values file and every direct child
//! of its templates directory, deleting templates that rendered blank.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::chart::ChartMetadata;
use crate::error::{ArchetypeError, Result};
use crate::fs::FileSystem;
use crate::prune::BlankPruner;
use crate::render::Renderer;
use crate::templates::{TemplateEngine, Value};

/// Names of the files `run` touches inside the chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    pub values_file: String,
    pub templates_dir: String,
}

impl Default for BundleLayout {
    fn default() -> Self {
        Self {
            values_file: "values.yaml".to_string(),
            templates_dir: "templates".to_string(),
        }
    }
}

/// Files touched by a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rendered: Vec<PathBuf>,
    pub pruned: Vec<PathBuf>,
}

/// A chart directory and the values it is rendered with
#[derive(Debug, Clone)]
pub struct Archetype {
    chart_name: String,
    chart_path: PathBuf,
    values: Value,
    layout: BundleLayout,
    fs: Arc<dyn FileSystem>,
    renderer: Renderer,
    pruner: BlankPruner,
}

impl Archetype {
    pub fn new(chart_path: impl Into<PathBuf>, values: Value, fs: Arc<dyn FileSystem>) -> Self {
        let chart_path = chart_path.into();
        Self {
            chart_name: chart_name_of(&chart_path),
            chart_path,
            values,
            layout: BundleLayout::default(),
            renderer: Renderer::new(Arc::clone(&fs)),
            pruner: BlankPruner::new(Arc::clone(&fs)),
            fs,
        }
    }

    /// Render with a differently configured engine
    pub fn with_engine(mut self, engine: TemplateEngine) -> Self {
        self.renderer = Renderer::with_engine(Arc::clone(&self.fs), engine);
        self
    }

    pub fn with_layout(mut self, layout: BundleLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Base name of the chart path
    pub fn chart_name(&self) -> &str {
        &self.chart_name
    }

    pub fn chart_path(&self) -> &Path {
        &self.chart_path
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn chart_metadata(&self) -> ChartMetadata {
        ChartMetadata::from_values(&self.chart_name, &self.values)
    }

    /// Render the values file and templates in place.
    ///
    /// Missing files are skipped. The first failure aborts the run and
    /// files already processed stay as they are.
    pub fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let values_file = self.chart_path.join(&self.layout.values_file);
        if self.fs.exists(&values_file) {
            self.renderer.render(&values_file, &self.values)?;
            summary.rendered.push(values_file);
        } else {
            debug!(path = %values_file.display(), "no values file, skipping");
        }

        let templates_dir = self.chart_path.join(&self.layout.templates_dir);
        if !self.fs.is_dir(&templates_dir) {
            debug!(path = %templates_dir.display(), "no templates directory, skipping");
            return Ok(summary);
        }

        let entries = self
            .fs
            .read_dir(&templates_dir)
            .map_err(|source| ArchetypeError::Read {
                path: templates_dir.clone(),
                source,
            })?;

        for entry in entries {
            if entry.is_dir {
                debug!(path = %entry.path.display(), "skipping nested directory");
                continue;
            }
            self.renderer.render(&entry.path, &self.values)?;
            if self.pruner.prune_if_blank(&entry.path)? {
                summary.pruned.push(entry.path);
            } else {
                summary.rendered.push(entry.path);
            }
        }

        info!(
            rendered = summary.rendered.len(),
            pruned = summary.pruned.len(),
            "Rendered chart {}",
            self.chart_name
        );
        Ok(summary)
    }
}

fn chart_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn yaml(src: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(src).unwrap())
    }

    #[test]
    fn test_chart_name() {
        let fs: Arc<dyn FileSystem> = Arc::new(MemoryFileSystem::new());
        assert_eq!(Archetype::new("/work/shop", Value::empty_map(), fs.clone()).chart_name(), "shop");
        assert_eq!(Archetype::new("shop", Value::empty_map(), fs).chart_name(), "shop");
    }

    #[test]
    fn test_run_renders_and_prunes() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/c/values.yaml", "replicas: (( .Values.replicas ))\n");
        fs.insert("/c/templates/a.yaml", "kind: (( .Values.kind ))\n");
        fs.insert("/c/templates/b.yaml", "((- if .Values.extra ))\nx: 1\n((- end ))\n");
        fs.insert("/c/templates/nested/c.yaml", "(( .Values.kind ))");

        let values = yaml("Values: {replicas: 2, kind: Deployment, extra: false}");
        let summary = Archetype::new("/c", values, fs.clone()).run().unwrap();

        assert_eq!(fs.read_to_string(Path::new("/c/values.yaml")).unwrap(), "replicas: 2\n");
        assert_eq!(fs.read_to_string(Path::new("/c/templates/a.yaml")).unwrap(), "kind: Deployment\n");
        assert!(!fs.exists(Path::new("/c/templates/b.yaml")));
        assert_eq!(
            fs.read_to_string(Path::new("/c/templates/nested/c.yaml")).unwrap(),
            "(( .Values.kind ))"
        );
        assert_eq!(
            summary.rendered,
            vec![PathBuf::from("/c/values.yaml"), PathBuf::from("/c/templates/a.yaml")]
        );
        assert_eq!(summary.pruned, vec![PathBuf::from("/c/templates/b.yaml")]);
    }

    #[test]
    fn test_run_empty_chart() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.create_dir_all(Path::new("/c")).unwrap();
        let summary = Archetype::new("/c", Value::empty_map(), fs.clone()).run().unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(fs.files().is_empty());
    }

    #[test]
    fn test_run_stops_at_first_failure() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/c/templates/a.yaml", "(( .Values.missing.deep ))");
        fs.insert("/c/templates/b.yaml", "(( .Values.kind ))");
        let err = Archetype::new("/c", yaml("Values: {kind: Job}"), fs.clone())
            .run()
            .unwrap_err();
        assert!(matches!(err, ArchetypeError::Execution { .. }));
        assert_eq!(
            fs.read_to_string(Path::new("/c/templates/b.yaml")).unwrap(),
            "(( .Values.kind ))"
        );
    }

    #[test]
    fn test_custom_layout() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/c/defaults.yaml", "a: (( .Values.a ))");
        fs.insert("/c/manifests/x.yaml", "b: (( .Values.a ))");
        let layout = BundleLayout {
            values_file: "defaults.yaml".to_string(),
            templates_dir: "manifests".to_string(),
        };
        Archetype::new("/c", yaml("Values: {a: 1}"), fs.clone())
            .with_layout(layout)
            .run()
            .unwrap();
        assert_eq!(fs.read_to_string(Path::new("/c/defaults.yaml")).unwrap(), "a: 1");
        assert_eq!(fs.read_to_string(Path::new("/c/manifests/x.yaml")).unwrap(), "b: 1");
    }
}
