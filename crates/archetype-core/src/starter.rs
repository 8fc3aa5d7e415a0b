//! Copying a starter chart into place as a new chart

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::chart::ChartMetadata;
use crate::error::{ArchetypeError, Result};
use crate::fs::FileSystem;

/// Placeholder replaced by the chart name in copied files
pub const CHART_NAME_PLACEHOLDER: &str = "<CHARTNAME>";

pub const CHART_FILE: &str = "Chart.yaml";
pub const VALUES_FILE: &str = "values.yaml";

/// Creates new charts from starters
#[derive(Debug, Clone)]
pub struct StarterCreator {
    fs: Arc<dyn FileSystem>,
    starters_dir: PathBuf,
}

impl StarterCreator {
    pub fn new(fs: Arc<dyn FileSystem>, starters_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            starters_dir: starters_dir.into(),
        }
    }

    /// `$HELM_DATA_HOME/starters`, or `helm/starters` under the platform
    /// data directory
    pub fn default_starters_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HELM_DATA_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(home).join("starters");
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("helm")
            .join("starters")
    }

    pub fn starters_dir(&self) -> &Path {
        &self.starters_dir
    }

    /// Absolute starters are used as given, names resolve in the starters dir
    pub fn resolve_starter(&self, starter: &str) -> PathBuf {
        let path = Path::new(starter);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.starters_dir.join(path)
        }
    }

    /// Copy `starter` to `<dest_parent>/<metadata.name>` and write its
    /// `Chart.yaml` from `metadata`.
    ///
    /// Returns the path of the new chart.
    pub fn create_from(
        &self,
        metadata: &ChartMetadata,
        dest_parent: &Path,
        starter: &Path,
    ) -> Result<PathBuf> {
        let fail = |reason: String| ArchetypeError::ScaffoldCreation {
            name: metadata.name.clone(),
            starter: starter.to_path_buf(),
            reason,
        };

        if !self.fs.is_dir(starter) {
            return Err(fail("starter directory does not exist".to_string()));
        }
        if !self.fs.exists(&starter.join(CHART_FILE)) {
            return Err(fail(format!("starter has no {}", CHART_FILE)));
        }

        let dest = dest_parent.join(&metadata.name);
        if self.fs.exists(&dest) && !self.fs.is_dir(&dest) {
            return Err(fail(format!(
                "{} already exists and is not a directory",
                dest.display()
            )));
        }

        info!(
            "Creating {} from starter {}",
            metadata.name,
            starter.display()
        );
        self.copy_dir(starter, &dest, &metadata.name, true)
            .map_err(fail)?;

        let chart_yaml = metadata
            .to_yaml()
            .map_err(|e| fail(format!("cannot serialize {}: {}", CHART_FILE, e)))?;
        let chart_file = dest.join(CHART_FILE);
        self.fs
            .write(&chart_file, chart_yaml.as_bytes())
            .map_err(|e| fail(format!("cannot write {}: {}", chart_file.display(), e)))?;

        Ok(dest)
    }

    fn copy_dir(
        &self,
        from: &Path,
        to: &Path,
        chart_name: &str,
        is_root: bool,
    ) -> std::result::Result<(), String> {
        self.fs
            .create_dir_all(to)
            .map_err(|e| format!("cannot create {}: {}", to.display(), e))?;

        let entries = self
            .fs
            .read_dir(from)
            .map_err(|e| format!("cannot list {}: {}", from.display(), e))?;

        for entry in entries {
            let target = to.join(&entry.name);
            if entry.is_dir {
                self.copy_dir(&entry.path, &target, chart_name, false)?;
                continue;
            }
            if is_root && entry.name == CHART_FILE {
                continue;
            }

            let bytes = self
                .fs
                .read(&entry.path)
                .map_err(|e| format!("cannot read {}: {}", entry.path.display(), e))?;
            let contents = match String::from_utf8(bytes) {
                Ok(text) => {
                    let text = text.replace(CHART_NAME_PLACEHOLDER, chart_name);
                    if is_root && entry.name == VALUES_FILE {
                        check_yaml(&text)
                            .map_err(|e| format!("transforming values file: {}", e))?;
                    }
                    text.into_bytes()
                }
                Err(raw) => raw.into_bytes(),
            };
            debug!(file = %target.display(), "copying starter file");
            self.fs
                .write(&target, &contents)
                .map_err(|e| format!("cannot write {}: {}", target.display(), e))?;
        }
        Ok(())
    }
}

fn check_yaml(text: &str) -> std::result::Result<(), serde_yaml::Error> {
    serde_yaml::from_str::<serde_yaml::Value>(text).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::templates::Value;

    fn starter_fs() -> Arc<MemoryFileSystem> {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/starters/web/Chart.yaml", "name: starter\n");
        fs.insert("/starters/web/values.yaml", "nameOverride: <CHARTNAME>\n");
        fs.insert(
            "/starters/web/templates/svc.yaml",
            "name: {{ include \"<CHARTNAME>.fullname\" . }}\n",
        );
        fs.insert("/starters/web/files/logo.bin", [0xff, 0x00]);
        fs
    }

    #[test]
    fn test_create_from_copies_and_replaces() {
        let fs = starter_fs();
        let creator = StarterCreator::new(fs.clone(), "/starters");
        let meta = ChartMetadata::from_values("shop", &Value::empty_map());
        let starter = creator.resolve_starter("web");
        let dest = creator.create_from(&meta, Path::new("/work"), &starter).unwrap();

        assert_eq!(dest, PathBuf::from("/work/shop"));
        assert_eq!(
            fs.read_to_string(Path::new("/work/shop/values.yaml")).unwrap(),
            "nameOverride: shop\n"
        );
        assert_eq!(
            fs.read_to_string(Path::new("/work/shop/templates/svc.yaml")).unwrap(),
            "name: {{ include \"shop.fullname\" . }}\n"
        );
        assert_eq!(fs.read(Path::new("/work/shop/files/logo.bin")).unwrap(), vec![0xff, 0x00]);
        let chart = fs.read_to_string(Path::new("/work/shop/Chart.yaml")).unwrap();
        assert!(chart.contains("name: shop"));
        assert!(!chart.contains("starter"));
    }

    #[test]
    fn test_resolve_starter() {
        let creator = StarterCreator::new(Arc::new(MemoryFileSystem::new()), "/starters");
        assert_eq!(creator.resolve_starter("web"), PathBuf::from("/starters/web"));
        assert_eq!(creator.resolve_starter("/opt/web"), PathBuf::from("/opt/web"));
    }

    #[test]
    fn test_missing_chart_yaml() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/starters/bare/values.yaml", "");
        let creator = StarterCreator::new(fs, "/starters");
        let meta = ChartMetadata::from_values("x", &Value::empty_map());
        let err = creator
            .create_from(&meta, Path::new("/work"), Path::new("/starters/bare"))
            .unwrap_err();
        assert!(matches!(err, ArchetypeError::ScaffoldCreation { .. }));
        assert!(err.to_string().contains("starter has no Chart.yaml"));
    }

    #[test]
    fn test_missing_starter() {
        let creator = StarterCreator::new(Arc::new(MemoryFileSystem::new()), "/starters");
        let meta = ChartMetadata::from_values("x", &Value::empty_map());
        let err = creator
            .create_from(&meta, Path::new("/work"), Path::new("/starters/none"))
            .unwrap_err();
        assert!(err.to_string().contains("starter directory does not exist"));
    }

    #[test]
    fn test_invalid_values_after_replace() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/s/Chart.yaml", "name: s\n");
        fs.insert("/s/values.yaml", "a: [<CHARTNAME>\n");
        let creator = StarterCreator::new(fs, "/starters");
        let meta = ChartMetadata::from_values("x", &Value::empty_map());
        let err = creator
            .create_from(&meta, Path::new("/w"), Path::new("/s"))
            .unwrap_err();
        assert!(err.to_string().contains("transforming values file"));
    }
}
