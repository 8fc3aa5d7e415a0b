//! Resolution of the configuration tree from values files and `--set` flags

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::fs::FileSystem;
use crate::strvals::{self, StrvalsError};
use crate::templates::Value;

/// Errors raised while merging values
#[derive(Debug, Error)]
pub enum ValuesError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse {}: top level must be a map, found {found}", path.display())]
    NotAMap { path: PathBuf, found: &'static str },

    #[error("failed parsing {flag} data: {source}")]
    Set {
        flag: &'static str,
        #[source]
        source: StrvalsError,
    },

    #[error("remote values are not supported: {0}")]
    Remote(String),
}

/// Values sources given on the command line, applied in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuesOptions {
    /// `-f/--values` files, merged left to right
    pub value_files: Vec<String>,
    /// `--set` expressions
    pub values: Vec<String>,
    /// `--set-string` expressions
    pub string_values: Vec<String>,
    /// `--set-file` expressions
    pub file_values: Vec<String>,
}

impl ValuesOptions {
    /// Merge every source into a single tree.
    ///
    /// Later sources override earlier ones; maps from values files merge
    /// recursively, anything else replaces. A location of `-` reads stdin.
    pub fn merge_values(&self, fs: &dyn FileSystem) -> Result<Value, ValuesError> {
        let mut base = BTreeMap::new();

        for location in &self.value_files {
            let bytes = read_location(fs, location)?;
            let path = PathBuf::from(location);
            let current = parse_values_document(&path, &bytes)?;
            debug!(file = %location, keys = current.len(), "merging values file");
            base = merge_maps(base, current);
        }

        for expr in &self.values {
            strvals::parse_into(expr, &mut base)
                .map_err(|source| ValuesError::Set { flag: "--set", source })?;
        }

        for expr in &self.string_values {
            strvals::parse_into_string(expr, &mut base).map_err(|source| ValuesError::Set {
                flag: "--set-string",
                source,
            })?;
        }

        for expr in &self.file_values {
            let reader = |raw: &str| -> Result<Value, String> {
                let bytes = read_location(fs, raw).map_err(|e| e.to_string())?;
                Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };
            strvals::parse_into_with(expr, &mut base, &reader).map_err(|source| {
                ValuesError::Set {
                    flag: "--set-file",
                    source,
                }
            })?;
        }

        Ok(Value::Map(base))
    }
}

fn read_location(fs: &dyn FileSystem, location: &str) -> Result<Vec<u8>, ValuesError> {
    if location.trim() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|source| ValuesError::Read {
                path: PathBuf::from("-"),
                source,
            })?;
        return Ok(buf);
    }
    if is_remote(location) {
        return Err(ValuesError::Remote(location.to_string()));
    }
    let path = Path::new(location);
    fs.read(path).map_err(|source| ValuesError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn is_remote(location: &str) -> bool {
    match location.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Parse one YAML values document. An empty document is an empty map.
pub fn parse_values_document(
    path: &Path,
    bytes: &[u8],
) -> Result<BTreeMap<String, Value>, ValuesError> {
    let doc: serde_yaml::Value =
        serde_yaml::from_slice(bytes).map_err(|source| ValuesError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
    match Value::from(doc) {
        Value::Nil => Ok(BTreeMap::new()),
        Value::Map(map) => Ok(map),
        other => Err(ValuesError::NotAMap {
            path: path.to_path_buf(),
            found: other.type_name(),
        }),
    }
}

/// Merge `overlay` into `base`; nested maps merge, other values replace.
pub fn merge_maps(
    mut base: BTreeMap<String, Value>,
    overlay: BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    for (key, value) in overlay {
        let merged = match (base.remove(&key), value) {
            (Some(Value::Map(existing)), Value::Map(incoming)) => {
                Value::Map(merge_maps(existing, incoming))
            }
            (_, value) => value,
        };
        base.insert(key, merged);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn yaml(src: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(src).unwrap())
    }

    #[test]
    fn test_files_deep_merge() {
        let fs = MemoryFileSystem::new();
        fs.insert("/v/a.yaml", "image: {repo: nginx, tag: latest}\nports: [80]\n");
        fs.insert("/v/b.yaml", "image: {tag: \"1.25\"}\nports: [443]\n");
        let opts = ValuesOptions {
            value_files: vec!["/v/a.yaml".into(), "/v/b.yaml".into()],
            ..Default::default()
        };
        assert_eq!(
            opts.merge_values(&fs).unwrap(),
            yaml("image: {repo: nginx, tag: \"1.25\"}\nports: [443]\n")
        );
    }

    #[test]
    fn test_source_precedence() {
        let fs = MemoryFileSystem::new();
        fs.insert("/v/a.yaml", "name: file\nreplicas: 1\n");
        fs.insert("/v/motd.txt", "hello\n");
        let opts = ValuesOptions {
            value_files: vec!["/v/a.yaml".into()],
            values: vec!["name=set,replicas=2".into()],
            string_values: vec!["replicas=3".into()],
            file_values: vec!["motd=/v/motd.txt".into()],
        };
        assert_eq!(
            opts.merge_values(&fs).unwrap(),
            yaml("name: set\nreplicas: \"3\"\nmotd: \"hello\\n\"\n")
        );
    }

    #[test]
    fn test_empty_document_is_empty_map() {
        let fs = MemoryFileSystem::new();
        fs.insert("/v/empty.yaml", "");
        let opts = ValuesOptions {
            value_files: vec!["/v/empty.yaml".into()],
            ..Default::default()
        };
        assert_eq!(opts.merge_values(&fs).unwrap(), Value::empty_map());
    }

    #[test]
    fn test_errors() {
        let fs = MemoryFileSystem::new();
        fs.insert("/v/list.yaml", "- a\n- b\n");
        let remote = ValuesOptions {
            value_files: vec!["https://example.com/values.yaml".into()],
            ..Default::default()
        };
        assert!(matches!(remote.merge_values(&fs), Err(ValuesError::Remote(_))));

        let list = ValuesOptions {
            value_files: vec!["/v/list.yaml".into()],
            ..Default::default()
        };
        assert!(matches!(list.merge_values(&fs), Err(ValuesError::NotAMap { .. })));

        let missing = ValuesOptions {
            value_files: vec!["/v/none.yaml".into()],
            ..Default::default()
        };
        assert!(matches!(missing.merge_values(&fs), Err(ValuesError::Read { .. })));

        let bad_set = ValuesOptions {
            values: vec!["name".into()],
            ..Default::default()
        };
        assert_eq!(
            bad_set.merge_values(&fs).unwrap_err().to_string(),
            "failed parsing --set data: key \"name\" has no value"
        );
    }

    #[test]
    fn test_missing_set_file() {
        let fs = MemoryFileSystem::new();
        let opts = ValuesOptions {
            file_values: vec!["cert=/nope".into()],
            ..Default::default()
        };
        let err = opts.merge_values(&fs).unwrap_err();
        assert!(err.to_string().starts_with("failed parsing --set-file data: failed to read /nope"));
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://x"));
        assert!(is_remote("oci+https://x"));
        assert!(!is_remote("/abs/values.yaml"));
        assert!(!is_remote("./a://b"));
    }
}
