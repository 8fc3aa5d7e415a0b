//! File system port and its implementations
//!
//! Every component that touches the chart directory receives an
//! `Arc<dyn FileSystem>` so tests can run against [`MemoryFileSystem`]
//! while the CLI uses [`OsFileSystem`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// A directory listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// Final path component
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// Blocking file operations used by the scaffolder
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Check if a file or directory exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if `path` is an existing directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Read file contents as bytes
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read file contents as UTF-8; invalid UTF-8 is an `InvalidData` error
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Truncate and write a file. The parent directory must exist.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Delete a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// List direct children of a directory, sorted by name
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

/// The real file system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            entries.push(DirEntry {
                path: entry.path(),
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryState {
    fn is_dir(&self, path: &Path) -> bool {
        is_root(path) || self.dirs.contains(path)
    }
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

/// In-memory file system for tests
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: RwLock<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a file, creating missing parent directories first
    pub fn insert(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.state.write();
        if let Some(parent) = path.parent() {
            for ancestor in parent.ancestors() {
                if !is_root(ancestor) {
                    state.dirs.insert(ancestor.to_path_buf());
                }
            }
        }
        state
            .files
            .insert(path.to_path_buf(), contents.as_ref().to_vec());
    }

    /// All file paths currently stored
    pub fn files(&self) -> Vec<PathBuf> {
        self.state.read().files.keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.read();
        state.files.contains_key(path) || state.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.read().is_dir(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.state.read();
        if state.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: is a directory", path.display()),
            ));
        }
        state.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.write();
        if state.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: is a directory", path.display()),
            ));
        }
        let parent_exists = path.parent().map_or(true, |p| state.is_dir(p));
        if !parent_exists {
            return Err(not_found(path));
        }
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.state
            .write()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.write();
        for ancestor in path.ancestors() {
            if state.files.contains_key(ancestor) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{}: not a directory", ancestor.display()),
                ));
            }
        }
        for ancestor in path.ancestors() {
            if !is_root(ancestor) {
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let state = self.state.read();
        if !state.is_dir(path) {
            return Err(not_found(path));
        }
        let files = state.files.keys().map(|p| (p, false));
        let dirs = state.dirs.iter().map(|p| (p, true));
        let mut entries: Vec<DirEntry> = files
            .chain(dirs)
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, is_dir)| {
                Some(DirEntry {
                    path: p.clone(),
                    name: p.file_name()?.to_string_lossy().into_owned(),
                    is_dir,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_write_requires_parent() {
        let fs = MemoryFileSystem::new();
        assert!(fs.write(Path::new("/a/b.txt"), b"x").is_err());
        fs.create_dir_all(Path::new("/a")).unwrap();
        fs.write(Path::new("/a/b.txt"), b"x").unwrap();
        assert_eq!(fs.read(Path::new("/a/b.txt")).unwrap(), b"x");
    }

    #[test]
    fn test_memory_read_dir_sorted() {
        let fs = MemoryFileSystem::new();
        fs.insert("/c/zeta.yaml", "z");
        fs.insert("/c/alpha.yaml", "a");
        fs.insert("/c/sub/nested.yaml", "n");
        let names: Vec<_> = fs
            .read_dir(Path::new("/c"))
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.is_dir))
            .collect();
        assert_eq!(
            names,
            vec![
                ("alpha.yaml".to_string(), false),
                ("sub".to_string(), true),
                ("zeta.yaml".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_memory_remove_and_exists() {
        let fs = MemoryFileSystem::new();
        fs.insert("/x/y", "1");
        assert!(fs.exists(Path::new("/x")));
        assert!(fs.is_dir(Path::new("/x")));
        fs.remove_file(Path::new("/x/y")).unwrap();
        assert!(!fs.exists(Path::new("/x/y")));
        assert!(fs.remove_file(Path::new("/x/y")).is_err());
    }

    #[test]
    fn test_non_utf8_is_invalid_data() {
        let fs = MemoryFileSystem::new();
        fs.insert("/bin", [0xff, 0xfe]);
        let err = fs.read_to_string(Path::new("/bin")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_os_read_dir_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b"), "").unwrap();
        std::fs::write(dir.path().join("a"), "").unwrap();
        let names: Vec<_> = OsFileSystem
            .read_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
