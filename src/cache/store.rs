//! File-tree storage used by the render cache.
//!
//! Paths are slash-separated and relative to the store root. Parent
//! traversal (`..`) is rejected.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use tempfile::NamedTempFile;

/// Storage primitives the cache is built on.
pub trait FileStore: Send + Sync {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> io::Result<bool>;

    /// Read a whole file. Missing files are `ErrorKind::NotFound`.
    fn get(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Replace a file's contents. Readers never observe a partial write.
    fn put(&self, path: &str, contents: &[u8]) -> io::Result<()>;

    /// Last modification time, `None` when the file does not exist.
    fn modified(&self, path: &str) -> io::Result<Option<SystemTime>>;

    /// Delete a file. Missing files are not an error.
    fn delete(&self, path: &str) -> io::Result<()>;

    /// Create a directory and its parents. Existing directories are fine.
    fn make_directory(&self, path: &str) -> io::Result<()>;

    /// Delete a directory tree. Missing directories are not an error.
    fn delete_directory(&self, path: &str) -> io::Result<()>;

    /// Immediate subdirectories of `path` (empty string for the root), as
    /// store-relative paths. A missing directory has none.
    fn directories(&self, path: &str) -> io::Result<Vec<String>>;
}

/// [`FileStore`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path '{}' escapes the store root", path),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for LocalFileStore {
    fn exists(&self, path: &str) -> io::Result<bool> {
        self.resolve(path)?.try_exists()
    }

    fn get(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    fn put(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let target = self.resolve(path)?;
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        // Write-then-rename so concurrent readers see old or new, never half
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.flush()?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    }

    fn modified(&self, path: &str) -> io::Result<Option<SystemTime>> {
        match fs::metadata(self.resolve(path)?) {
            Ok(meta) => meta.modified().map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        match fs::remove_file(self.resolve(path)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn make_directory(&self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path)?)
    }

    fn delete_directory(&self, path: &str) -> io::Result<()> {
        match fs::remove_dir_all(self.resolve(path)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn directories(&self, path: &str) -> io::Result<Vec<String>> {
        let dir = self.resolve(path)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let prefix = path.trim_matches('/');
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            found.push(if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            });
        }
        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_creates_parents_and_get_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("cache"));

        store.put("a/b/c.png", b"bytes").unwrap();

        assert!(store.exists("a/b/c.png").unwrap());
        assert_eq!(store.get("a/b/c.png").unwrap(), b"bytes");
        assert!(store.modified("a/b/c.png").unwrap().is_some());
    }

    #[test]
    fn test_put_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.put("x.png", b"one").unwrap();
        store.put("x.png", b"two").unwrap();
        assert_eq!(store.get("x.png").unwrap(), b"two");
    }

    #[test]
    fn test_missing_paths_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("nowhere"));

        assert!(!store.exists("a").unwrap());
        assert_eq!(store.modified("a.png").unwrap(), None);
        store.delete("a.png").unwrap();
        store.delete_directory("a").unwrap();
        assert!(store.directories("").unwrap().is_empty());
        assert_eq!(
            store.get("a.png").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_directories_lists_subdirectories_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.make_directory("b/one").unwrap();
        store.make_directory("a").unwrap();
        store.make_directory("a").unwrap(); // idempotent
        store.put("file.txt", b"").unwrap();

        assert_eq!(store.directories("").unwrap(), vec!["a", "b"]);
        assert_eq!(store.directories("b").unwrap(), vec!["b/one"]);
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let err = store.put("../escape.png", b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
