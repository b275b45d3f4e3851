//! Concurrency-safe, lazily-populated source file cache
//!
//! One cache instance is constructed per run and passed by reference into
//! every component that needs file content; there is no ambient global state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::MetalintError;
use crate::result::Result;

/// Cached content of one source file
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the working directory when possible, for display
    pub display_path: String,
    pub content: String,
    /// Content split on `\n`, without terminators
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Fetch a 1-based line, or None when out of range
    pub fn line(&self, line: i32) -> Option<&str> {
        if line < 1 {
            return None;
        }
        self.lines.get(line as usize - 1).map(String::as_str)
    }
}

/// Path → content cache populated on first access and never invalidated
/// within a run.
///
/// Concurrent callers requesting the same path receive the same `Arc` and at
/// most one disk read happens per path: the vacant-entry holder performs the
/// read while other callers for that shard wait.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: DashMap<PathBuf, Arc<SourceFile>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
        }
    }

    /// Load a file through the cache. Read errors surface to the caller and
    /// are not cached; a later retry would re-attempt the read.
    pub fn load(&self, filename: &str) -> Result<Arc<SourceFile>> {
        let path = PathBuf::from(filename);
        if let Some(cached) = self.files.get(&path) {
            return Ok(Arc::clone(&cached));
        }
        match self.files.entry(path) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let file = Arc::new(read_source(entry.key())?);
                entry.insert(Arc::clone(&file));
                Ok(file)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(path).map_err(|e| MetalintError::io_error(path, e))?;
    let lines = content.split('\n').map(String::from).collect();
    Ok(SourceFile {
        path: path.to_path_buf(),
        display_path: display_path(path),
        content,
        lines,
    })
}

fn display_path(path: &Path) -> String {
    if let Ok(cwd) = std::env::current_dir()
        && let Ok(rel) = path.strip_prefix(&cwd)
    {
        return rel.display().to_string();
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_populates_once_and_shares() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\ntwo\n").unwrap();

        let cache = SourceCache::new();
        let first = cache.load(path.to_str().unwrap()).unwrap();
        let second = cache.load(path.to_str().unwrap()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn line_lookup_is_one_based() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "first\nsecond\n").unwrap();

        let cache = SourceCache::new();
        let file = cache.load(path.to_str().unwrap()).unwrap();
        assert_eq!(file.line(1), Some("first"));
        assert_eq!(file.line(2), Some("second"));
        assert_eq!(file.line(0), None);
        assert_eq!(file.line(-1), None);
        assert_eq!(file.line(99), None);
    }

    #[test]
    fn missing_file_surfaces_read_error() {
        let cache = SourceCache::new();
        let err = cache.load("/definitely/not/here.txt").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn concurrent_loads_share_one_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "data").unwrap();
        let cache = SourceCache::new();
        let name = path.to_str().unwrap().to_string();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let cache = &cache;
                let name = name.clone();
                scope.spawn(move || {
                    let file = cache.load(&name).unwrap();
                    assert_eq!(file.content, "data");
                });
            }
        });
        assert_eq!(cache.len(), 1);
    }
}
