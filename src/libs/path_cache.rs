//! Cross-run cache of the resolved ansible repo path.
//!
//! A deliberately tiny key-value store: one file (`<root>/.ansible_path`),
//! one value. Read at most once at startup, written at most once when the
//! ansible installer resolves its checkout. Staleness rule: the path on
//! disk always wins over a config-supplied path once cached.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct PathCache {
    file: PathBuf,
}

impl PathCache {
    pub fn new(workdir_root: &Path) -> Self {
        PathCache {
            file: workdir_root.join(".ansible_path"),
        }
    }

    /// Returns the cached path, or `None` when nothing was cached yet or
    /// the file only holds whitespace.
    pub fn load(&self) -> Option<PathBuf> {
        let text = fs::read_to_string(&self.file).ok()?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(PathBuf::from(trimmed))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(&self.file, path.to_string_lossy().as_bytes())
    }
}
