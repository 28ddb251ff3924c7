//! The toolbox's private directory layout.
//!
//! Four absolute paths derived from one root: `root` itself, `bin` for
//! installed binaries, `storage` for per-tool state that survives runs, and
//! `tmp` for scratch space that never does. `prepare()` runs at the start of
//! every run and recreates `tmp` empty, so a run never inherits scratch
//! files from a previous (possibly crashed) run; `cleanup()` removes `tmp`
//! again at the end, success or failure.

use crate::errors::ToolboxError;
use crate::{log_debug, log_warn};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WorkDir {
    pub root: PathBuf,
    pub tmp: PathBuf,
    pub bin: PathBuf,
    pub storage: PathBuf,
}

impl WorkDir {
    pub fn new(root: &Path) -> Self {
        WorkDir {
            root: root.to_path_buf(),
            tmp: root.join("tmp"),
            bin: root.join("bin"),
            storage: root.join("storage"),
        }
    }

    /// Creates the persistent layout and recreates `tmp` empty.
    /// Delete-then-create: stale scratch from a crashed run is discarded.
    pub fn prepare(&self) -> Result<(), ToolboxError> {
        log_debug!("Workdir root is {}", self.root.display().to_string().cyan());
        fs::create_dir_all(&self.root)
            .map_err(|e| ToolboxError::Workdir(format!("create {}: {e}", self.root.display())))?;
        fs::create_dir_all(&self.bin)
            .map_err(|e| ToolboxError::Workdir(format!("create {}: {e}", self.bin.display())))?;
        fs::create_dir_all(&self.storage).map_err(|e| {
            ToolboxError::Workdir(format!("create {}: {e}", self.storage.display()))
        })?;
        if self.tmp.exists() {
            fs::remove_dir_all(&self.tmp).map_err(|e| {
                ToolboxError::Workdir(format!("clear stale {}: {e}", self.tmp.display()))
            })?;
        }
        fs::create_dir(&self.tmp)
            .map_err(|e| ToolboxError::Workdir(format!("create {}: {e}", self.tmp.display())))?;
        Ok(())
    }

    /// Removes the scratch directory. Failure to clean is logged, not fatal:
    /// the next `prepare()` clears it anyway.
    pub fn cleanup(&self) {
        if self.tmp.exists() {
            if let Err(e) = fs::remove_dir_all(&self.tmp) {
                log_warn!("Could not remove scratch dir {}: {}", self.tmp.display(), e);
            }
        }
    }

    /// Guard that cleans the scratch directory when dropped. Held by the
    /// orchestrator across the install loop so `tmp` disappears on both the
    /// success and the failure path.
    pub fn scratch_guard(&self) -> ScratchGuard<'_> {
        ScratchGuard { workdir: self }
    }
}

pub struct ScratchGuard<'a> {
    workdir: &'a WorkDir,
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        self.workdir.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prepare_creates_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("toolbox");
        let workdir = WorkDir::new(&root);
        workdir.prepare().unwrap();
        assert!(workdir.root.is_dir());
        assert!(workdir.bin.is_dir());
        assert!(workdir.storage.is_dir());
        assert!(workdir.tmp.is_dir());
    }

    #[test]
    fn prepare_clears_stale_scratch() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        workdir.prepare().unwrap();
        fs::write(workdir.tmp.join("leftover.zip"), b"stale").unwrap();

        workdir.prepare().unwrap();
        assert!(workdir.tmp.is_dir());
        assert_eq!(fs::read_dir(&workdir.tmp).unwrap().count(), 0);
    }

    #[test]
    fn cleanup_removes_tmp() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        workdir.prepare().unwrap();
        workdir.cleanup();
        assert!(!workdir.tmp.exists());
        // Idempotent when tmp is already gone.
        workdir.cleanup();
    }

    #[test]
    fn scratch_guard_cleans_on_drop() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        workdir.prepare().unwrap();
        {
            let _guard = workdir.scratch_guard();
            fs::write(workdir.tmp.join("download.part"), b"half").unwrap();
        }
        assert!(!workdir.tmp.exists());
    }
}
