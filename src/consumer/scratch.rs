//! Scoped ownership of directories that must not outlive a run.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A directory removed when the guard is closed or dropped
///
/// [`close`](ScratchDir::close) reports removal failures; dropping without
/// closing removes on a best-effort basis and only logs.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    released: bool,
}

impl ScratchDir {
    /// Create `path` fresh, clearing anything a previous run left there
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            debug!(path = %path.display(), "clearing stale scratch directory");
            std::fs::remove_dir_all(&path).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to clear {}: {}", path.display(), e),
                ))
            })?;
        }
        std::fs::create_dir_all(&path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create {}: {}", path.display(), e),
            ))
        })?;
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Take ownership of a path that may or may not exist yet
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    /// The guarded directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        remove_if_present(&self.path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed scratch directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to remove {}: {}", path.display(), e),
        ))),
    }
}
