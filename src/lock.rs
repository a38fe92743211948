//! Exclusive lock on a vcpkg root for the duration of a run.
//!
//! Two concurrent builds against one root would race on `vcpkg install` and
//! on the triplet files, so the second one fails fast instead of waiting.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::BundleError;
use crate::triplet::paths::InstallRoot;

pub const LOCK_FILE_NAME: &str = ".vcpkg-bundle.lock";

/// RAII guard: unlocks on drop.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Take the lock on `root`, failing with [`BundleError::Locked`] when
    /// another process holds it.
    pub fn acquire(root: &InstallRoot) -> Result<Self> {
        Self::acquire_at(&root.path().join(LOCK_FILE_NAME))
    }

    pub fn acquire_at(path: &Path) -> Result<Self> {
        // The file is left in place after release: unlinking a file another
        // process has open would let a third one lock a fresh inode.
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating lock file '{}'", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Err(BundleError::Locked {
                path: path.to_path_buf(),
            }
            .into());
        }
        debug!(path = %path.display(), "acquired install lock");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let temp = TempDir::new().unwrap();
        let root = InstallRoot::new(temp.path());

        let lock = InstallLock::acquire(&root).unwrap();
        assert_eq!(lock.path(), temp.path().join(LOCK_FILE_NAME));

        let err = InstallLock::acquire(&root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BundleError>(),
            Some(BundleError::Locked { .. })
        ));

        drop(lock);
        InstallLock::acquire(&root).unwrap();
    }

    #[test]
    fn test_missing_root_fails() {
        let root = InstallRoot::new("/nonexistent/vcpkg-root");
        let err = InstallLock::acquire(&root).unwrap_err();
        assert!(err.to_string().contains("creating lock file"));
    }
}
