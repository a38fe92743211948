//! Write-then-rename helpers.
//!
//! Readers of a patched triplet file or a generated source never see a
//! partial write: content goes to a temporary file in the destination's own
//! directory (same filesystem) and is renamed over the original. A rewritten
//! file keeps the permissions of the file it replaces.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Mode given to files that did not exist before.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Atomically replace `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("creating directory '{}'", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in '{}'", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("writing temporary file for '{}'", path.display()))?;
    if let Some(permissions) = permissions_for(path)? {
        tmp.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("setting permissions for '{}'", path.display()))?;
    }
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("flushing temporary file for '{}'", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing '{}'", path.display()))?;
    Ok(())
}

/// Permissions the replacement of `path` should carry.
fn permissions_for(path: &Path) -> Result<Option<fs::Permissions>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(new_file_permissions()),
        Err(e) => {
            Err(e).with_context(|| format!("reading permissions of '{}'", path.display()))
        }
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

/// Remove `path` if present and create it empty.
pub fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("removing existing directory '{}'", path.display()))?;
    }
    fs::create_dir_all(path).with_context(|| format!("creating directory '{}'", path.display()))
}

/// Make a fully populated `staging` directory the new `target`.
///
/// Whatever `target` held before is discarded as a whole, so no file from an
/// earlier run survives next to the fresh ones. The old target is moved aside
/// first and put back if `staging` cannot be moved in.
pub fn swap_dir(staging: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory '{}'", parent.display()))?;
    }

    let previous = sibling_with_suffix(target, "previous");
    if previous.exists() {
        fs::remove_dir_all(&previous)
            .with_context(|| format!("removing stale directory '{}'", previous.display()))?;
    }
    let had_target = target.exists();
    if had_target {
        fs::rename(target, &previous).with_context(|| {
            format!(
                "moving '{}' -> '{}'",
                target.display(),
                previous.display()
            )
        })?;
    }

    if let Err(e) = fs::rename(staging, target) {
        if had_target {
            if let Err(restore) = fs::rename(&previous, target) {
                warn!(
                    path = %previous.display(),
                    error = %restore,
                    "could not restore previous directory"
                );
            }
        }
        return Err(e).with_context(|| {
            format!(
                "moving '{}' -> '{}'",
                staging.display(),
                target.display()
            )
        });
    }

    if had_target {
        fs::remove_dir_all(&previous)
            .with_context(|| format!("removing previous directory '{}'", previous.display()))?;
    }
    Ok(())
}

/// `<parent>/.<name>.<suffix>` next to `path`.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "generated".to_string());
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(".{name}.{suffix}"))
}

/// A scratch directory that is deleted on drop unless committed.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    committed: bool,
}

impl StagingDir {
    /// Create `path` empty, discarding anything a previous run left there.
    pub fn create(path: PathBuf) -> Result<Self> {
        recreate_dir(&path)?;
        Ok(Self {
            path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// [`swap_dir`] the staged content into `target`.
    pub fn commit(mut self, target: &Path) -> Result<()> {
        swap_dir(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
