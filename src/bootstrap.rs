//! On-demand provisioning.
//!
//! [`ensure_installed`] runs an install action only when its product is
//! missing, then insists the product exists. [`ensure_vcpkg`] applies it to
//! the vcpkg executable itself.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::error::BundleError;
use crate::preflight;
use crate::process::{ensure_exists, run};
use crate::triplet::paths::InstallRoot;

/// Outcome of an ensure operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyInstalled,
    InstalledNow,
}

/// Run `install` unless `path` already exists; afterwards `path` must exist.
pub fn ensure_installed<F>(path: &Path, install: F) -> Result<EnsureOutcome>
where
    F: FnOnce() -> Result<()>,
{
    if path.exists() {
        debug!(path = %path.display(), "already installed");
        return Ok(EnsureOutcome::AlreadyInstalled);
    }

    install()?;

    if !path.exists() {
        let artifact = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        return Err(BundleError::Provisioning {
            artifact,
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(EnsureOutcome::InstalledNow)
}

/// Make sure the vcpkg executable exists under `root`, bootstrapping once.
pub fn ensure_vcpkg(root: &InstallRoot) -> Result<EnsureOutcome> {
    ensure_installed(&root.exe(), || {
        info!(root = %root.path().display(), "bootstrapping vcpkg");
        let script = root.bootstrap_script();
        ensure_exists(&script, "vcpkg bootstrap script")?;
        preflight::check_bootstrap_tools().context("checking vcpkg bootstrap prerequisites")?;
        run(&script, ["-disableMetrics"])
            .with_context(|| format!("running '{}'", script.display()))
    })
}
