//! Locate the install manifest of each resolved package.
//!
//! vcpkg records every file a package put into the install tree in
//! `installed/vcpkg/info/<package>_<version>_<triplet>.list`. The directory
//! is listed once; each package then looks for the single file matching its
//! name and the triplet.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::BundleError;
use crate::resolver::is_infrastructure;
use crate::triplet::paths::TripletPaths;

/// A package's `.list` manifest for one triplet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledManifest {
    pub package: String,
    pub path: PathBuf,
}

impl InstalledManifest {
    /// `<package>_<version>` part of the file name.
    pub fn label(&self, triplet: &str) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        stem.strip_suffix(&format!("_{triplet}"))
            .map(str::to_string)
            .unwrap_or(stem)
    }
}

/// File names in the manifest directory, sorted.
pub fn list_manifest_dir(info_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(info_dir)
        .with_context(|| format!("reading manifest directory '{}'", info_dir.display()))?
    {
        let entry = entry.with_context(|| {
            format!("iterating manifest directory '{}'", info_dir.display())
        })?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Pattern matching `<package>_<version>_<triplet>.list`, where the version
/// token contains no underscore.
pub fn manifest_pattern(package: &str, triplet: &str) -> Result<Regex> {
    let pattern = format!(
        r"^{}_[^_]*?_{}\.list$",
        regex::escape(package),
        regex::escape(triplet)
    );
    Regex::new(&pattern).with_context(|| format!("building manifest pattern for '{package}'"))
}

/// The first of `file_names` that is `package`'s manifest, if any.
pub fn find_manifest<'n>(
    file_names: &'n [String],
    package: &str,
    triplet: &str,
) -> Result<Option<&'n str>> {
    let pattern = manifest_pattern(package, triplet)?;
    Ok(file_names
        .iter()
        .map(String::as_str)
        .find(|name| pattern.is_match(name)))
}

/// Manifests of `packages` on the triplet of `paths`, in package order.
///
/// A package without a manifest is an error unless it is an infrastructure
/// port, which depend-info may mention without it ever being installed.
pub fn locate_manifests<'p, I>(paths: &TripletPaths, packages: I) -> Result<Vec<InstalledManifest>>
where
    I: IntoIterator<Item = &'p String>,
{
    let info_dir = paths.info();
    let triplet = paths.triplet().name();
    let file_names = list_manifest_dir(&info_dir)?;

    let mut manifests = Vec::new();
    for package in packages {
        match find_manifest(&file_names, package, triplet)? {
            Some(name) => {
                let manifest = InstalledManifest {
                    package: package.clone(),
                    path: info_dir.join(name),
                };
                info!("{} is installed", manifest.label(triplet));
                manifests.push(manifest);
            }
            None if is_infrastructure(package) => {
                debug!(package = %package, "no manifest for infrastructure port");
            }
            None => {
                return Err(BundleError::NotInstalled {
                    package: package.clone(),
                    triplet: triplet.to_string(),
                }
                .into());
            }
        }
    }
    Ok(manifests)
}
