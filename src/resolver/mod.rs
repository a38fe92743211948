//! Transitive dependency resolution through `vcpkg depend-info`.
//!
//! - [`depend_info`] - report parser
//!
//! For each top-level package the report is parsed into a set, the exclusion
//! rules are applied, and the per-package sets are unioned into one
//! [`PackageSet`] for the run. The rules, in order:
//!
//! 1. names containing [`INFRASTRUCTURE_MARKER`] are vcpkg's own helper
//!    ports (`vcpkg-cmake`, `vcpkg-cmake-config`, ...) and are dropped;
//! 2. the empty name left by trailing commas is dropped;
//! 3. on UWP/ARM64 triplets, [`UWP_ARM64_EXCLUDED`] is dropped.

pub mod depend_info;

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::triplet::Triplet;
use crate::vcpkg::Vcpkg;

/// Resolved package names for one triplet, sorted and deduplicated.
pub type PackageSet = BTreeSet<String>;

/// Substring identifying vcpkg's own infrastructure ports.
pub const INFRASTRUCTURE_MARKER: &str = "vcpkg";

/// Packages that must not be linked on `arm64-uwp*` triplets.
pub const UWP_ARM64_EXCLUDED: &[&str] = &["c-ares"];

pub fn is_infrastructure(package: &str) -> bool {
    package.contains(INFRASTRUCTURE_MARKER)
}

/// Apply the exclusion rules to a parsed set.
pub fn apply_exclusions(packages: &mut PackageSet, triplet: &Triplet) {
    packages.retain(|p| !is_infrastructure(p));
    packages.remove("");
    if triplet.is_uwp_arm64() {
        for excluded in UWP_ARM64_EXCLUDED {
            if packages.remove(*excluded) {
                debug!(package = excluded, triplet = %triplet, "excluded for UWP/ARM64");
            }
        }
    }
}

/// Dependencies of `report` after exclusions, as [`resolve_package`] sees them.
pub fn packages_from_report(report: &str, triplet: &Triplet) -> Result<PackageSet> {
    let mut packages = depend_info::parse_report(report, triplet.name())?;
    apply_exclusions(&mut packages, triplet);
    Ok(packages)
}

/// Transitive closure of one top-level package.
pub fn resolve_package(vcpkg: &Vcpkg, triplet: &Triplet, package: &str) -> Result<PackageSet> {
    let report = vcpkg.depend_info(package, triplet)?;
    packages_from_report(&report, triplet)
        .with_context(|| format!("parsing dependency report of '{package}'"))
}

/// Union of the transitive closures of every top-level package.
pub fn resolve_packages<S: AsRef<str>>(
    vcpkg: &Vcpkg,
    triplet: &Triplet,
    top_level: &[S],
) -> Result<PackageSet> {
    let mut packages = PackageSet::new();
    for package in top_level {
        packages.extend(resolve_package(vcpkg, triplet, package.as_ref())?);
    }
    info!(
        triplet = %triplet,
        "necessary packages: [{}]",
        packages.iter().cloned().collect::<Vec<_>>().join(" ")
    );
    Ok(packages)
}
