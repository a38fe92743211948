//! End-to-end run against one vcpkg root.
//!
//! - [`outputs`] - the result handed to the host build
//!
//! ```text
//! lock root
//!   -> bootstrap vcpkg
//!   -> install host tools, pin host/target triplet settings
//!   -> depend-info per package, install packages for the target
//!   -> locate manifests, classify libraries
//!   -> generate protocol bindings (when definitions exist)
//!   -> BuildOutputs
//! ```
//!
//! Everything runs sequentially; the first failure aborts the run.

pub mod outputs;

use anyhow::{Context, Result};
use tracing::info;

use crate::bootstrap::ensure_vcpkg;
use crate::classify::{classify, ArtifactBundle};
use crate::config::BundleConfig;
use crate::error::BundleError;
use crate::installed::{locate_manifests, InstalledManifest};
use crate::lock::InstallLock;
use crate::process::ensure_exists;
use crate::protoc::{generate, GeneratedSources, ProtocJob, ProtocToolchain};
use crate::resolver::{resolve_packages, PackageSet};
use crate::triplet::patch::{pin_triplet_settings, PatchOutcome};
use crate::triplet::paths::{InstallRoot, TripletPaths};
use crate::triplet::{detect_host, Triplet};
use crate::vcpkg::{package_spec, Vcpkg};

pub use outputs::{BuildOutputs, RunResults, RuntimeDependency};

/// Libraries per log line.
const LIBS_PER_LINE: usize = 10;

/// Host and target triplets for `config`.
///
/// Fails with [`BundleError::UnsupportedPlatform`] before anything touches
/// the filesystem or runs a process.
pub fn resolve_triplets(config: &BundleConfig) -> Result<(Triplet, Triplet)> {
    let target = config.target;
    let target_triplet = Triplet::for_target(target.platform, target.arch, config.linkage)
        .ok_or(BundleError::UnsupportedPlatform {
            role: "target",
            platform: target.platform,
            arch: target.arch,
        })?;

    let (platform, arch) = match config.host {
        Some(host) => (host.platform, host.arch),
        None => detect_host().ok_or_else(|| {
            BundleError::InvalidConfig(format!(
                "cannot detect host platform ({}/{}); set [host] explicitly",
                std::env::consts::OS,
                std::env::consts::ARCH
            ))
        })?,
    };
    let host_triplet = Triplet::for_host(platform, config.linkage).ok_or(
        BundleError::UnsupportedPlatform {
            role: "host",
            platform,
            arch,
        },
    )?;

    Ok((host_triplet, target_triplet))
}

/// One configured run.
#[derive(Debug)]
pub struct Pipeline<'c> {
    config: &'c BundleConfig,
    root: InstallRoot,
    host: Triplet,
    target: Triplet,
}

impl<'c> Pipeline<'c> {
    pub fn new(config: &'c BundleConfig) -> Result<Self> {
        let (host, target) = resolve_triplets(config)?;
        info!(host = %host, target = %target, "resolved triplets");
        Ok(Self {
            config,
            root: InstallRoot::new(&config.vcpkg_root),
            host,
            target,
        })
    }

    pub fn host(&self) -> &Triplet {
        &self.host
    }

    pub fn target(&self) -> &Triplet {
        &self.target
    }

    pub fn root(&self) -> &InstallRoot {
        &self.root
    }

    pub fn host_paths(&self) -> TripletPaths<'_> {
        self.root.for_triplet(&self.host)
    }

    pub fn target_paths(&self) -> TripletPaths<'_> {
        self.root.for_triplet(&self.target)
    }

    /// Take the root's lock; held until the guard drops.
    pub fn lock(&self) -> Result<InstallLock> {
        ensure_exists(self.root.path(), "vcpkg root")?;
        InstallLock::acquire(&self.root)
    }

    /// Bootstrap vcpkg, install the host tools and pin triplet settings.
    pub fn prepare(&self) -> Result<()> {
        ensure_vcpkg(&self.root)?;

        let vcpkg = Vcpkg::new(&self.root);
        if !self.config.host_tools.is_empty() {
            vcpkg
                .install(&self.host, &self.config.host_tools)
                .context("installing host tools")?;
        }

        self.pin_settings(self.host_paths())?;
        if self.host != self.target {
            self.pin_settings(self.target_paths())?;
        }
        Ok(())
    }

    fn pin_settings(&self, paths: TripletPaths<'_>) -> Result<PatchOutcome> {
        let file = paths.triplet_file();
        pin_triplet_settings(&file, &self.config.triplet_settings)
            .with_context(|| format!("pinning settings of triplet {}", paths.triplet()))
    }

    /// Transitive package set of the configured packages on the target.
    pub fn resolve(&self) -> Result<PackageSet> {
        resolve_packages(&Vcpkg::new(&self.root), &self.target, &self.config.packages)
    }

    /// Install the configured packages for the target.
    pub fn install(&self) -> Result<()> {
        let specs: Vec<String> = self
            .config
            .packages
            .iter()
            .map(|p| package_spec(p, &self.target))
            .collect();
        info!(
            "installing [{}] for {} with host {}",
            self.config.packages.join(" "),
            self.target,
            self.host
        );
        Vcpkg::new(&self.root).install(&self.host, &specs)
    }

    /// Manifests and libraries of `packages` on the target.
    pub fn collect(&self, packages: &PackageSet) -> Result<(Vec<InstalledManifest>, ArtifactBundle)> {
        let target = self.target_paths();
        let manifests = locate_manifests(&target, packages)?;
        let artifacts = classify(&manifests, self.target.name())?;
        log_artifacts(&target, &artifacts);
        Ok((manifests, artifacts))
    }

    /// Regenerate protocol bindings with the host's protoc.
    ///
    /// `None` when no `[protocol]` section is configured or its definitions
    /// directory does not exist.
    pub fn generate_bindings(&self) -> Result<Option<GeneratedSources>> {
        let Some(protocol) = &self.config.protocol else {
            return Ok(None);
        };
        if !protocol.definitions_dir.is_dir() {
            info!(
                dir = %protocol.definitions_dir.display(),
                "no protocol definitions directory; skipping generation"
            );
            return Ok(None);
        }

        let job = ProtocJob {
            toolchain: ProtocToolchain::from_host(&self.host_paths())?,
            definitions_dir: protocol.definitions_dir.clone(),
            output_dir: protocol.output_dir.clone(),
            includes: protocol.includes.clone(),
        };
        generate(&job).map(Some)
    }

    /// The whole pipeline, under the root's lock.
    pub fn run(&self) -> Result<BuildOutputs> {
        let _lock = self.lock()?;

        self.prepare()?;
        let packages = self.resolve()?;
        self.install()?;
        let (manifests, artifacts) = self.collect(&packages)?;
        let generated = self.generate_bindings()?;

        Ok(BuildOutputs::assemble(RunResults {
            target: self.target_paths(),
            host_triplet: self.host.name(),
            packages: &packages,
            manifests: &manifests,
            artifacts: &artifacts,
            generated: generated.as_ref(),
            outputs: &self.config.outputs,
        }))
    }
}

fn log_artifacts(target: &TripletPaths<'_>, artifacts: &ArtifactBundle) {
    info!("added header root: {}", target.include().display());

    let libs: Vec<&str> = artifacts
        .static_libraries()
        .iter()
        .map(|lib| lib.strip_suffix(".lib").unwrap_or(lib))
        .collect();
    for chunk in libs.chunks(LIBS_PER_LINE) {
        info!("lib files: [ {} ]", chunk.join(" "));
    }

    for dll in artifacts.shared_libraries() {
        info!("dll: {dll}");
    }
}
