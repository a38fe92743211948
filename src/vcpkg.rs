//! The vcpkg command-line contract.
//!
//! Only two subcommands are used:
//!
//! - `vcpkg --vcpkg-root <root> depend-info <package>:<triplet>`
//! - `vcpkg install --recurse --host-triplet=<host> --vcpkg-root <root> <spec>...`

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use tracing::info;

use crate::process::{run, run_captured};
use crate::triplet::paths::InstallRoot;
use crate::triplet::Triplet;

/// `<package>:<triplet>`, the form vcpkg expects package arguments in.
pub fn package_spec(package: &str, triplet: &Triplet) -> String {
    format!("{}:{}", package, triplet.name())
}

/// A bootstrapped vcpkg executable under an install root.
#[derive(Debug, Clone, Copy)]
pub struct Vcpkg<'a> {
    root: &'a InstallRoot,
}

impl<'a> Vcpkg<'a> {
    pub fn new(root: &'a InstallRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &'a InstallRoot {
        self.root
    }

    /// Raw dependency report for `package` on `triplet`.
    pub fn depend_info(&self, package: &str, triplet: &Triplet) -> Result<String> {
        let spec = package_spec(package, triplet);
        let args: [&OsStr; 4] = [
            OsStr::new("--vcpkg-root"),
            self.root.path().as_os_str(),
            OsStr::new("depend-info"),
            OsStr::new(&spec),
        ];
        run_captured(&self.root.exe(), args)
            .with_context(|| format!("querying dependencies of {spec}"))
    }

    /// Install `specs` (already in `<package>[:<triplet>]` form) and
    /// everything they depend on, building host tools for `host`.
    pub fn install(&self, host: &Triplet, specs: &[String]) -> Result<()> {
        let mut args: Vec<OsString> = vec![
            "install".into(),
            "--recurse".into(),
            format!("--host-triplet={}", host.name()).into(),
            "--vcpkg-root".into(),
            self.root.path().as_os_str().to_owned(),
        ];
        args.extend(specs.iter().map(OsString::from));

        info!(specs = ?specs, host = %host, "vcpkg install");
        run(&self.root.exe(), args)
            .with_context(|| format!("installing [{}] with host {}", specs.join(" "), host))
    }
}
