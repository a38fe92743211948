//! Preflight checks before bootstrapping vcpkg.
//!
//! `bootstrap-vcpkg.sh` downloads a prebuilt vcpkg tool and unpacks it with
//! whatever the host provides. A missing `curl` or `unzip` there surfaces as
//! a confusing script failure, so check first.
//!
//! # Example
//!
//! ```rust
//! use vcpkg_bundle::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("curl") {
//!     println!("curl not installed");
//! }
//!
//! let tools = &[("curl", "curl"), ("unzip", "unzip")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command can be found on PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools `bootstrap-vcpkg.sh` relies on.
///
/// Each tuple is (command_name, package_name).
#[cfg(not(windows))]
pub const BOOTSTRAP_TOOLS: &[(&str, &str)] = &[
    ("curl", "curl"),
    ("zip", "zip"),
    ("unzip", "unzip"),
    ("tar", "tar"),
    ("git", "git"),
];

/// `bootstrap-vcpkg.bat` only needs what ships with Windows.
#[cfg(windows)]
pub const BOOTSTRAP_TOOLS: &[(&str, &str)] = &[];

/// Check that specific tools are available.
///
/// Returns an error listing every missing tool and the package providing it.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check everything in [`BOOTSTRAP_TOOLS`].
pub fn check_bootstrap_tools() -> Result<()> {
    check_required_tools(BOOTSTRAP_TOOLS)
}
