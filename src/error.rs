//! Error taxonomy for the bundling pipeline.
//!
//! Everything fallible returns `anyhow::Result`; the variants here are the
//! conditions a caller may want to tell apart (via `downcast_ref`), wrapped
//! in context the same way any other error is.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::triplet::{Arch, Platform};

#[derive(Debug, Error)]
pub enum BundleError {
    /// No triplet exists for the requested platform/architecture pair.
    #[error("unsupported {role} platform '{platform}' with architecture '{arch}'")]
    UnsupportedPlatform {
        role: &'static str,
        platform: Platform,
        arch: Arch,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An install action finished but the file it should produce is missing.
    #[error("failed at install of: {artifact} (expected at {})", path.display())]
    Provisioning { artifact: String, path: PathBuf },

    #[error("{package} is not installed for triplet {triplet}")]
    NotInstalled { package: String, triplet: String },

    #[error("failed to start '{}': {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' exited with {status}{}", program.display(), format_output(output))]
    ProcessFailed {
        program: PathBuf,
        status: ExitStatus,
        output: String,
    },

    #[error("vcpkg root is in use by another build (lock held on {})", path.display())]
    Locked { path: PathBuf },
}

fn format_output(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(":\n{output}")
    }
}
