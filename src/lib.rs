//! Provision native C++ dependencies through vcpkg for a host build system.
//!
//! Given a target platform, the crate bootstraps a vcpkg checkout, installs
//! the requested packages and their transitive dependencies for the matching
//! triplet, and reports what the host build needs to consume them: include
//! roots, static libraries, runtime libraries to stage, and (optionally)
//! freshly generated protobuf/gRPC bindings.
//!
//! # Architecture
//!
//! ```text
//! config ──► pipeline
//!              │
//!              ├── triplet       platform/arch -> triplet, install-root layout
//!              │     └── patch   pin build type and toolset in triplet files
//!              ├── bootstrap     build vcpkg on first use
//!              ├── resolver      depend-info -> package set
//!              ├── installed     package set -> .list manifests
//!              ├── classify      manifests -> .lib / .dll
//!              └── protoc        .proto -> wrapped .pb.cc / .pb.h
//!
//! process, atomic, lock, preflight, error: shared plumbing
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use vcpkg_bundle::{BundleConfig, ConfigOverrides, Pipeline};
//!
//! let config = BundleConfig::load("bundle.toml".as_ref(), ConfigOverrides::default())?;
//! let outputs = Pipeline::new(&config)?.run()?;
//! outputs.write("build/vcpkg-outputs.json".as_ref())?;
//! ```

pub mod atomic;
pub mod bootstrap;
pub mod classify;
pub mod config;
pub mod error;
pub mod installed;
pub mod lock;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod protoc;
pub mod resolver;
pub mod triplet;
pub mod vcpkg;

#[cfg(test)]
mod test_support;

pub use config::{BundleConfig, ConfigOverrides};
pub use error::BundleError;
pub use pipeline::{BuildOutputs, Pipeline};
pub use triplet::{Arch, Linkage, Platform, Triplet};
