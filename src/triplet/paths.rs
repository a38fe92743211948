//! Filesystem layout of a vcpkg install root.
//!
//! ```text
//! <root>/
//!   vcpkg[.exe]
//!   bootstrap-vcpkg.{bat,sh}
//!   triplets/<triplet>.cmake
//!   triplets/community/<triplet>.cmake
//!   installed/vcpkg/info/<package>_<version>_<triplet>.list
//!   installed/<triplet>/{lib,bin,include,tools}
//! ```
//!
//! Every path is derived from the root and the triplet name; nothing here is
//! stored separately or mutated.

use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use super::Triplet;

#[cfg(windows)]
const BOOTSTRAP_SCRIPT: &str = "bootstrap-vcpkg.bat";
#[cfg(not(windows))]
const BOOTSTRAP_SCRIPT: &str = "bootstrap-vcpkg.sh";

/// A vcpkg checkout: executable, bootstrap script and installed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoot {
    root: PathBuf,
}

impl InstallRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn exe(&self) -> PathBuf {
        self.root.join(format!("vcpkg{EXE_SUFFIX}"))
    }

    pub fn bootstrap_script(&self) -> PathBuf {
        self.root.join(BOOTSTRAP_SCRIPT)
    }

    pub fn installed(&self) -> PathBuf {
        self.root.join("installed")
    }

    pub fn triplets(&self) -> PathBuf {
        self.root.join("triplets")
    }

    pub fn community_triplets(&self) -> PathBuf {
        self.triplets().join("community")
    }

    /// Directory holding one `.list` manifest per installed package/triplet.
    pub fn info(&self) -> PathBuf {
        self.installed().join("vcpkg").join("info")
    }

    /// Layout for one triplet under this root.
    pub fn for_triplet<'a>(&'a self, triplet: &'a Triplet) -> TripletPaths<'a> {
        TripletPaths {
            root: self,
            triplet,
        }
    }
}

/// Paths of one triplet inside an [`InstallRoot`].
#[derive(Debug, Clone, Copy)]
pub struct TripletPaths<'a> {
    root: &'a InstallRoot,
    triplet: &'a Triplet,
}

impl<'a> TripletPaths<'a> {
    pub fn root(&self) -> &'a InstallRoot {
        self.root
    }

    pub fn triplet(&self) -> &'a Triplet {
        self.triplet
    }

    pub fn info(&self) -> PathBuf {
        self.root.info()
    }

    pub fn installed(&self) -> PathBuf {
        self.root.installed().join(self.triplet.name())
    }

    pub fn lib(&self) -> PathBuf {
        self.installed().join("lib")
    }

    pub fn bin(&self) -> PathBuf {
        self.installed().join("bin")
    }

    pub fn include(&self) -> PathBuf {
        self.installed().join("include")
    }

    pub fn tools(&self) -> PathBuf {
        self.installed().join("tools")
    }

    /// Path of an executable built for this triplet, e.g. `tools/protobuf/protoc`.
    pub fn tool(&self, package: &str, name: &str) -> PathBuf {
        self.tools().join(package).join(format!("{name}{EXE_SUFFIX}"))
    }

    pub fn is_official(&self) -> bool {
        self.triplet_file_in(&self.root.triplets()).is_file()
    }

    pub fn is_community(&self) -> bool {
        self.triplet_file_in(&self.root.community_triplets()).is_file()
    }

    /// The triplet's `.cmake` definition: the official one when present,
    /// otherwise the community one (which may not exist either).
    pub fn triplet_file(&self) -> PathBuf {
        if self.is_official() {
            self.triplet_file_in(&self.root.triplets())
        } else {
            self.triplet_file_in(&self.root.community_triplets())
        }
    }

    fn triplet_file_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.cmake", self.triplet.name()))
    }
}
