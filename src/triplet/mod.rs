//! Triplets: the (platform, architecture, linkage) tag vcpkg installs under.
//!
//! - [`Triplet`] - the value type, e.g. `x64-windows-static-md`
//! - [`paths`] - install root and per-triplet directory layout
//! - [`patch`] - pinning build type and toolset in a triplet's `.cmake` file
//!
//! The resolver functions never fail: an unsupported combination is reported
//! as `None` and the caller decides that this is fatal.

pub mod patch;
pub mod paths;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::BundleError;

/// Triplets starting with this prefix get the UWP/ARM64 exclusion policy.
pub const UWP_ARM64_PREFIX: &str = "arm64-uwp";

/// Target platform as the host build names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Win64,
    HoloLens,
    Linux,
    Mac,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win64 => "win64",
            Self::HoloLens => "hololens",
            Self::Linux => "linux",
            Self::Mac => "mac",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win64" | "windows" => Ok(Self::Win64),
            "hololens" => Ok(Self::HoloLens),
            "linux" => Ok(Self::Linux),
            "mac" | "macos" => Ok(Self::Mac),
            other => Err(BundleError::InvalidConfig(format!(
                "unknown platform '{other}'; expected one of: win64, hololens, linux, mac"
            ))),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Ok(Self::X64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            other => Err(BundleError::InvalidConfig(format!(
                "unknown architecture '{other}'; expected 'x64' or 'arm64'"
            ))),
        }
    }
}

/// Library linkage and CRT variant, appended to the base tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum Linkage {
    /// Shared libraries, no suffix (`x64-windows`).
    #[serde(rename = "dynamic")]
    Dynamic,
    /// Static libraries, static CRT (`-static`).
    #[serde(rename = "static")]
    Static,
    /// Static libraries, dynamic CRT (`-static-md`).
    #[serde(rename = "static-md")]
    #[default]
    StaticMd,
}

impl Linkage {
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Self::Dynamic => None,
            Self::Static => Some("static"),
            Self::StaticMd => Some("static-md"),
        }
    }
}

impl FromStr for Linkage {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamic" | "" => Ok(Self::Dynamic),
            "static" => Ok(Self::Static),
            "static-md" => Ok(Self::StaticMd),
            other => Err(BundleError::InvalidConfig(format!(
                "unknown linkage '{other}'; expected one of: dynamic, static, static-md"
            ))),
        }
    }
}

/// A vcpkg triplet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triplet {
    base: String,
    linkage: Linkage,
    name: String,
}

impl Triplet {
    pub fn new(base: impl Into<String>, linkage: Linkage) -> Self {
        let base = base.into();
        let name = match linkage.suffix() {
            Some(suffix) => format!("{base}-{suffix}"),
            None => base.clone(),
        };
        Self {
            base,
            linkage,
            name,
        }
    }

    /// Triplet for a build target, if the combination is supported.
    pub fn for_target(platform: Platform, arch: Arch, linkage: Linkage) -> Option<Self> {
        target_base(platform, arch).map(|base| Self::new(base, linkage))
    }

    /// Triplet for the machine running the build tools.
    pub fn for_host(platform: Platform, linkage: Linkage) -> Option<Self> {
        host_base(platform).map(|base| Self::new(base, linkage))
    }

    /// Full tag, e.g. `arm64-uwp-static-md`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn is_uwp_arm64(&self) -> bool {
        self.name.starts_with(UWP_ARM64_PREFIX)
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Base triplet tag for a target platform/architecture pair.
pub fn target_base(platform: Platform, arch: Arch) -> Option<&'static str> {
    match (platform, arch) {
        (Platform::Win64, Arch::X64) => Some("x64-windows"),
        (Platform::HoloLens, Arch::Arm64) => Some("arm64-uwp"),
        _ => None,
    }
}

/// Base triplet tag for the build host. Only the platform decides.
pub fn host_base(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Win64 => Some("x64-windows"),
        Platform::HoloLens => Some("arm64-uwp"),
        Platform::Linux | Platform::Mac => None,
    }
}

/// Platform and architecture of the running process.
pub fn detect_host() -> Option<(Platform, Arch)> {
    let platform = match std::env::consts::OS {
        "windows" => Platform::Win64,
        "linux" => Platform::Linux,
        "macos" => Platform::Mac,
        _ => return None,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => Arch::X64,
        "aarch64" => Arch::Arm64,
        _ => return None,
    };
    Some((platform, arch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_mapping() {
        assert_eq!(target_base(Platform::Win64, Arch::X64), Some("x64-windows"));
        assert_eq!(
            target_base(Platform::HoloLens, Arch::Arm64),
            Some("arm64-uwp")
        );
        assert_eq!(target_base(Platform::HoloLens, Arch::X64), None);
        assert_eq!(target_base(Platform::Linux, Arch::X64), None);
    }

    #[test]
    fn test_host_mapping() {
        assert_eq!(host_base(Platform::Win64), Some("x64-windows"));
        assert_eq!(host_base(Platform::HoloLens), Some("arm64-uwp"));
        assert_eq!(host_base(Platform::Mac), None);
    }

    #[test]
    fn test_triplet_names() {
        let t = Triplet::for_target(Platform::Win64, Arch::X64, Linkage::StaticMd).unwrap();
        assert_eq!(t.name(), "x64-windows-static-md");
        assert_eq!(t.base(), "x64-windows");
        assert!(!t.is_uwp_arm64());

        let t = Triplet::for_target(Platform::HoloLens, Arch::Arm64, Linkage::Dynamic).unwrap();
        assert_eq!(t.to_string(), "arm64-uwp");
        assert!(t.is_uwp_arm64());

        let t = Triplet::new("arm64-uwp", Linkage::StaticMd);
        assert!(t.is_uwp_arm64());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("Win64".parse::<Platform>().unwrap(), Platform::Win64);
        assert_eq!("aarch64".parse::<Arch>().unwrap(), Arch::Arm64);
        assert_eq!("static-md".parse::<Linkage>().unwrap(), Linkage::StaticMd);
        assert!("amiga".parse::<Platform>().is_err());
        assert!("mips".parse::<Arch>().is_err());
    }

    #[test]
    fn test_detect_host_matches_consts() {
        if let Some((platform, _)) = detect_host() {
            match std::env::consts::OS {
                "windows" => assert_eq!(platform, Platform::Win64),
                "linux" => assert_eq!(platform, Platform::Linux),
                "macos" => assert_eq!(platform, Platform::Mac),
                _ => unreachable!(),
            }
        }
    }
}
