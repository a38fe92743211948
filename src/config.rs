//! Pipeline configuration.
//!
//! A TOML file is read once into an immutable [`BundleConfig`], which every
//! stage borrows. Relative paths are resolved against the project root (by
//! default the directory holding the config file).
//!
//! ```toml
//! [vcpkg]
//! root = "Plugins/grpc_plugin/Source/vcpkg"
//! packages = ["grpc", "asio-grpc"]
//! linkage = "static-md"
//!
//! [target]
//! platform = "hololens"
//! arch = "arm64"
//!
//! [protocol]
//! output_dir = "Source/ar_integration/Generated"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BundleError;
use crate::protoc::IsolationIncludes;
use crate::triplet::patch::TripletSettings;
use crate::triplet::{Arch, Linkage, Platform};

/// Environment variable consulted when no root is configured.
pub const VCPKG_ROOT_ENV: &str = "VCPKG_ROOT";

const DEFAULT_HOST_TOOLS: &[&str] = &["vcpkg-cmake"];
const DEFAULT_DEFINITIONS_DIR: &str = "Proto";
const DEFAULT_RUNTIME_DESTINATION: &str = "$(TargetOutputDir)";

/// A platform/architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformSpec {
    pub platform: Platform,
    pub arch: Arch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub definitions_dir: PathBuf,
    pub output_dir: PathBuf,
    pub includes: IsolationIncludes,
}

/// Values passed through to the host build untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Prefix for runtime library destinations, e.g. `$(TargetOutputDir)`.
    pub runtime_destination: String,
    pub definitions: Vec<String>,
    pub system_libraries: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BundleConfig {
    pub project_root: PathBuf,
    pub vcpkg_root: PathBuf,
    /// Top-level packages to install for the target.
    pub packages: Vec<String>,
    /// Ports installed for the host triplet before anything else.
    pub host_tools: Vec<String>,
    pub linkage: Linkage,
    pub triplet_settings: TripletSettings,
    pub target: PlatformSpec,
    /// `None` means detect from the running process.
    pub host: Option<PlatformSpec>,
    pub protocol: Option<ProtocolConfig>,
    pub outputs: OutputConfig,
}

/// Values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project_root: Option<PathBuf>,
    pub vcpkg_root: Option<PathBuf>,
    /// Value of [`VCPKG_ROOT_ENV`], used only when nothing else names a root.
    pub env_vcpkg_root: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleToml {
    vcpkg: VcpkgToml,
    target: PlatformSpec,
    host: Option<PlatformSpec>,
    protocol: Option<ProtocolToml>,
    outputs: Option<OutputsToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VcpkgToml {
    root: Option<String>,
    packages: Vec<String>,
    host_tools: Option<Vec<String>>,
    linkage: Option<Linkage>,
    build_type: Option<String>,
    toolset_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProtocolToml {
    definitions_dir: Option<String>,
    output_dir: String,
    include_begin: Option<String>,
    include_end: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputsToml {
    runtime_destination: Option<String>,
    definitions: Option<Vec<String>>,
    system_libraries: Option<Vec<String>>,
}

impl BundleConfig {
    /// Read `config_path`, taking the vcpkg root fallback from the environment.
    pub fn load(config_path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        let text = fs::read_to_string(config_path)
            .with_context(|| format!("reading config '{}'", config_path.display()))?;

        let project_root = match overrides.project_root {
            Some(root) => root,
            None => config_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let overrides = ConfigOverrides {
            project_root: Some(project_root),
            env_vcpkg_root: overrides
                .env_vcpkg_root
                .or_else(|| env::var_os(VCPKG_ROOT_ENV).map(PathBuf::from)),
            ..overrides
        };

        Self::from_toml(&text, overrides)
            .with_context(|| format!("loading config '{}'", config_path.display()))
    }

    /// Parse and validate configuration text.
    pub fn from_toml(text: &str, overrides: ConfigOverrides) -> Result<Self> {
        let parsed: BundleToml = toml::from_str(text).context("parsing config")?;
        let project_root = overrides
            .project_root
            .unwrap_or_else(|| PathBuf::from("."));

        let vcpkg = parsed.vcpkg;
        let packages = clean_names(vcpkg.packages);
        if packages.is_empty() {
            return Err(invalid("[vcpkg].packages must name at least one package"));
        }

        let vcpkg_root = overrides
            .vcpkg_root
            .or_else(|| {
                vcpkg
                    .root
                    .as_deref()
                    .map(|root| resolve_project_path(&project_root, root))
            })
            .or(overrides.env_vcpkg_root)
            .ok_or_else(|| {
                invalid(&format!(
                    "no vcpkg root: set [vcpkg].root, pass --vcpkg-root or export {VCPKG_ROOT_ENV}"
                ))
            })?;

        let build_type = vcpkg
            .build_type
            .map(|b| b.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "release".to_string());
        if build_type != "release" && build_type != "debug" {
            return Err(invalid(&format!(
                "[vcpkg].build_type must be 'release' or 'debug', got '{build_type}'"
            )));
        }
        let toolset_version = match vcpkg.toolset_version {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => TripletSettings::default().toolset_version,
        };

        let protocol = parsed.protocol.map(|p| {
            let defaults = IsolationIncludes::default();
            ProtocolConfig {
                definitions_dir: resolve_project_path(
                    &project_root,
                    p.definitions_dir.as_deref().unwrap_or(DEFAULT_DEFINITIONS_DIR),
                ),
                output_dir: resolve_project_path(&project_root, &p.output_dir),
                includes: IsolationIncludes {
                    begin: p.include_begin.unwrap_or(defaults.begin),
                    end: p.include_end.unwrap_or(defaults.end),
                },
            }
        });

        let outputs = parsed.outputs.map_or_else(
            || OutputConfig {
                runtime_destination: DEFAULT_RUNTIME_DESTINATION.to_string(),
                definitions: Vec::new(),
                system_libraries: Vec::new(),
            },
            |o| OutputConfig {
                runtime_destination: o
                    .runtime_destination
                    .unwrap_or_else(|| DEFAULT_RUNTIME_DESTINATION.to_string()),
                definitions: o.definitions.unwrap_or_default(),
                system_libraries: o.system_libraries.unwrap_or_default(),
            },
        );

        Ok(Self {
            project_root,
            vcpkg_root,
            packages,
            host_tools: clean_names(vcpkg.host_tools.unwrap_or_else(|| {
                DEFAULT_HOST_TOOLS.iter().map(|s| s.to_string()).collect()
            })),
            linkage: vcpkg.linkage.unwrap_or_default(),
            triplet_settings: TripletSettings {
                build_type,
                toolset_version,
            },
            target: parsed.target,
            host: parsed.host,
            protocol,
            outputs,
        })
    }
}

/// `path` as is when absolute, else relative to `project_root`.
pub fn resolve_project_path(project_root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        project_root.join(candidate)
    }
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim().to_string();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn invalid(msg: &str) -> anyhow::Error {
    BundleError::InvalidConfig(msg.to_string()).into()
}
