//! What a run hands back to the host build system.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::atomic::write_atomic;
use crate::classify::ArtifactBundle;
use crate::config::OutputConfig;
use crate::installed::InstalledManifest;
use crate::protoc::GeneratedSources;
use crate::resolver::PackageSet;
use crate::triplet::paths::TripletPaths;

/// A runtime library and where the host build should stage it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeDependency {
    /// e.g. `$(TargetOutputDir)/grpc.dll`
    pub destination: String,
    pub source: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildOutputs {
    pub target_triplet: String,
    pub host_triplet: String,
    pub packages: Vec<String>,
    /// `<package>_<version>` of each installed manifest.
    pub installed: Vec<String>,
    pub include_paths: Vec<PathBuf>,
    pub static_libraries: Vec<PathBuf>,
    pub runtime_dependencies: Vec<RuntimeDependency>,
    pub generated_sources: Vec<PathBuf>,
    pub generated_headers: Vec<PathBuf>,
    pub definitions: Vec<String>,
    pub system_libraries: Vec<String>,
}

/// Inputs to [`BuildOutputs::assemble`], all borrowed from one run.
#[derive(Debug, Clone, Copy)]
pub struct RunResults<'r> {
    pub target: TripletPaths<'r>,
    pub host_triplet: &'r str,
    pub packages: &'r PackageSet,
    pub manifests: &'r [InstalledManifest],
    pub artifacts: &'r ArtifactBundle,
    pub generated: Option<&'r GeneratedSources>,
    pub outputs: &'r OutputConfig,
}

impl BuildOutputs {
    pub fn assemble(results: RunResults<'_>) -> Self {
        let target = results.target;
        let triplet = target.triplet().name();
        let lib_dir = target.lib();
        let bin_dir = target.bin();

        let mut include_paths = vec![target.include()];
        let (generated_sources, generated_headers) = match results.generated {
            Some(generated) => {
                include_paths.push(generated.output_dir.clone());
                (generated.sources.clone(), generated.headers.clone())
            }
            None => (Vec::new(), Vec::new()),
        };

        Self {
            target_triplet: triplet.to_string(),
            host_triplet: results.host_triplet.to_string(),
            packages: results.packages.iter().cloned().collect(),
            installed: results.manifests.iter().map(|m| m.label(triplet)).collect(),
            include_paths,
            static_libraries: results
                .artifacts
                .static_libraries()
                .iter()
                .map(|lib| lib_dir.join(lib))
                .collect(),
            runtime_dependencies: results
                .artifacts
                .shared_libraries()
                .iter()
                .map(|dll| RuntimeDependency {
                    destination: runtime_destination(&results.outputs.runtime_destination, dll),
                    source: bin_dir.join(dll),
                })
                .collect(),
            generated_sources,
            generated_headers,
            definitions: results.outputs.definitions.clone(),
            system_libraries: results.outputs.system_libraries.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).context("serializing build outputs")?;
        json.push('\n');
        Ok(json)
    }

    /// Write the outputs as JSON, replacing `path` atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_json()?)
            .with_context(|| format!("writing build outputs '{}'", path.display()))
    }
}

fn runtime_destination(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches(['/', '\\']);
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triplet::paths::InstallRoot;
    use crate::triplet::{Linkage, Triplet};
    use tempfile::TempDir;

    #[test]
    fn test_runtime_destination() {
        assert_eq!(
            runtime_destination("$(TargetOutputDir)", "grpc.dll"),
            "$(TargetOutputDir)/grpc.dll"
        );
        assert_eq!(runtime_destination("bin/", "grpc.dll"), "bin/grpc.dll");
        assert_eq!(runtime_destination("", "grpc.dll"), "grpc.dll");
    }

    #[test]
    fn test_assemble_and_write() {
        let temp = TempDir::new().unwrap();
        let root = InstallRoot::new("/opt/vcpkg");
        let triplet = Triplet::new("x64-windows", Linkage::Dynamic);
        let target = root.for_triplet(&triplet);

        let packages: PackageSet = ["grpc"].iter().map(|s| s.to_string()).collect();
        let manifests = vec![InstalledManifest {
            package: "grpc".into(),
            path: root.info().join("grpc_1.51_x64-windows.list"),
        }];
        let mut artifacts = ArtifactBundle::default();
        crate::classify::Classifier::new("x64-windows")
            .unwrap()
            .classify_lines(
                ["x64-windows/lib/grpc.lib", "x64-windows/bin/grpc.dll"],
                &mut artifacts,
            );
        let outputs = OutputConfig {
            runtime_destination: "$(TargetOutputDir)".into(),
            definitions: vec!["GRPC_ALLOW_EXCEPTIONS=0".into()],
            system_libraries: vec!["crypt32.lib".into()],
        };

        let built = BuildOutputs::assemble(RunResults {
            target,
            host_triplet: "x64-windows",
            packages: &packages,
            manifests: &manifests,
            artifacts: &artifacts,
            generated: None,
            outputs: &outputs,
        });

        assert_eq!(built.installed, vec!["grpc_1.51"]);
        assert_eq!(built.include_paths, vec![target.include()]);
        assert_eq!(built.static_libraries, vec![target.lib().join("grpc.lib")]);
        assert_eq!(
            built.runtime_dependencies,
            vec![RuntimeDependency {
                destination: "$(TargetOutputDir)/grpc.dll".into(),
                source: target.bin().join("grpc.dll"),
            }]
        );

        let path = temp.path().join("outputs.json");
        built.write(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["target_triplet"], "x64-windows");
        assert_eq!(value["system_libraries"][0], "crypt32.lib");
    }
}
