//! Split installed files into link-time and runtime libraries.
//!
//! Manifest lines are paths relative to `installed/`, so the triplet's own
//! files start with `<triplet>/`. Only `<triplet>/lib/*.lib` (static or
//! import libraries) and `<triplet>/bin/*.dll` (runtime libraries) count,
//! directly inside those directories. `lib/manual-link/` (linked only on
//! request), `debug/` subtrees and other triplets' files are ignored.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::installed::InstalledManifest;

/// Library file names gathered from a set of manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactBundle {
    static_libraries: Vec<String>,
    shared_libraries: Vec<String>,
}

impl ArtifactBundle {
    /// `.lib` file names, in manifest order.
    pub fn static_libraries(&self) -> &[String] {
        &self.static_libraries
    }

    /// `.dll` file names, in manifest order.
    pub fn shared_libraries(&self) -> &[String] {
        &self.shared_libraries
    }

    pub fn is_empty(&self) -> bool {
        self.static_libraries.is_empty() && self.shared_libraries.is_empty()
    }
}

/// Matches manifest lines against one triplet's `lib/` and `bin/` patterns.
#[derive(Debug, Clone)]
pub struct Classifier {
    lib: Regex,
    bin: Regex,
}

/// Which list a manifest line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Static,
    Shared,
}

impl Classifier {
    pub fn new(triplet: &str) -> Result<Self> {
        let escaped = regex::escape(triplet);
        let lib = Regex::new(&format!(r"^{escaped}/lib/[^/]*\.lib$"))
            .context("building static library pattern")?;
        let bin = Regex::new(&format!(r"^{escaped}/bin/[^/]*\.dll$"))
            .context("building shared library pattern")?;
        Ok(Self { lib, bin })
    }

    pub fn kind_of(&self, line: &str) -> Option<ArtifactKind> {
        let line = line.trim_end();
        if self.lib.is_match(line) {
            Some(ArtifactKind::Static)
        } else if self.bin.is_match(line) {
            Some(ArtifactKind::Shared)
        } else {
            None
        }
    }

    /// Classify `lines` into `bundle`, recording each match's base name.
    pub fn classify_lines<'l, I>(&self, lines: I, bundle: &mut ArtifactBundle)
    where
        I: IntoIterator<Item = &'l str>,
    {
        for line in lines {
            let Some(kind) = self.kind_of(line) else {
                continue;
            };
            let name = base_name(line.trim_end());
            match kind {
                ArtifactKind::Static => bundle.static_libraries.push(name),
                ArtifactKind::Shared => bundle.shared_libraries.push(name),
            }
        }
    }
}

fn base_name(line: &str) -> String {
    Path::new(line)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| line.to_string())
}

/// Read every manifest and collect its libraries for `triplet`.
pub fn classify(manifests: &[InstalledManifest], triplet: &str) -> Result<ArtifactBundle> {
    let classifier = Classifier::new(triplet)?;
    let mut bundle = ArtifactBundle::default();
    for manifest in manifests {
        let content = fs::read_to_string(&manifest.path)
            .with_context(|| format!("reading manifest '{}'", manifest.path.display()))?;
        classifier.classify_lines(content.lines(), &mut bundle);
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_manifest;
    use tempfile::TempDir;

    const GRPC_LIST: &[&str] = &[
        "x64-windows/",
        "x64-windows/bin/",
        "x64-windows/bin/grpc.dll",
        "x64-windows/debug/bin/grpc.dll",
        "x64-windows/debug/lib/grpc.lib",
        "x64-windows/include/grpc/grpc.h",
        "x64-windows/lib/",
        "x64-windows/lib/grpc.lib",
        "x64-windows/lib/pkgconfig/grpc.pc",
        "x64-windows/share/grpc/copyright",
        "x64-windows/tools/grpc/grpc_cpp_plugin.exe",
    ];

    #[test]
    fn test_classify_lines() {
        let classifier = Classifier::new("x64-windows").unwrap();
        let mut bundle = ArtifactBundle::default();
        classifier.classify_lines(GRPC_LIST.iter().copied(), &mut bundle);

        assert_eq!(bundle.static_libraries(), ["grpc.lib"]);
        assert_eq!(bundle.shared_libraries(), ["grpc.dll"]);
    }

    #[test]
    fn test_other_triplet_subtree_ignored() {
        let classifier = Classifier::new("x64-windows").unwrap();
        assert_eq!(classifier.kind_of("x64-windows-static-md/lib/zlib.lib"), None);
        assert_eq!(classifier.kind_of("arm64-uwp/bin/zlib.dll"), None);
    }

    #[test]
    fn test_nested_directories_are_not_linked() {
        let classifier = Classifier::new("arm64-uwp-static-md").unwrap();
        assert_eq!(
            classifier.kind_of("arm64-uwp-static-md/lib/manual-link/grpc_main.lib"),
            None
        );
        assert_eq!(
            classifier.kind_of("arm64-uwp-static-md/bin/plugins/extra.dll"),
            None
        );
        assert_eq!(
            classifier.kind_of("arm64-uwp-static-md/lib/grpc.lib"),
            Some(ArtifactKind::Static)
        );
    }

    #[test]
    fn test_triplet_is_matched_literally() {
        let classifier = Classifier::new("x64-windows").unwrap();
        // '-' and '.' in the tag must not act as pattern syntax.
        assert_eq!(classifier.kind_of("x64Awindows/lib/a.lib"), None);
    }

    #[test]
    fn test_kinds_are_disjoint() {
        let classifier = Classifier::new("x64-windows").unwrap();
        assert_eq!(classifier.kind_of("x64-windows/lib/odd.dll"), None);
        assert_eq!(classifier.kind_of("x64-windows/bin/odd.lib"), None);
        assert_eq!(
            classifier.kind_of("x64-windows/bin/zlib1.dll\r"),
            Some(ArtifactKind::Shared)
        );
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "a_1_x64-windows.list", &["x64-windows/lib/common.lib"]);
        write_manifest(
            temp.path(),
            "b_1_x64-windows.list",
            &["x64-windows/lib/b.lib", "x64-windows/lib/common.lib"],
        );
        let manifests = vec![
            InstalledManifest {
                package: "a".into(),
                path: temp.path().join("a_1_x64-windows.list"),
            },
            InstalledManifest {
                package: "b".into(),
                path: temp.path().join("b_1_x64-windows.list"),
            },
        ];

        let bundle = classify(&manifests, "x64-windows").unwrap();
        assert_eq!(bundle.static_libraries(), ["common.lib", "b.lib", "common.lib"]);
        assert!(bundle.shared_libraries().is_empty());
    }

    #[test]
    fn test_unreadable_manifest_fails() {
        let manifests = vec![InstalledManifest {
            package: "ghost".into(),
            path: "/nonexistent/ghost_1_x64-windows.list".into(),
        }];
        assert!(classify(&manifests, "x64-windows").is_err());
    }
}
