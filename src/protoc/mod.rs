//! Protobuf/gRPC binding generation.
//!
//! Every run regenerates everything: protoc writes into an empty staging
//! directory next to the output directory, the generated `.cc` files are
//! bracketed with isolation includes, and only then does the staging
//! directory replace the output directory. A failed run leaves the previous
//! output as it was.
//!
//! ```text
//! <project>/Proto/*.proto
//!     │  protoc --cpp_out --grpc_out --plugin=protoc-gen-grpc=...
//!     ▼
//! <output>/../.<output-name>.staging/   (wrapped)
//!     │  swap
//!     ▼
//! <output>/
//! ```

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::atomic::{sibling_with_suffix, write_atomic, StagingDir};
use crate::process::{ensure_exists, run};
use crate::triplet::paths::TripletPaths;

/// Generated files that get wrapped.
const IMPLEMENTATION_EXTENSION: &str = "cc";
const DEFINITION_EXTENSION: &str = "proto";

pub const DEFAULT_INCLUDE_BEGIN: &str = "grpc_include_begin.h";
pub const DEFAULT_INCLUDE_END: &str = "grpc_include_end.h";

/// protoc and the gRPC C++ plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocToolchain {
    pub protoc: PathBuf,
    pub grpc_plugin: PathBuf,
}

impl ProtocToolchain {
    /// The tools vcpkg built for the host triplet.
    pub fn from_host(host: &TripletPaths) -> Result<Self> {
        let toolchain = Self {
            protoc: host.tool("protobuf", "protoc"),
            grpc_plugin: host.tool("grpc", "grpc_cpp_plugin"),
        };
        ensure_exists(&toolchain.protoc, "protoc")?;
        ensure_exists(&toolchain.grpc_plugin, "grpc_cpp_plugin")?;
        Ok(toolchain)
    }
}

/// Include directives bracketing every generated implementation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationIncludes {
    pub begin: String,
    pub end: String,
}

impl Default for IsolationIncludes {
    fn default() -> Self {
        Self {
            begin: DEFAULT_INCLUDE_BEGIN.to_string(),
            end: DEFAULT_INCLUDE_END.to_string(),
        }
    }
}

impl IsolationIncludes {
    /// `source` with the begin include as first line and the end include as
    /// last line.
    pub fn wrap(&self, source: &str) -> String {
        let mut out = format!("#include \"{}\"\n", self.begin);
        for line in source.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("#include \"{}\"\n", self.end));
        out
    }
}

/// One generation run.
#[derive(Debug, Clone)]
pub struct ProtocJob {
    pub toolchain: ProtocToolchain,
    /// Directory holding the `.proto` definitions.
    pub definitions_dir: PathBuf,
    /// Directory the bindings end up in. Replaced wholesale.
    pub output_dir: PathBuf,
    pub includes: IsolationIncludes,
}

/// Files present in the output directory after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSources {
    pub output_dir: PathBuf,
    /// `.cc` files, wrapped.
    pub sources: Vec<PathBuf>,
    /// Everything else (`.h` headers).
    pub headers: Vec<PathBuf>,
}

/// `.proto` files directly inside `dir`, sorted.
pub fn collect_definitions(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut definitions = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("reading definitions '{}'", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("iterating definitions '{}'", dir.display()))?
            .path();
        if path.is_file() && has_extension(&path, DEFINITION_EXTENSION) {
            definitions.push(path);
        }
    }
    definitions.sort();
    Ok(definitions)
}

/// Staging directory used while generating into `output_dir`.
pub fn staging_dir_for(output_dir: &Path) -> PathBuf {
    sibling_with_suffix(output_dir, "staging")
}

/// Regenerate the bindings of `job`.
pub fn generate(job: &ProtocJob) -> Result<GeneratedSources> {
    ensure_exists(&job.definitions_dir, "protocol definitions directory")?;
    check_layout(&job.definitions_dir, &job.output_dir)?;
    let definitions = collect_definitions(&job.definitions_dir)?;

    let staging = StagingDir::create(staging_dir_for(&job.output_dir))?;

    if definitions.is_empty() {
        warn!(
            dir = %job.definitions_dir.display(),
            "no .proto definitions found; output directory will be empty"
        );
    } else {
        run_protoc(job, &definitions, staging.path())?;
        wrap_implementations(staging.path(), &job.includes)?;
    }

    staging.commit(&job.output_dir)?;
    let generated = scan_output(&job.output_dir)?;
    info!(
        dir = %job.output_dir.display(),
        sources = generated.sources.len(),
        headers = generated.headers.len(),
        "generated protocol bindings"
    );
    Ok(generated)
}

fn run_protoc(job: &ProtocJob, definitions: &[PathBuf], out: &Path) -> Result<()> {
    let mut args: Vec<OsString> = vec![
        flag("--proto_path=", &job.definitions_dir),
        flag("--grpc_out=", out),
        flag("--cpp_out=", out),
        flag("--plugin=protoc-gen-grpc=", &job.toolchain.grpc_plugin),
    ];
    args.extend(definitions.iter().map(|p| p.as_os_str().to_owned()));

    run(&job.toolchain.protoc, args).with_context(|| {
        format!(
            "generating bindings from '{}'",
            job.definitions_dir.display()
        )
    })
}

fn flag(prefix: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(path.as_os_str());
    arg
}

/// Bracket every implementation file under `dir`.
pub fn wrap_implementations(dir: &Path, includes: &IsolationIncludes) -> Result<usize> {
    // Collect first: wrapping creates temporary files in the same directory.
    let sources = scan_output(dir)?.sources;
    for path in &sources {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading generated source '{}'", path.display()))?;
        write_atomic(path, &includes.wrap(&source))?;
        debug!(path = %path.display(), "wrapped generated source");
    }
    Ok(sources.len())
}

fn scan_output(dir: &Path) -> Result<GeneratedSources> {
    let mut generated = GeneratedSources {
        output_dir: dir.to_path_buf(),
        ..Default::default()
    };
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking '{}'", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if has_extension(&path, IMPLEMENTATION_EXTENSION) {
            generated.sources.push(path);
        } else {
            generated.headers.push(path);
        }
    }
    Ok(generated)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

/// The output directory is deleted on every run, so it must not be or
/// contain the definitions directory.
pub fn check_layout(definitions_dir: &Path, output_dir: &Path) -> Result<()> {
    if definitions_dir.starts_with(output_dir) {
        bail!(
            "protocol output directory '{}' must not contain the definitions directory '{}'",
            output_dir.display(),
            definitions_dir.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wrap_brackets_source() {
        let includes = IsolationIncludes::default();
        let wrapped = includes.wrap("// generated\nint x = 1;\n");
        let lines: Vec<&str> = wrapped.lines().collect();

        assert_eq!(lines.first(), Some(&"#include \"grpc_include_begin.h\""));
        assert_eq!(lines.last(), Some(&"#include \"grpc_include_end.h\""));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_staging_dir_is_sibling() {
        assert_eq!(
            staging_dir_for(Path::new("/p/Source/app/Generated")),
            PathBuf::from("/p/Source/app/.Generated.staging")
        );
    }

    #[test]
    fn test_collect_definitions_top_level_only() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.proto"), "").unwrap();
        fs::write(temp.path().join("a.proto"), "").unwrap();
        fs::write(temp.path().join("README.md"), "").unwrap();
        fs::create_dir_all(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested/c.proto"), "").unwrap();

        let defs = collect_definitions(temp.path()).unwrap();
        assert_eq!(
            defs,
            vec![temp.path().join("a.proto"), temp.path().join("b.proto")]
        );
    }

    #[test]
    fn test_wrap_implementations_skips_headers() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("object.pb.cc"), "int a;\n").unwrap();
        fs::write(temp.path().join("object.pb.h"), "#pragma once\n").unwrap();

        let count = wrap_implementations(temp.path(), &IsolationIncludes::default()).unwrap();

        assert_eq!(count, 1);
        let header = fs::read_to_string(temp.path().join("object.pb.h")).unwrap();
        assert_eq!(header, "#pragma once\n");
        let source = fs::read_to_string(temp.path().join("object.pb.cc")).unwrap();
        assert!(source.starts_with("#include \"grpc_include_begin.h\"\n"));
    }

    #[test]
    fn test_check_layout() {
        assert!(check_layout(Path::new("/p/Proto"), Path::new("/p/Gen")).is_ok());
        assert!(check_layout(Path::new("/p/Gen/Proto"), Path::new("/p/Gen")).is_err());
        assert!(check_layout(Path::new("/p"), Path::new("/p")).is_err());
    }

    #[cfg(unix)]
    mod with_fake_protoc {
        use super::*;
        use crate::test_support::write_script;

        /// Emits the four files real protoc + grpc plugin produce per definition.
        const FAKE_PROTOC: &str = r#"out=""
files=""
for arg in "$@"; do
  case "$arg" in
    --cpp_out=*) out="${arg#--cpp_out=}" ;;
    --*) ;;
    *.proto) files="$files $arg" ;;
  esac
done
for f in $files; do
  base=$(basename "$f" .proto)
  printf '// %s.pb.h\n' "$base" > "$out/$base.pb.h"
  printf '// %s.pb.cc\nint %s_pb;\n' "$base" "$base" > "$out/$base.pb.cc"
  printf '// %s.grpc.pb.h\n' "$base" > "$out/$base.grpc.pb.h"
  printf '// %s.grpc.pb.cc\nint %s_grpc;\n' "$base" "$base" > "$out/$base.grpc.pb.cc"
done"#;

        fn job(temp: &TempDir) -> ProtocJob {
            let tools = temp.path().join("tools");
            let protoc = tools.join("protoc");
            let plugin = tools.join("grpc_cpp_plugin");
            write_script(&protoc, FAKE_PROTOC);
            write_script(&plugin, "exit 0");
            ProtocJob {
                toolchain: ProtocToolchain {
                    protoc,
                    grpc_plugin: plugin,
                },
                definitions_dir: temp.path().join("Proto"),
                output_dir: temp.path().join("Source/app/Generated"),
                includes: IsolationIncludes::default(),
            }
        }

        #[test]
        fn test_regeneration_leaves_only_current_files() {
            let temp = TempDir::new().unwrap();
            let job = job(&temp);
            fs::create_dir_all(&job.definitions_dir).unwrap();
            fs::write(job.definitions_dir.join("object.proto"), "syntax = \"proto3\";\n")
                .unwrap();

            let first = generate(&job).unwrap();
            assert_eq!(first.sources.len(), 2);
            assert_eq!(first.headers.len(), 2);

            // Rename the definition; the old bindings must disappear.
            fs::rename(
                job.definitions_dir.join("object.proto"),
                job.definitions_dir.join("selection.proto"),
            )
            .unwrap();
            fs::write(job.output_dir.join("leftover.txt"), "stale").unwrap();

            let second = generate(&job).unwrap();
            let mut names: Vec<String> = fs::read_dir(&job.output_dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            assert_eq!(
                names,
                vec![
                    "selection.grpc.pb.cc",
                    "selection.grpc.pb.h",
                    "selection.pb.cc",
                    "selection.pb.h",
                ]
            );
            assert!(!staging_dir_for(&job.output_dir).exists());

            for source in &second.sources {
                let text = fs::read_to_string(source).unwrap();
                let lines: Vec<&str> = text.lines().collect();
                assert_eq!(lines.first(), Some(&"#include \"grpc_include_begin.h\""));
                assert_eq!(lines.last(), Some(&"#include \"grpc_include_end.h\""));
                assert_eq!(text.matches("grpc_include_begin.h").count(), 1);
            }
            for header in &second.headers {
                let text = fs::read_to_string(header).unwrap();
                assert!(!text.contains("grpc_include_begin.h"));
            }
        }

        #[test]
        fn test_failed_protoc_keeps_previous_output() {
            let temp = TempDir::new().unwrap();
            let job = job(&temp);
            fs::create_dir_all(&job.definitions_dir).unwrap();
            fs::write(job.definitions_dir.join("object.proto"), "").unwrap();
            generate(&job).unwrap();

            write_script(
                &job.toolchain.protoc,
                "echo 'object.proto:1:1: syntax error' >&2; exit 1",
            );
            assert!(generate(&job).is_err());
            assert!(job.output_dir.join("object.pb.cc").is_file());
            assert!(!staging_dir_for(&job.output_dir).exists());
        }

        #[test]
        fn test_partial_protoc_output_is_discarded() {
            let temp = TempDir::new().unwrap();
            let job = job(&temp);
            fs::create_dir_all(&job.definitions_dir).unwrap();
            fs::write(job.definitions_dir.join("half.proto"), "").unwrap();

            write_script(
                &job.toolchain.protoc,
                r#"for arg in "$@"; do
  case "$arg" in
    --cpp_out=*) echo '// partial' > "${arg#--cpp_out=}/half.pb.cc" ;;
  esac
done
exit 1"#,
            );
            assert!(generate(&job).is_err());
            assert!(!staging_dir_for(&job.output_dir).exists());
            assert!(!job.output_dir.exists());
        }

        #[test]
        fn test_empty_definitions_dir_clears_output() {
            let temp = TempDir::new().unwrap();
            let job = job(&temp);
            fs::create_dir_all(&job.definitions_dir).unwrap();
            fs::create_dir_all(&job.output_dir).unwrap();
            fs::write(job.output_dir.join("old.pb.cc"), "").unwrap();

            let generated = generate(&job).unwrap();
            assert!(generated.sources.is_empty());
            assert!(job.output_dir.is_dir());
            assert_eq!(fs::read_dir(&job.output_dir).unwrap().count(), 0);
        }

        #[test]
        fn test_missing_definitions_dir_fails() {
            let temp = TempDir::new().unwrap();
            let job = job(&temp);
            let err = generate(&job).unwrap_err();
            assert!(err
                .to_string()
                .contains("protocol definitions directory not found"));
        }
    }
}
