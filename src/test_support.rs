//! Fixtures shared by unit tests: fake tools written as shell scripts.

use std::fs;
use std::path::Path;

/// Write an executable `#!/bin/sh` script at `path`.
#[cfg(unix)]
pub(crate) fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Write a manifest (`.list`) file listing `lines` under `info_dir`.
pub(crate) fn write_manifest(info_dir: &Path, file_name: &str, lines: &[&str]) {
    fs::create_dir_all(info_dir).unwrap();
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(info_dir.join(file_name), content).unwrap();
}
