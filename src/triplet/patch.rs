//! Pin build type and platform toolset in a triplet definition.
//!
//! Triplet files are CMake fragments made of `set(KEY VALUE)` lines. They are
//! patched textually: a file that already declares the wanted values is left
//! untouched, anything else has its old declarations dropped and the wanted
//! ones appended.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::process::ensure_exists;

const BUILD_TYPE_KEY: &str = "VCPKG_BUILD_TYPE";
const TOOLSET_KEY: &str = "VCPKG_PLATFORM_TOOLSET_VERSION";

/// Values written into a triplet file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripletSettings {
    /// `release` or `debug`.
    pub build_type: String,
    /// MSVC toolset, e.g. `14.38`. `None` leaves the toolset alone.
    pub toolset_version: Option<String>,
}

impl Default for TripletSettings {
    fn default() -> Self {
        Self {
            build_type: "release".to_string(),
            toolset_version: Some("14.38".to_string()),
        }
    }
}

impl TripletSettings {
    fn build_type_decl(&self) -> String {
        format!("{BUILD_TYPE_KEY} {}", self.build_type)
    }

    fn toolset_decl(&self) -> Option<String> {
        self.toolset_version
            .as_ref()
            .map(|v| format!("{TOOLSET_KEY} \"{v}\""))
    }

    /// Whether the effective (last) declarations in `content` are the
    /// wanted ones. Comments and other mentions of a key do not count.
    pub fn is_applied(&self, content: &str) -> bool {
        if last_declaration(content, BUILD_TYPE_KEY) != Some(self.build_type.as_str()) {
            return false;
        }
        match &self.toolset_version {
            Some(version) => {
                last_declaration(content, TOOLSET_KEY) == Some(format!("\"{version}\"").as_str())
            }
            None => true,
        }
    }

    /// Rewrite `content` so it declares the wanted settings exactly once.
    pub fn apply(&self, content: &str) -> String {
        let pin_toolset = self.toolset_version.is_some();
        let mut out: String = content
            .lines()
            .filter(|line| !line.contains(BUILD_TYPE_KEY))
            .filter(|line| !(pin_toolset && line.contains(TOOLSET_KEY)))
            .map(|line| format!("{line}\n"))
            .collect();

        out.push_str(&format!("set({})\n", self.build_type_decl()));
        if let Some(toolset) = self.toolset_decl() {
            out.push_str(&format!("set({toolset})\n"));
        }
        out
    }
}

/// Value of the last `set(<key> <value>)` line in `content`.
fn last_declaration<'c>(content: &'c str, key: &str) -> Option<&'c str> {
    content.lines().filter_map(|line| declared_value(line, key)).last()
}

fn declared_value<'l>(line: &'l str, key: &str) -> Option<&'l str> {
    let args = line.trim().strip_prefix("set(")?.trim_start();
    let rest = args.strip_prefix(key)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let value = rest.trim_start();
    let end = value.find(')')?;
    Some(value[..end].trim_end())
}

/// Result of [`pin_triplet_settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Unchanged,
    Patched,
}

/// Make the triplet file at `path` declare `settings`.
pub fn pin_triplet_settings(path: &Path, settings: &TripletSettings) -> Result<PatchOutcome> {
    ensure_exists(path, "triplet definition")?;

    let content = fs::read_to_string(path)
        .with_context(|| format!("reading triplet definition '{}'", path.display()))?;

    if settings.is_applied(&content) {
        debug!(path = %path.display(), "triplet settings already pinned");
        return Ok(PatchOutcome::Unchanged);
    }

    write_atomic(path, &settings.apply(&content))
        .with_context(|| format!("patching triplet definition '{}'", path.display()))?;
    info!(
        path = %path.display(),
        build_type = %settings.build_type,
        toolset = settings.toolset_version.as_deref().unwrap_or("-"),
        "pinned triplet settings"
    );
    Ok(PatchOutcome::Patched)
}
