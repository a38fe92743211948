//! Parser for `vcpkg depend-info` reports.
//!
//! Grammar, one entry per line once the `:<triplet>` qualifiers are removed:
//!
//! ```text
//! line  := name [ "[" features "]" ] ":" deps
//! name  := any characters except '*', ' ', ':', '[' and ']'
//! deps  := token { "," token }
//! ```
//!
//! Lines that do not start with a name followed by a colon (progress output,
//! warnings, blank lines) are ignored. Tokens are trimmed; a trailing comma
//! leaves an empty token behind, which the exclusion rules remove.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;

use super::PackageSet;

const ENTRY_PATTERN: &str = r"(?m)^([^* :\[\]]*)(?:\[[^\]]*\])?:(.*)";

/// Every package named in `report`, leading names and dependencies alike.
pub fn parse_report(report: &str, triplet: &str) -> Result<PackageSet> {
    let entry = Regex::new(ENTRY_PATTERN).context("compiling depend-info pattern")?;
    let unqualified = report.replace(&format!(":{triplet}"), "");

    let mut packages = BTreeSet::new();
    for caps in entry.captures_iter(&unqualified) {
        packages.insert(caps[1].to_string());
        for dep in caps[2].split(',') {
            packages.insert(dep.trim().to_string());
        }
    }
    Ok(packages)
}
