//! Running external tools.
//!
//! Every external step (bootstrap script, `vcpkg install`, `vcpkg
//! depend-info`, `protoc`) goes through [`run_program`]. A tool that cannot
//! be started and a tool that exits nonzero are both errors.

use anyhow::{bail, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::BundleError;

/// Run `program` with `args` and wait for it.
///
/// With `capture`, stdout and stderr are collected and returned joined by a
/// newline and trimmed. Without it the child writes straight to this
/// process's terminal and `None` is returned.
pub fn run_program<I, S>(program: &Path, args: I, capture: bool) -> Result<Option<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    debug!(command = ?cmd, capture, "running");

    if capture {
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| launch_error(program, source))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{}\n{}", stdout, stderr).trim().to_string();

        if !output.status.success() {
            return Err(BundleError::ProcessFailed {
                program: program.to_path_buf(),
                status: output.status,
                output: combined,
            }
            .into());
        }
        return Ok(Some(combined));
    }

    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| launch_error(program, source))?;

    if !status.success() {
        return Err(BundleError::ProcessFailed {
            program: program.to_path_buf(),
            status,
            output: String::new(),
        }
        .into());
    }
    Ok(None)
}

/// [`run_program`] with captured output.
pub fn run_captured<I, S>(program: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Ok(run_program(program, args, true)?.unwrap_or_default())
}

/// [`run_program`] with output going to the terminal.
pub fn run<I, S>(program: &Path, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_program(program, args, false)?;
    Ok(())
}

/// Fail unless `path` exists. `what` names the thing for the message.
pub fn ensure_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} not found at: {}", what, path.display());
    }
    Ok(())
}

fn launch_error(program: &Path, source: std::io::Error) -> anyhow::Error {
    BundleError::Launch {
        program: program.to_path_buf(),
        source,
    }
    .into()
}
