//! Git LFS file locking.
//!
//! Tracked files can be claimed on the LFS server while they are being
//! edited so other clones see them as locked. All operations shell out to
//! the `git lfs` CLI inside the repository's working directory.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::errors::LfsError;

/// Check whether `git lfs` is installed and available on PATH.
///
/// Returns the version string on success.
pub fn preflight_check() -> Result<String, LfsError> {
    match Command::new("git").args(["lfs", "version"]).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!(version = %version, "git-lfs preflight passed");
            Ok(version)
        }
        Ok(output) => Err(LfsError::NotAvailable(format!(
            "git lfs version failed (exit code {}): {}",
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
        Err(e) => Err(LfsError::NotAvailable(format!(
            "git lfs not found on PATH. Install git-lfs: https://git-lfs.com ({})",
            e
        ))),
    }
}

/// Lock `path` on the LFS server.
pub fn lock(repo_path: &Path, path: &str) -> Result<(), LfsError> {
    run_lfs(repo_path, "lock", &[path])?;
    info!(path, "locked file");
    Ok(())
}

/// Release the lock on `path`. `force` breaks a lock held by someone else.
pub fn unlock(repo_path: &Path, path: &str, force: bool) -> Result<(), LfsError> {
    let mut args = vec![path];
    if force {
        args.push("--force");
    }
    run_lfs(repo_path, "unlock", &args)?;
    info!(path, force, "unlocked file");
    Ok(())
}

fn run_lfs(repo_path: &Path, command: &str, args: &[&str]) -> Result<String, LfsError> {
    debug!(command, ?args, repo = %repo_path.display(), "running git lfs");
    let output = Command::new("git")
        .current_dir(repo_path)
        .arg("lfs")
        .arg(command)
        .args(args)
        .output()?;

    if !output.status.success() {
        return Err(LfsError::CommandFailed {
            command: command.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
