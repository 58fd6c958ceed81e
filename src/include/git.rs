//! Git access for working-directory resolution
//!
//! The resolver only needs two git operations: finding the top level of the
//! repository containing a directory, and shallow-cloning a single branch.
//! They sit behind the [`Git`] trait so resolution can be tested without a
//! network or a real repository.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be found or spawned.
    #[error("failed to execute git: {0}")]
    Spawn(#[from] std::io::Error),

    /// The git command exited with a non-zero status.
    #[error("git command failed (exit code {code:?}): {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
}

pub type Result<T> = std::result::Result<T, GitError>;

/// Git operations used by the working-directory resolver
pub trait Git {
    /// `git rev-parse --show-toplevel` run in `dir`
    fn show_toplevel(&self, dir: &Path) -> Result<PathBuf>;

    /// Shallow, single-branch clone of `url` at `branch` into `dest`
    fn shallow_clone(&self, url: &str, branch: &str, dest: &Path) -> Result<()>;
}

/// Runs the `git` binary found on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl Git for SystemGit {
    fn show_toplevel(&self, dir: &Path) -> Result<PathBuf> {
        let root = git_command(&["rev-parse", "--show-toplevel"], dir)?;
        Ok(PathBuf::from(root))
    }

    fn shallow_clone(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        git_command(
            &[
                "clone",
                "--depth",
                "1",
                "--single-branch",
                "--branch",
                branch,
                url,
                &dest_str,
            ],
            parent,
        )?;
        Ok(())
    }
}

/// Executes `git` with the given arguments in `cwd`.
///
/// Returns stdout with trailing whitespace removed.
fn git_command(args: &[&str], cwd: &Path) -> Result<String> {
    let mut command = Command::new("git");
    command.args(args).current_dir(cwd).env_clear();
    if let Some(path) = std::env::var_os("PATH") {
        command.env("PATH", path);
    }

    let output = command.output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::CommandFailed {
            code: output.status.code(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}
