//! Command execution and output formatting
//!
//! Turns a resolved directive into the text spliced into the document:
//! stdout on success, `**stderr**` on failure, optionally wrapped in a
//! `[source,<format>]` listing block.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use super::runner::{CommandRunner, ExecOptions, RunError};
use crate::domain::{Diagnostic, Directive, DocumentContext, COMPONENT_VERSION_ATTR, VERSIONED_COMMAND_ATTR};

/// Version token used when the document has no component version
pub const DEFAULT_COMPONENT_VERSION: &str = "latest";

/// Engine-level settings for the executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Command that always receives a version argument, unless the document names one
    pub versioned_command: Option<String>,

    /// Version used when the document has no `page-component-version`
    pub default_component_version: Option<String>,

    /// Host variables passed through to commands besides `PATH`
    pub pass_env: Vec<String>,

    /// Kill commands running longer than this
    pub timeout: Option<Duration>,
}

pub struct Executor<R> {
    runner: R,
    settings: ExecutorSettings,
}

impl<R: CommandRunner> Executor<R> {
    pub fn new(runner: R, settings: ExecutorSettings) -> Self {
        Self { runner, settings }
    }

    /// The command line actually executed, with the version token inserted
    /// for the versioned command
    pub fn command_string(&self, directive: &Directive, doc: &dyn DocumentContext) -> String {
        let versioned = doc
            .attribute(VERSIONED_COMMAND_ATTR)
            .filter(|name| !name.is_empty())
            .or(self.settings.versioned_command.as_deref());

        if versioned != Some(directive.command.as_str()) {
            return directive.command_line();
        }

        let version = doc
            .attribute(COMPONENT_VERSION_ATTR)
            .filter(|v| !v.is_empty())
            .or(self.settings.default_component_version.as_deref())
            .unwrap_or(DEFAULT_COMPONENT_VERSION);

        match &directive.args {
            Some(args) => format!("{} {} {}", directive.command, version, args),
            None => format!("{} {}", directive.command, version),
        }
    }

    /// Runs the directive's command in `cwd`.
    ///
    /// Returns trimmed stdout, or a diagnostic for any failure.
    pub fn run(
        &self,
        directive: &Directive,
        cwd: &Path,
        doc: &dyn DocumentContext,
    ) -> Result<String, Diagnostic> {
        let command = self.command_string(directive, doc);

        if !cwd.is_dir() {
            return Err(Diagnostic::MissingWorkingDirectory(cwd.to_path_buf()));
        }

        let options = ExecOptions::new(cwd)
            .pass_env(&self.settings.pass_env)
            .with_timeout(self.settings.timeout);

        debug!(command = %command, cwd = %cwd.display(), "running shell include");

        let result = self.runner.run(&command, &options).map_err(|e| match e {
            RunError::Spawn(e) => Diagnostic::SpawnFailed {
                command: command.clone(),
                message: e.to_string(),
            },
            RunError::TimedOut(timeout) => Diagnostic::TimedOut {
                command: command.clone(),
                timeout,
            },
        })?;

        if !result.success() {
            return Err(Diagnostic::CommandFailed {
                command,
                status: result.exit_status,
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8(result.stdout)
            .map_err(|_| Diagnostic::InvalidOutput { command })?;

        Ok(stdout.trim_end().to_string())
    }

    /// Runs the directive and formats the text to splice into the document.
    ///
    /// Never fails: diagnostics are logged and rendered inline.
    pub fn execute(&self, directive: &Directive, cwd: &Path, doc: &dyn DocumentContext) -> String {
        let output = match self.run(directive, cwd, doc) {
            Ok(stdout) => stdout,
            Err(diagnostic) => {
                warn!(include_target = %directive.target, "{}", diagnostic);
                diagnostic.render()
            }
        };

        format_output(directive, &output)
    }
}

/// Wraps output in a listing block when the directive asks for one
pub fn format_output(directive: &Directive, output: &str) -> String {
    if !directive.block {
        return output.to_string();
    }

    let mut lines = vec![format!("[source,{}]", directive.format), "----".to_string()];
    if directive.print {
        lines.push(format!("$ {}", directive.command_line()));
    }
    if !output.is_empty() {
        lines.push(output.to_string());
    }
    lines.push("----".to_string());
    lines.join("\n")
}
