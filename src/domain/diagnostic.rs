//! Failures that end up as document content
//!
//! The shell include never aborts a build. Resolution and execution problems
//! are turned into a [`Diagnostic`], logged, and rendered inline as
//! emphasized text so readers of the generated site can see them.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("git root lookup failed in {dir}: {message}")]
    GitRootLookup { dir: PathBuf, message: String },

    #[error("failed to clone {url} into {dest}: {message}")]
    CloneFailed {
        url: String,
        dest: PathBuf,
        message: String,
    },

    #[error("working directory does not exist: {0}")]
    MissingWorkingDirectory(PathBuf),

    #[error("failed to run `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("`{command}` exited with status {status}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("`{command}` produced output that is not valid UTF-8")]
    InvalidOutput { command: String },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
}

impl Diagnostic {
    /// Renders the diagnostic as emphasized AsciiDoc text.
    ///
    /// A failed command renders its stderr; everything else renders the
    /// error message.
    pub fn render(&self) -> String {
        let text = match self {
            Diagnostic::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
                stderr.trim_end().to_string()
            }
            other => other.to_string(),
        };
        format!("**{}**", text)
    }
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.trim() {
        "" => String::new(),
        trimmed => format!(": {}", trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_renders_stderr() {
        let diagnostic = Diagnostic::CommandFailed {
            command: "false".to_string(),
            status: 1,
            stderr: "boom\n".to_string(),
        };
        assert_eq!(diagnostic.render(), "**boom**");
    }

    #[test]
    fn command_failure_without_stderr_renders_status() {
        let diagnostic = Diagnostic::CommandFailed {
            command: "false".to_string(),
            status: 1,
            stderr: String::new(),
        };
        assert_eq!(diagnostic.render(), "**`false` exited with status 1**");

        let whitespace_only = Diagnostic::CommandFailed {
            command: "false".to_string(),
            status: 2,
            stderr: " \n".to_string(),
        };
        assert_eq!(whitespace_only.render(), "**`false` exited with status 2**");
    }

    #[test]
    fn command_failure_message_includes_stderr() {
        let diagnostic = Diagnostic::CommandFailed {
            command: "ls x".to_string(),
            status: 2,
            stderr: "no such file\n".to_string(),
        };
        assert_eq!(diagnostic.to_string(), "`ls x` exited with status 2: no such file");
    }

    #[test]
    fn missing_directory_renders_path() {
        let diagnostic = Diagnostic::MissingWorkingDirectory(PathBuf::from("$PROJECT_DIR/docs"));
        assert_eq!(
            diagnostic.render(),
            "**working directory does not exist: $PROJECT_DIR/docs**"
        );
    }

    #[test]
    fn timeout_message() {
        let diagnostic = Diagnostic::TimedOut {
            command: "sleep 10".to_string(),
            timeout: Duration::from_secs(2),
        };
        assert_eq!(diagnostic.to_string(), "`sleep 10` timed out after 2s");
    }
}
