//! # Shell Includes
//!
//! Expands `include::cmd:<command>[...]` directives in AsciiDoc source by
//! running the command and splicing its output into the document.
//!
//! ## Pipeline
//!
//! ```text
//! Reader ── include::cmd:ls[...] ──▶ Registry ──▶ ShellIncludeProcessor
//!                                                   │
//!                        WorkdirResolver ◀──────────┤  cwd expression
//!                        Executor ◀─────────────────┘  command + format
//!   ◀── push_include(output) ─────────────────────────
//! ```
//!
//! ## Attributes
//!
//! | Attribute | Meaning |
//! |-----------|---------|
//! | `args` | Arguments appended to the command (`flags` is a deprecated alias) |
//! | `format` | Source block language, default `bash` |
//! | `block` | Wrap the output in a `[source,<format>]` listing block |
//! | `print` | Show `$ <command>` as the first line of the block |
//! | `cwd` | Working directory; may use `$PROJECT_DIR` and `$PWD` |
//!
//! Commands run one at a time, synchronously. A failing command renders its
//! stderr in bold instead of stopping the build.

mod executor;
mod git;
mod processor;
mod reader;
mod resolver;
mod runner;

pub use executor::{format_output, Executor, ExecutorSettings, DEFAULT_COMPONENT_VERSION};
pub use git::{Git, GitError, SystemGit};
pub use processor::{IncludeProcessor, Registry, ShellIncludeProcessor};
pub use reader::{expand, Reader, SourceLine, MAX_INCLUDE_DEPTH};
pub use resolver::{ResolvedWorkingDirectory, WorkdirResolver, PROJECT_DIR_TOKEN, PWD_TOKEN};
pub use runner::{CommandRunner, ExecOptions, ExecutionResult, RunError, ShellRunner};

use crate::storage::Config;

/// Builds a registry with the shell processor registered ahead of any other
pub fn shell_registry(config: &Config) -> Registry {
    let resolver = WorkdirResolver::new(SystemGit, config.clone_cache_dir());
    let executor = Executor::new(ShellRunner, config.executor_settings());

    let mut registry = Registry::new();
    registry.register_first(ShellIncludeProcessor::new(resolver, executor));
    registry
}
