//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `expand` | Run the `include::cmd:` directives of one document |
//! | `playbook` | Write the local-dev playbook |
//! | `build` | Generate the site once |
//! | `dev` | Generate the site and rebuild on changes |
//!
//! All commands support `--format text|json`. Use `--verbose` (or set
//! `RUST_LOG`) for debug logs on stderr.
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod expand;
mod output;
mod site;
mod watch;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
