//! docsh - shell-command includes for AsciiDoc
//!
//! Expands `include::cmd:<command>[...]` directives by running the command
//! and splicing its output into the document, and drives local builds of an
//! Antora site from a generated development playbook.

pub mod domain;
pub mod include;
pub mod storage;
pub mod cli;

pub use domain::{AttributeList, Diagnostic, Directive, Document, DocumentContext, DocumentOrigin};
pub use include::{expand, shell_registry, IncludeProcessor, Reader, Registry, ShellIncludeProcessor};
