//! Domain models for docsh
//!
//! Directive parsing, document origin and context, and diagnostics. No
//! process execution or filesystem access beyond path normalization.

mod diagnostic;
mod directive;
mod document;
mod origin;

pub use diagnostic::Diagnostic;
pub use directive::{
    handles, parse_include_line, AttributeList, Directive, IncludeLine, CMD_PREFIX, DEFAULT_FORMAT,
};
pub use document::{Document, DocumentContext, COMPONENT_VERSION_ATTR, VERSIONED_COMMAND_ATTR};
pub use origin::DocumentOrigin;
