//! Document context consumed by include processors
//!
//! The surrounding documentation engine supplies the document origin and
//! attribute lookup. [`Document`] is the in-crate implementation used by the
//! preprocessing reader; it also tracks attribute entries (`:name: value`)
//! as the source is read.

use std::collections::BTreeMap;

use super::DocumentOrigin;

/// Document attribute naming the command that receives a version argument
pub const VERSIONED_COMMAND_ATTR: &str = "versioned-command";

/// Document attribute holding the component version
pub const COMPONENT_VERSION_ATTR: &str = "page-component-version";

/// What an include processor may ask about the current document
pub trait DocumentContext {
    /// Where the document lives
    fn origin(&self) -> &DocumentOrigin;

    /// Looks up a document attribute by name
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// A document being processed
#[derive(Debug, Clone)]
pub struct Document {
    origin: DocumentOrigin,
    attributes: BTreeMap<String, String>,
}

impl Document {
    pub fn new(origin: DocumentOrigin) -> Self {
        Self {
            origin,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute while building the document
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.remove(name);
    }

    /// Applies an attribute entry line (`:name: value` or `:name!:`).
    ///
    /// Returns true if the line was an attribute entry.
    pub fn apply_attribute_entry(&mut self, line: &str) -> bool {
        let Some(rest) = line.strip_prefix(':') else {
            return false;
        };
        let Some(end) = rest.find(':') else {
            return false;
        };

        let name = &rest[..end];
        let value = rest[end + 1..].trim();

        if let Some(name) = name.strip_suffix('!').or_else(|| name.strip_prefix('!')) {
            if !is_attribute_name(name) {
                return false;
            }
            self.remove_attribute(name);
            return true;
        }

        if !is_attribute_name(name) {
            return false;
        }

        let value = self.substitute_attributes(value);
        self.set_attribute(name, value);
        true
    }

    /// Replaces `{name}` references with attribute values.
    ///
    /// Unknown references are left as written.
    pub fn substitute_attributes(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find('{') {
            result.push_str(&rest[..start]);
            let candidate = &rest[start + 1..];

            match candidate.find('}') {
                Some(end) if is_attribute_name(&candidate[..end]) => {
                    let name = &candidate[..end];
                    match self.attributes.get(name) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push('{');
                            result.push_str(name);
                            result.push('}');
                        }
                    }
                    rest = &candidate[end + 1..];
                }
                _ => {
                    result.push('{');
                    rest = candidate;
                }
            }
        }

        result.push_str(rest);
        result
    }
}

impl DocumentContext for Document {
    fn origin(&self) -> &DocumentOrigin {
        &self.origin
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
