//! Line reader that expands include directives
//!
//! Source is read line by line. Attribute entries update the document as
//! they are read, and `include::` lines are handed to the first registered
//! processor that handles the target. The processor's output is pushed as a
//! new frame and read next, so it may itself contain directives. Every line
//! keeps the file and line number it came from.

use std::collections::VecDeque;

use tracing::warn;

use super::processor::Registry;
use crate::domain::{parse_include_line, AttributeList, Document, IncludeLine};

/// Deepest include nesting before directives are left unexpanded
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// A line of the expanded document with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub file: String,
    pub lineno: usize,
}

struct Frame {
    lines: VecDeque<String>,
    file: String,
    lineno: usize,
    depth: usize,
}

pub struct Reader<'r> {
    registry: &'r Registry,
    frames: Vec<Frame>,
}

impl<'r> Reader<'r> {
    /// Creates a reader over `source`, reported as `file`
    pub fn new(registry: &'r Registry, source: &str, file: impl Into<String>) -> Self {
        let mut reader = Self {
            registry,
            frames: Vec::new(),
        };
        reader.push_frame(source, file.into(), 1, 0);
        reader
    }

    /// Splices `data` in at the current position; its lines are read next,
    /// numbered from `lineno` and attributed to `file`.
    pub fn push_include(&mut self, data: &str, file: impl Into<String>, lineno: usize) {
        let depth = self.depth() + 1;
        self.push_frame(data, file.into(), lineno, depth);
    }

    /// Current include depth (0 for the main document)
    pub fn depth(&self) -> usize {
        self.frames.last().map(|f| f.depth).unwrap_or(0)
    }

    fn push_frame(&mut self, data: &str, file: String, lineno: usize, depth: usize) {
        let lines: VecDeque<String> = data.lines().map(str::to_string).collect();
        if lines.is_empty() {
            return;
        }
        self.frames.push(Frame {
            lines,
            file,
            lineno,
            depth,
        });
    }

    fn next_raw(&mut self) -> Option<SourceLine> {
        loop {
            let frame = self.frames.last_mut()?;
            match frame.lines.pop_front() {
                Some(text) => {
                    let line = SourceLine {
                        text,
                        file: frame.file.clone(),
                        lineno: frame.lineno,
                    };
                    frame.lineno += 1;
                    return Some(line);
                }
                None => {
                    self.frames.pop();
                }
            }
        }
    }

    /// Reads the next line of the expanded document
    pub fn read_line(&mut self, doc: &mut Document) -> Option<SourceLine> {
        let registry = self.registry;
        loop {
            let mut line = self.next_raw()?;

            match parse_include_line(&line.text) {
                None => {
                    doc.apply_attribute_entry(&line.text);
                    return Some(line);
                }
                Some(IncludeLine::Escaped(unescaped)) => {
                    line.text = unescaped.to_string();
                    return Some(line);
                }
                Some(IncludeLine::Directive { target, attrlist }) => {
                    let target = doc.substitute_attributes(target);
                    let attrs = AttributeList::parse(attrlist)
                        .map_values(|value| doc.substitute_attributes(value));

                    let Some(processor) = registry.find(&target) else {
                        return Some(line);
                    };

                    if self.depth() >= MAX_INCLUDE_DEPTH {
                        warn!(
                            file = %line.file,
                            line = line.lineno,
                            "maximum include depth of {} exceeded, leaving include::{} unexpanded",
                            MAX_INCLUDE_DEPTH,
                            target
                        );
                        return Some(line);
                    }

                    let text = processor.process(&*doc, &target, &attrs);
                    self.push_include(&text, target, 1);
                }
            }
        }
    }

    /// Reads every remaining line
    pub fn read_lines(&mut self, doc: &mut Document) -> Vec<SourceLine> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line(doc) {
            lines.push(line);
        }
        lines
    }
}

/// Expands all handled includes in `source` and returns the resulting text
pub fn expand(registry: &Registry, doc: &mut Document, source: &str, file: &str) -> String {
    let mut reader = Reader::new(registry, source, file);
    let lines = reader.read_lines(doc);

    let mut text = lines
        .into_iter()
        .map(|l| l.text)
        .collect::<Vec<_>>()
        .join("\n");
    if !text.is_empty() && source.ends_with('\n') {
        text.push('\n');
    }
    text
}
