//! Include processors and their registry
//!
//! The reader asks the registry for the first processor that handles an
//! include target. The shell processor is registered at the front so a
//! `cmd:` target is never mistaken for a file path by a default processor.

use super::executor::Executor;
use super::git::Git;
use super::resolver::WorkdirResolver;
use super::runner::CommandRunner;
use crate::domain::{self, AttributeList, Directive, DocumentContext};

/// Handles some kind of include target
pub trait IncludeProcessor {
    /// Returns true if this processor handles the target
    fn handles(&self, target: &str) -> bool;

    /// Produces the text to splice in place of the directive
    fn process(&self, doc: &dyn DocumentContext, target: &str, attrs: &AttributeList) -> String;
}

/// Runs `cmd:` targets as shell commands
pub struct ShellIncludeProcessor<G, R> {
    resolver: WorkdirResolver<G>,
    executor: Executor<R>,
}

impl<G: Git, R: CommandRunner> ShellIncludeProcessor<G, R> {
    pub fn new(resolver: WorkdirResolver<G>, executor: Executor<R>) -> Self {
        Self { resolver, executor }
    }
}

impl<G: Git, R: CommandRunner> IncludeProcessor for ShellIncludeProcessor<G, R> {
    fn handles(&self, target: &str) -> bool {
        domain::handles(target)
    }

    fn process(&self, doc: &dyn DocumentContext, target: &str, attrs: &AttributeList) -> String {
        let Some(directive) = Directive::parse(target, attrs) else {
            return String::new();
        };

        let cwd = self.resolver.resolve(doc.origin(), directive.cwd.as_deref());
        self.executor.execute(&directive, &cwd.path, doc)
    }
}

/// Ordered set of include processors; the first one that handles a target wins
#[derive(Default)]
pub struct Registry {
    processors: Vec<Box<dyn IncludeProcessor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a processor ahead of the existing ones
    pub fn register_first(&mut self, processor: impl IncludeProcessor + 'static) -> &mut Self {
        self.processors.insert(0, Box::new(processor));
        self
    }

    /// Finds the processor for a target
    pub fn find(&self, target: &str) -> Option<&dyn IncludeProcessor> {
        self.processors
            .iter()
            .find(|p| p.handles(target))
            .map(|p| &**p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, DocumentOrigin};

    /// Claims every target, like an engine's default file include
    struct CatchAll;

    impl IncludeProcessor for CatchAll {
        fn handles(&self, _target: &str) -> bool {
            true
        }

        fn process(&self, _doc: &dyn DocumentContext, target: &str, _attrs: &AttributeList) -> String {
            format!("file:{}", target)
        }
    }

    struct CmdOnly;

    impl IncludeProcessor for CmdOnly {
        fn handles(&self, target: &str) -> bool {
            domain::handles(target)
        }

        fn process(&self, _doc: &dyn DocumentContext, target: &str, _attrs: &AttributeList) -> String {
            format!("shell:{}", target)
        }
    }

    #[test]
    fn register_first_takes_precedence() {
        let mut registry = Registry::new();
        registry.register_first(CatchAll).register_first(CmdOnly);

        let doc = Document::new(DocumentOrigin::worktree("/repo/x.adoc"));
        let attrs = AttributeList::default();

        let processor = registry.find("cmd:ls").unwrap();
        assert_eq!(processor.process(&doc, "cmd:ls", &attrs), "shell:cmd:ls");

        let processor = registry.find("other.adoc").unwrap();
        assert_eq!(processor.process(&doc, "other.adoc", &attrs), "file:other.adoc");
    }

    #[test]
    fn empty_registry_handles_nothing() {
        let registry = Registry::new();
        assert!(registry.find("cmd:ls").is_none());
    }
}
