//! Working-directory resolution for shell includes
//!
//! A `cwd` expression may contain placeholder tokens:
//!
//! | Token | Worktree document | Remote document |
//! |-------|-------------------|-----------------|
//! | `$PROJECT_DIR` | `git rev-parse --show-toplevel` of the document directory | local clone at `{cache}/{component}-{branch}` |
//! | `$PWD` | directory containing the document | directory of the document inside the clone |
//!
//! Remote repositories are cloned once (`--depth 1 --single-branch`) and
//! reused afterwards without fetching. Resolution never fails: problems are
//! logged and returned as diagnostics, and the expression degrades to a
//! best-effort path.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use super::git::Git;
use crate::domain::{Diagnostic, DocumentOrigin};

/// Placeholder for the git root of the document
pub const PROJECT_DIR_TOKEN: &str = "$PROJECT_DIR";

/// Placeholder for the directory containing the document
pub const PWD_TOKEN: &str = "$PWD";

/// A working directory computed for one directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWorkingDirectory {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolvedWorkingDirectory {
    fn clean(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            diagnostics: Vec::new(),
        }
    }
}

pub struct WorkdirResolver<G> {
    git: G,
    cache_root: PathBuf,
}

impl<G: Git> WorkdirResolver<G> {
    /// Creates a resolver cloning remote repositories under `cache_root`
    pub fn new(git: G, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            git,
            cache_root: cache_root.into(),
        }
    }

    /// Resolves a raw `cwd` expression for a document
    pub fn resolve(&self, origin: &DocumentOrigin, raw: Option<&str>) -> ResolvedWorkingDirectory {
        let raw = match raw {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                return ResolvedWorkingDirectory::clean(cwd);
            }
        };

        if !raw.contains(PROJECT_DIR_TOKEN) && !raw.contains(PWD_TOKEN) {
            return ResolvedWorkingDirectory::clean(raw);
        }

        let mut diagnostics = Vec::new();
        let mut expression = raw.to_string();

        match origin {
            DocumentOrigin::Worktree { absolute_path } => {
                let source_dir = source_dir(absolute_path);

                if expression.contains(PWD_TOKEN) {
                    expression = expression.replace(PWD_TOKEN, &source_dir.to_string_lossy());
                }

                if expression.contains(PROJECT_DIR_TOKEN) {
                    match self.git.show_toplevel(&source_dir) {
                        Ok(root) => {
                            debug!(root = %root.display(), "resolved project root");
                            expression =
                                expression.replace(PROJECT_DIR_TOKEN, &root.to_string_lossy());
                        }
                        Err(e) => {
                            let diagnostic = Diagnostic::GitRootLookup {
                                dir: source_dir.clone(),
                                message: e.to_string(),
                            };
                            warn!("{}", diagnostic);
                            diagnostics.push(diagnostic);
                        }
                    }
                }
            }

            DocumentOrigin::RemoteReference {
                repository_url,
                component,
                branch_or_tag,
                relative_path,
            } => {
                let clone_dir = self.clone_dir(component, branch_or_tag);
                if let Some(diagnostic) = self.ensure_clone(repository_url, branch_or_tag, &clone_dir) {
                    diagnostics.push(diagnostic);
                }

                if expression.contains(PWD_TOKEN) {
                    let doc_dir = relative_path
                        .as_deref()
                        .and_then(Path::parent)
                        .map(|parent| clone_dir.join(parent))
                        .unwrap_or_else(|| clone_dir.clone());
                    expression = expression.replace(PWD_TOKEN, &doc_dir.to_string_lossy());
                }

                expression = expression.replace(PROJECT_DIR_TOKEN, &clone_dir.to_string_lossy());
            }
        }

        debug!(raw = %raw, resolved = %expression, "resolved working directory");

        ResolvedWorkingDirectory {
            path: PathBuf::from(expression),
            diagnostics,
        }
    }

    /// Local clone location for a component branch
    pub fn clone_dir(&self, component: &str, branch_or_tag: &str) -> PathBuf {
        self.cache_root.join(format!("{}-{}", component, branch_or_tag))
    }

    /// Clones the repository unless the destination already exists.
    ///
    /// The check and the clone happen under an exclusive lock on
    /// `{cache_root}/.{key}.lock` so parallel builds sharing the cache do not
    /// clone into the same directory.
    fn ensure_clone(&self, url: &str, branch: &str, dest: &Path) -> Option<Diagnostic> {
        if dest.exists() {
            debug!(dest = %dest.display(), "reusing cached clone");
            return None;
        }

        let _lock = match self.lock_for(dest) {
            Ok(lock) => Some(lock),
            Err(e) => {
                warn!(error = %e, "could not lock clone cache, cloning without lock");
                None
            }
        };

        if dest.exists() {
            debug!(dest = %dest.display(), "clone appeared while waiting for lock");
            return None;
        }

        debug!(url = %url, branch = %branch, dest = %dest.display(), "cloning repository");
        match self.git.shallow_clone(url, branch, dest) {
            Ok(()) => None,
            Err(e) => {
                let diagnostic = Diagnostic::CloneFailed {
                    url: url.to_string(),
                    dest: dest.to_path_buf(),
                    message: e.to_string(),
                };
                warn!("{}", diagnostic);
                Some(diagnostic)
            }
        }
    }

    fn lock_for(&self, dest: &Path) -> std::io::Result<File> {
        fs::create_dir_all(&self.cache_root)?;
        let key = dest
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::create(self.cache_root.join(format!(".{}.lock", key)))?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

/// Directory of a document: the path itself for directories, else its parent
fn source_dir(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::git::{GitError, Result as GitResult};
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records calls and answers from canned results
    #[derive(Default)]
    struct FakeGit {
        toplevel: Option<PathBuf>,
        clone_fails: bool,
        create_on_clone: bool,
        toplevel_calls: RefCell<Vec<PathBuf>>,
        clone_calls: RefCell<Vec<(String, String, PathBuf)>>,
    }

    impl Git for FakeGit {
        fn show_toplevel(&self, dir: &Path) -> GitResult<PathBuf> {
            self.toplevel_calls.borrow_mut().push(dir.to_path_buf());
            self.toplevel.clone().ok_or_else(|| GitError::CommandFailed {
                code: Some(128),
                stderr: "fatal: not a git repository".to_string(),
            })
        }

        fn shallow_clone(&self, url: &str, branch: &str, dest: &Path) -> GitResult<()> {
            self.clone_calls
                .borrow_mut()
                .push((url.to_string(), branch.to_string(), dest.to_path_buf()));
            if self.clone_fails {
                return Err(GitError::CommandFailed {
                    code: Some(128),
                    stderr: "fatal: repository not found".to_string(),
                });
            }
            if self.create_on_clone {
                fs::create_dir_all(dest).unwrap();
            }
            Ok(())
        }
    }

    fn worktree(path: &str) -> DocumentOrigin {
        DocumentOrigin::Worktree {
            absolute_path: PathBuf::from(path),
        }
    }

    #[test]
    fn missing_cwd_defaults_to_process_directory() {
        let resolver = WorkdirResolver::new(FakeGit::default(), "/tmp/cache");
        let resolved = resolver.resolve(&worktree("/repo/x.adoc"), None);
        assert_eq!(resolved.path, std::env::current_dir().unwrap());
        assert!(resolved.diagnostics.is_empty());
    }

    #[test]
    fn expression_without_tokens_is_unchanged() {
        let resolver = WorkdirResolver::new(FakeGit::default(), "/tmp/cache");
        let resolved = resolver.resolve(&worktree("/repo/x.adoc"), Some("/opt/tools"));
        assert_eq!(resolved.path, PathBuf::from("/opt/tools"));
        assert!(resolver.git.toplevel_calls.borrow().is_empty());
    }

    #[test]
    fn project_dir_uses_git_root_of_document_directory() {
        let git = FakeGit {
            toplevel: Some(PathBuf::from("/repo")),
            ..Default::default()
        };
        let resolver = WorkdirResolver::new(git, "/tmp/cache");
        let resolved = resolver.resolve(
            &worktree("/repo/docs/modules/ROOT/pages/x.adoc"),
            Some("$PROJECT_DIR/tools"),
        );

        assert_eq!(resolved.path, PathBuf::from("/repo/tools"));
        assert!(resolved.diagnostics.is_empty());
        assert_eq!(
            *resolver.git.toplevel_calls.borrow(),
            vec![PathBuf::from("/repo/docs/modules/ROOT/pages")]
        );
    }

    #[test]
    fn project_dir_for_directory_document_uses_directory_itself() {
        let dir = TempDir::new().unwrap();
        let git = FakeGit {
            toplevel: Some(PathBuf::from("/repo")),
            ..Default::default()
        };
        let resolver = WorkdirResolver::new(git, "/tmp/cache");
        resolver.resolve(
            &DocumentOrigin::Worktree {
                absolute_path: dir.path().to_path_buf(),
            },
            Some("$PROJECT_DIR"),
        );

        assert_eq!(*resolver.git.toplevel_calls.borrow(), vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn failed_git_lookup_leaves_placeholder() {
        let resolver = WorkdirResolver::new(FakeGit::default(), "/tmp/cache");
        let resolved = resolver.resolve(&worktree("/repo/x.adoc"), Some("$PROJECT_DIR/tools"));

        assert_eq!(resolved.path, PathBuf::from("$PROJECT_DIR/tools"));
        assert_eq!(resolved.diagnostics.len(), 1);
        assert!(matches!(
            resolved.diagnostics[0],
            Diagnostic::GitRootLookup { .. }
        ));
    }

    #[test]
    fn pwd_is_document_directory() {
        let resolver = WorkdirResolver::new(FakeGit::default(), "/tmp/cache");
        let resolved = resolver.resolve(&worktree("/repo/docs/x.adoc"), Some("$PWD/examples"));
        assert_eq!(resolved.path, PathBuf::from("/repo/docs/examples"));
        assert!(resolver.git.toplevel_calls.borrow().is_empty());
    }

    #[test]
    fn remote_reuses_existing_clone() {
        let cache = TempDir::new().unwrap();
        fs::create_dir_all(cache.path().join("mod-main")).unwrap();

        let resolver = WorkdirResolver::new(FakeGit::default(), cache.path());
        let origin = DocumentOrigin::remote("https://example.com/mod.git", "mod", "main");
        let resolved = resolver.resolve(&origin, Some("$PROJECT_DIR"));

        assert_eq!(resolved.path, cache.path().join("mod-main"));
        assert!(resolved.diagnostics.is_empty());
        assert!(resolver.git.clone_calls.borrow().is_empty());
    }

    #[test]
    fn remote_clones_once_when_absent() {
        let cache = TempDir::new().unwrap();
        let git = FakeGit {
            create_on_clone: true,
            ..Default::default()
        };
        let resolver = WorkdirResolver::new(git, cache.path());
        let origin = DocumentOrigin::remote("https://example.com/mod.git", "mod", "main");

        let first = resolver.resolve(&origin, Some("$PROJECT_DIR/bin"));
        let second = resolver.resolve(&origin, Some("$PROJECT_DIR/bin"));

        assert_eq!(first.path, cache.path().join("mod-main").join("bin"));
        assert_eq!(second.path, first.path);

        let calls = resolver.git.clone_calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://example.com/mod.git");
        assert_eq!(calls[0].1, "main");
        assert_eq!(calls[0].2, cache.path().join("mod-main"));
    }

    #[test]
    fn failed_clone_still_substitutes_target() {
        let cache = TempDir::new().unwrap();
        let git = FakeGit {
            clone_fails: true,
            ..Default::default()
        };
        let resolver = WorkdirResolver::new(git, cache.path());
        let origin = DocumentOrigin::remote("https://example.com/missing.git", "mod", "v1.0");

        let resolved = resolver.resolve(&origin, Some("$PROJECT_DIR"));

        assert_eq!(resolved.path, cache.path().join("mod-v1.0"));
        assert_eq!(resolved.diagnostics.len(), 1);
        assert!(matches!(resolved.diagnostics[0], Diagnostic::CloneFailed { .. }));
    }

    #[test]
    fn remote_pwd_uses_relative_path() {
        let cache = TempDir::new().unwrap();
        fs::create_dir_all(cache.path().join("mod-main")).unwrap();

        let resolver = WorkdirResolver::new(FakeGit::default(), cache.path());
        let origin = DocumentOrigin::remote("https://example.com/mod.git", "mod", "main")
            .with_relative_path("docs/modules/ROOT/pages/x.adoc");

        let resolved = resolver.resolve(&origin, Some("$PWD"));
        assert_eq!(
            resolved.path,
            cache.path().join("mod-main").join("docs/modules/ROOT/pages")
        );
    }

    #[test]
    fn remote_pwd_without_relative_path_is_clone_root() {
        let cache = TempDir::new().unwrap();
        fs::create_dir_all(cache.path().join("mod-main")).unwrap();

        let resolver = WorkdirResolver::new(FakeGit::default(), cache.path());
        let origin = DocumentOrigin::remote("https://example.com/mod.git", "mod", "main");

        let resolved = resolver.resolve(&origin, Some("$PWD/examples"));
        assert_eq!(resolved.path, cache.path().join("mod-main").join("examples"));
        assert!(resolver.git.clone_calls.borrow().is_empty());
    }

    #[test]
    fn clone_made_while_waiting_for_lock_is_reused() {
        let cache = TempDir::new().unwrap();
        let dest = cache.path().join("mod-main");
        let lock = File::create(cache.path().join(".mod-main.lock")).unwrap();
        lock.lock_exclusive().unwrap();

        let resolver = WorkdirResolver::new(FakeGit::default(), cache.path());
        let worker = std::thread::spawn(move || {
            let origin = DocumentOrigin::remote("https://example.com/mod.git", "mod", "main");
            let resolved = resolver.resolve(&origin, Some("$PROJECT_DIR"));
            (resolver, resolved)
        });

        // Another build finishes its clone while holding the lock
        std::thread::sleep(std::time::Duration::from_millis(100));
        fs::create_dir_all(&dest).unwrap();
        lock.unlock().unwrap();

        let (resolver, resolved) = worker.join().unwrap();
        assert_eq!(resolved.path, dest);
        assert!(resolved.diagnostics.is_empty());
        assert!(resolver.git.clone_calls.borrow().is_empty());
    }

    #[test]
    fn unlockable_cache_still_clones() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("not-a-directory");
        fs::write(&cache, "").unwrap();

        let resolver = WorkdirResolver::new(FakeGit::default(), &cache);
        let origin = DocumentOrigin::remote("https://example.com/mod.git", "mod", "main");
        let resolved = resolver.resolve(&origin, Some("$PROJECT_DIR"));

        assert_eq!(resolved.path, cache.join("mod-main"));
        assert!(resolved.diagnostics.is_empty());
        assert_eq!(resolver.git.clone_calls.borrow().len(), 1);
    }
}
