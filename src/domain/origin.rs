//! Where the document being processed comes from

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Physical or logical location of the current document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentOrigin {
    /// The document is a real file (or directory) on local disk
    Worktree { absolute_path: PathBuf },

    /// The document was fetched from a remote repository that has no local worktree
    RemoteReference {
        repository_url: String,
        component: String,
        branch_or_tag: String,
        /// Path of the document inside the repository, if known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<PathBuf>,
    },
}

impl DocumentOrigin {
    /// Creates a worktree origin, making the path absolute against the current directory
    pub fn worktree(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        Self::Worktree { absolute_path }
    }

    pub fn remote(
        repository_url: impl Into<String>,
        component: impl Into<String>,
        branch_or_tag: impl Into<String>,
    ) -> Self {
        Self::RemoteReference {
            repository_url: repository_url.into(),
            component: component.into(),
            branch_or_tag: branch_or_tag.into(),
            relative_path: None,
        }
    }

    /// Sets the in-repository path of a remote document (no-op for worktrees)
    pub fn with_relative_path(mut self, path: impl Into<PathBuf>) -> Self {
        if let Self::RemoteReference { relative_path, .. } = &mut self {
            *relative_path = Some(path.into());
        }
        self
    }

    /// Name used for the document in command output
    pub fn display_name(&self) -> String {
        match self {
            Self::Worktree { absolute_path } => absolute_path.display().to_string(),
            Self::RemoteReference {
                repository_url,
                branch_or_tag,
                relative_path,
                ..
            } => match relative_path {
                Some(path) => format!("{}@{}:{}", repository_url, branch_or_tag, path.display()),
                None => format!("{}@{}", repository_url, branch_or_tag),
            },
        }
    }
}
