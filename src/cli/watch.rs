//! File watching for dev mode
//!
//! Watches content source directories and the playbook, debounces bursts of
//! changes and reports only files the site build reads.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tracing::debug;

/// How often the stop flag is checked while waiting for events
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Extensions whose changes trigger a rebuild
const WATCHED_EXTENSIONS: &[&str] = &["adoc", "yml", "yaml"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Relevant files changed
    Changed(Vec<PathBuf>),

    /// The watcher reported an error
    Error(String),
}

/// Watches `roots` until `stop` is set, calling `on_event` for each
/// debounced batch of relevant changes
pub fn watch<F>(
    roots: &[PathBuf],
    ignore: &[PathBuf],
    debounce: Duration,
    stop: &AtomicBool,
    mut on_event: F,
) -> Result<()>
where
    F: FnMut(WatchEvent),
{
    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(debounce, tx).context("Failed to create file watcher")?;

    for root in roots {
        let mode = if root.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer
            .watcher()
            .watch(root, mode)
            .with_context(|| format!("Failed to watch {}", root.display()))?;
        debug!(path = %root.display(), "watching");
    }

    let ignore: Vec<PathBuf> = ignore.iter().map(|p| normalize(p)).collect();

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(Ok(events)) => {
                let mut changed: Vec<PathBuf> = events
                    .into_iter()
                    .map(|e| e.path)
                    .filter(|p| is_relevant(p, &ignore))
                    .collect();
                changed.sort();
                changed.dedup();

                if !changed.is_empty() {
                    on_event(WatchEvent::Changed(changed));
                }
            }
            Ok(Err(error)) => on_event(WatchEvent::Error(format!("{:?}", error))),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Returns true if a changed path should trigger a rebuild
pub fn is_relevant(path: &Path, ignore: &[PathBuf]) -> bool {
    if ignore.iter().any(|dir| path.starts_with(dir)) {
        return false;
    }

    if path
        .components()
        .any(|c| c.as_os_str() == ".git" || c.as_os_str() == "node_modules")
    {
        return false;
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WATCHED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// True if `paths` contains `target`, comparing canonical forms
pub fn contains_path(paths: &[PathBuf], target: &Path) -> bool {
    let target = normalize(target);
    paths.iter().any(|p| normalize(p) == target)
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}
