// src/watch/controller.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::types::TaskName;
use crate::watch::patterns::{WatchBinding, to_match_str};

/// Something that can start a task run in the background.
///
/// The controller never waits for the run; failures are the invoker's to
/// report. Production code uses the task graph (see `dag::GraphInvoker`);
/// tests record the names.
pub trait TaskInvoker: Send + Sync {
    fn invoke(&self, task: TaskName);
}

/// Lifecycle of the controller. There is no way back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Turns filesystem changes under the project into task invocations.
pub struct WatchController {
    root: PathBuf,
    watch_dir: PathBuf,
    bindings: Arc<Vec<WatchBinding>>,
    state: WatchState,
}

impl WatchController {
    /// - `root` is the project root all binding patterns are relative to.
    /// - `watch_dir` is the directory observed recursively (usually the
    ///   source root); falls back to `root` when it does not exist.
    pub fn new(
        root: impl Into<PathBuf>,
        watch_dir: impl Into<PathBuf>,
        bindings: Vec<WatchBinding>,
    ) -> Self {
        Self {
            root: root.into(),
            watch_dir: watch_dir.into(),
            bindings: Arc::new(bindings),
            state: WatchState::Idle,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Tasks bound to any of `paths`, each listed once, in binding order.
    pub fn tasks_for_paths(&self, paths: &[PathBuf]) -> Vec<TaskName> {
        tasks_for_paths(&self.root, &self.bindings, paths)
    }

    /// React to one filesystem event: invoke every bound task once.
    ///
    /// Returns the number of invocations scheduled.
    pub fn handle_event(&self, event: &Event, invoker: &dyn TaskInvoker) -> usize {
        handle_event(&self.root, &self.bindings, event, invoker)
    }

    /// Start observing the filesystem. Transitions `Idle -> Watching`.
    ///
    /// Must be called from inside a Tokio runtime; events are processed on a
    /// spawned task for as long as the returned handle lives.
    pub fn start(&mut self, invoker: Arc<dyn TaskInvoker>) -> Result<WatcherHandle> {
        if self.state == WatchState::Watching {
            anyhow::bail!("watch controller already started");
        }

        // Canonicalize once so we have a stable base path for relativizing.
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let watch_dir = if self.watch_dir.is_dir() {
            self.watch_dir
                .canonicalize()
                .unwrap_or_else(|_| self.watch_dir.clone())
        } else {
            warn!(dir = ?self.watch_dir, "watch directory missing, watching project root");
            root.clone()
        };

        // Channel from the blocking notify callback into the async world.
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // Not inside a tracing span here; fall back to stderr.
                        eprintln!("assetdag: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("assetdag: file watch error: {err}");
                }
            },
            Config::default(),
        )
        .context("creating filesystem watcher")?;

        watcher
            .watch(&watch_dir, RecursiveMode::Recursive)
            .with_context(|| format!("watching {:?}", watch_dir))?;

        info!(
            dir = ?watch_dir,
            bindings = self.bindings.len(),
            "file watcher started"
        );

        let bindings = Arc::clone(&self.bindings);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(?event, "received notify event");
                handle_event(&root, &bindings, &event, invoker.as_ref());
            }
            debug!("watcher event loop finished");
        });

        self.state = WatchState::Watching;
        Ok(WatcherHandle { _inner: watcher })
    }
}

/// Only content-changing events count; access/open/close notifications
/// would otherwise double every save.
fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn handle_event(
    root: &Path,
    bindings: &[WatchBinding],
    event: &Event,
    invoker: &dyn TaskInvoker,
) -> usize {
    if !is_change(&event.kind) {
        return 0;
    }

    let tasks = tasks_for_paths(root, bindings, &event.paths);
    for task in tasks.iter() {
        info!(task = %task, "change detected, rebuilding");
        invoker.invoke(task.clone());
    }
    tasks.len()
}

fn tasks_for_paths(root: &Path, bindings: &[WatchBinding], paths: &[PathBuf]) -> Vec<TaskName> {
    let mut seen = BTreeSet::new();
    let mut tasks = Vec::new();

    for path in paths {
        let Some(rel) = relative_str(root, path) else {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            continue;
        };

        for binding in bindings {
            if binding.matches(&rel) && seen.insert(binding.task().to_string()) {
                debug!(task = %binding.task(), path = %rel, pattern = %binding.pattern(), "watch match");
                tasks.push(binding.task().to_string());
            }
        }
    }

    tasks
}

/// Path relative to `root`, forward slashes.
///
/// Relative inputs are taken as already relative to `root`. Absolute ones are
/// stripped directly first, then retried after canonicalizing the parent
/// (removed files cannot be canonicalized themselves, and on macOS the event
/// paths may come back under `/private/var/...`).
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if path.is_relative() {
        return Some(to_match_str(path));
    }

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_match_str(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let parent = path.parent()?.canonicalize().ok()?;
    let full = parent.join(path.file_name()?);
    full.strip_prefix(&root_canon).ok().map(to_match_str)
}
