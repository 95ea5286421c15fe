// src/watch/patterns.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::config::model::{ConfigFile, WatchBindingConfig};
use crate::types::TaskName;

/// Compile a single glob with gulp-like semantics: `*` stays inside one path
/// segment, `**` crosses directories.
///
/// Used for both watch bindings and pipeline sources so a pattern means the
/// same thing in both places.
pub fn compile_glob(pattern: &str) -> std::result::Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// Leading directory of a pattern that contains no glob metacharacters.
///
/// `src/styles/**/*.scss` -> `src/styles`, `src/*.html` -> `src`,
/// `*.txt` -> `` (the project root).
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let segments: Vec<&str> = pattern.split('/').collect();

    // The final segment names files, never part of the base.
    let dirs = segments.len().saturating_sub(1);
    for segment in &segments[..dirs] {
        if segment.contains(['*', '?', '[', '{']) {
            break;
        }
        if segment.is_empty() || *segment == "." {
            continue;
        }
        base.push(segment);
    }
    base
}

/// Normalise a relative path to the forward-slash form globs are matched against.
pub fn to_match_str(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Compiled `(pattern, task)` relation.
///
/// The pattern is relative to the project root; the controller passes
/// relative, forward-slash paths (e.g. `"src/styles/main.scss"`) into
/// [`WatchBinding::matches`].
#[derive(Clone)]
pub struct WatchBinding {
    pattern: String,
    task: TaskName,
    matcher: GlobMatcher,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("pattern", &self.pattern)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(pattern: &str, task: impl Into<TaskName>) -> Result<Self> {
        let task = task.into();
        let matcher = compile_glob(pattern)
            .with_context(|| format!("invalid watch pattern '{pattern}' for task {task}"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            task,
            matcher,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// Compile every `[[watch]]` entry of a validated config.
pub fn build_bindings(specs: &[WatchBindingConfig]) -> Result<Vec<WatchBinding>> {
    specs
        .iter()
        .map(|spec| WatchBinding::new(&spec.pattern, spec.task.clone()))
        .collect()
}

/// Convenience wrapper over [`build_bindings`] for a whole config.
pub fn build_bindings_from_config(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    build_bindings(&cfg.watch)
}
