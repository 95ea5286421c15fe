// src/pipeline/files.rs

//! In-memory file sets and source resolution.

use std::collections::btree_map;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{AssetdagError, Result};
use crate::watch::patterns::{compile_glob, glob_base, to_match_str};

/// One file flowing through a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Asset {
    pub contents: Vec<u8>,
    /// Absolute path of the file this asset was read from, if any.
    pub origin: Option<PathBuf>,
}

impl Asset {
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            origin: None,
        }
    }

    pub fn with_origin(contents: impl Into<Vec<u8>>, origin: impl Into<PathBuf>) -> Self {
        Self {
            contents: contents.into(),
            origin: Some(origin.into()),
        }
    }

    /// Contents as UTF-8, or a transform error attributed to `step`.
    pub fn into_text(self, step: &str, rel: &Path) -> Result<(String, Option<PathBuf>)> {
        let origin = self.origin;
        let text = String::from_utf8(self.contents)
            .map_err(|e| AssetdagError::transform(step, rel.display(), e))?;
        Ok((text, origin))
    }
}

/// Set of `(relative output path, asset)` pairs, ordered by path.
///
/// The ordering is what makes two runs over the same sources produce the
/// same bytes (bundles concatenate in this order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<PathBuf, Asset>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rel: impl Into<PathBuf>, asset: Asset) -> Option<Asset> {
        self.files.insert(rel.into(), asset)
    }

    pub fn get(&self, rel: impl AsRef<Path>) -> Option<&Asset> {
        self.files.get(rel.as_ref())
    }

    pub fn contains(&self, rel: impl AsRef<Path>) -> bool {
        self.files.contains_key(rel.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(|p| p.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Asset)> {
        self.files.iter().map(|(p, a)| (p.as_path(), a))
    }
}

impl IntoIterator for FileSet {
    type Item = (PathBuf, Asset);
    type IntoIter = btree_map::IntoIter<PathBuf, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl FromIterator<(PathBuf, Asset)> for FileSet {
    fn from_iter<T: IntoIterator<Item = (PathBuf, Asset)>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Read every file matched by `patterns` (relative to `root`).
///
/// Each file is keyed by its path below the pattern's base directory. A file
/// matched by more than one pattern is read once, under the first pattern.
/// Patterns whose base directory does not exist simply contribute nothing.
pub fn resolve_sources(root: &Path, patterns: &[String]) -> Result<FileSet> {
    let mut set = FileSet::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        let matcher = compile_glob(pattern).map_err(|e| {
            AssetdagError::ConfigError(format!("invalid source pattern '{pattern}': {e}"))
        })?;
        let base = root.join(glob_base(pattern));
        if !base.is_dir() {
            debug!(pattern = %pattern, base = ?base, "source base missing, nothing to select");
            continue;
        }

        let walker = WalkDir::new(&base).follow_links(false).sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Ok(rel_to_root) = path.strip_prefix(root) else {
                continue;
            };
            if !matcher.is_match(to_match_str(rel_to_root)) {
                continue;
            }
            if !seen.insert(path.to_path_buf()) {
                continue;
            }

            let rel = path.strip_prefix(&base).unwrap_or(rel_to_root).to_path_buf();
            let contents = fs::read(path)?;
            set.insert(rel, Asset::with_origin(contents, path));
        }
    }

    debug!(patterns = ?patterns, files = set.len(), "resolved sources");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_relative_to_pattern_base() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/styles/parts")).unwrap();
        fs::write(root.join("src/styles/main.scss"), "a{}").unwrap();
        fs::write(root.join("src/styles/parts/_x.scss"), "b{}").unwrap();
        fs::write(root.join("src/styles/notes.txt"), "no").unwrap();

        let set = resolve_sources(root, &["src/styles/**/*.scss".to_string()]).unwrap();
        let paths: Vec<_> = set.paths().map(to_match_str).collect();
        assert_eq!(paths, vec!["main.scss", "parts/_x.scss"]);
        assert_eq!(
            set.get("main.scss").unwrap().origin.as_deref(),
            Some(root.join("src/styles/main.scss").as_path())
        );
    }

    #[test]
    fn missing_base_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let set = resolve_sources(dir.path(), &["src/fonts/**/*".to_string()]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn overlapping_patterns_read_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/index.html"), "<p>").unwrap();

        let set = resolve_sources(
            root,
            &["src/*.html".to_string(), "src/**/*.html".to_string()],
        )
        .unwrap();
        assert_eq!(set.len(), 1);
    }
}
