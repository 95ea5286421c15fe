// src/pipeline/runner.rs

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::model::PipelineConfig;
use crate::errors::{AssetdagError, Result};
use crate::pipeline::files::{FileSet, resolve_sources};
use crate::pipeline::steps::{Step, StepContext, resolve_steps};
use crate::reload::ReloadHub;
use crate::types::{AssetClass, TaskName};

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Number of source files selected.
    pub inputs: usize,
    /// Files written, relative to the destination directory.
    pub written: Vec<PathBuf>,
}

impl PipelineOutcome {
    pub fn is_noop(&self) -> bool {
        self.inputs == 0
    }
}

/// A select -> transform -> write sequence with a fixed, mode-resolved step list.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: TaskName,
    asset: AssetClass,
    sources: Vec<String>,
    dest: PathBuf,
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    pub fn new(
        name: impl Into<TaskName>,
        asset: AssetClass,
        sources: Vec<String>,
        dest: impl Into<PathBuf>,
        steps: Vec<Arc<dyn Step>>,
    ) -> Self {
        Self {
            name: name.into(),
            asset,
            sources,
            dest: dest.into(),
            steps,
        }
    }

    /// Build from config, keeping only the steps that apply in `ctx.mode`.
    pub fn from_config(name: &str, cfg: &PipelineConfig, ctx: &StepContext) -> Self {
        Self::new(
            name,
            cfg.asset,
            cfg.src.clone(),
            cfg.dest.clone(),
            resolve_steps(&cfg.steps, ctx),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn asset(&self) -> AssetClass {
        self.asset
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Select sources and apply every step, without touching the destination.
    pub fn transform(&self, root: &Path) -> Result<(usize, FileSet)> {
        let mut files = resolve_sources(root, &self.sources)?;
        let inputs = files.len();
        if inputs == 0 {
            return Ok((0, files));
        }

        for step in self.steps.iter() {
            debug!(pipeline = %self.name, step = step.name(), files = files.len(), "applying step");
            files = step.apply(files)?;
        }
        Ok((inputs, files))
    }

    /// Run the pipeline once.
    ///
    /// Nothing is written unless every step succeeded, so a failed run leaves
    /// the previous output in place. An empty source set is a successful
    /// no-op that writes nothing and notifies nobody.
    pub fn run(&self, root: &Path, hub: &ReloadHub) -> Result<PipelineOutcome> {
        let (inputs, files) = self.transform(root)?;
        if inputs == 0 {
            info!(pipeline = %self.name, "no source files matched, nothing to build");
            return Ok(PipelineOutcome::default());
        }

        for rel in files.paths() {
            ensure_inside(&self.name, rel)?;
        }

        let dest = root.join(&self.dest);
        let mut written = Vec::with_capacity(files.len());
        for (rel, asset) in files {
            let target = dest.join(&rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &asset.contents)?;
            written.push(rel);
        }

        info!(
            pipeline = %self.name,
            inputs,
            outputs = written.len(),
            dest = ?dest,
            "pipeline wrote output"
        );

        if !written.is_empty() {
            hub.broadcast(self.asset);
        }

        Ok(PipelineOutcome { inputs, written })
    }
}

/// Output paths come from steps (bundle names, commands); keep them under `dest`.
fn ensure_inside(pipeline: &str, rel: &Path) -> Result<()> {
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || rel.as_os_str().is_empty() {
        return Err(AssetdagError::transform(
            "write",
            rel.display(),
            format!("output path escapes the destination of pipeline '{pipeline}'"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Moves every file to a fixed output path.
    #[derive(Debug)]
    struct RenameTo(&'static str);

    impl Step for RenameTo {
        fn name(&self) -> &str {
            "rename"
        }

        fn apply(&self, files: FileSet) -> Result<FileSet> {
            Ok(files
                .into_iter()
                .map(|(_, asset)| (PathBuf::from(self.0), asset))
                .collect())
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/data/nested")).unwrap();
        fs::write(dir.path().join("src/data/a.txt"), "a").unwrap();
        fs::write(dir.path().join("src/data/nested/b.txt"), "b").unwrap();
        dir
    }

    fn pipeline(steps: Vec<Arc<dyn Step>>) -> Pipeline {
        Pipeline::new(
            "data",
            AssetClass::Font,
            vec!["src/data/**/*.txt".to_string()],
            "build/data",
            steps,
        )
    }

    #[test]
    fn copies_relative_to_glob_base_and_notifies_once() {
        let dir = project();
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        let outcome = pipeline(Vec::new()).run(dir.path(), &hub).unwrap();

        assert_eq!(outcome.inputs, 2);
        assert_eq!(
            outcome.written,
            vec![PathBuf::from("a.txt"), PathBuf::from("nested/b.txt")]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("build/data/nested/b.txt")).unwrap(),
            "b"
        );
        assert_eq!(rx.try_recv().unwrap().asset, AssetClass::Font);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn output_escaping_dest_is_rejected_before_writing() {
        let dir = project();
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        let err = pipeline(vec![Arc::new(RenameTo("../escape.txt"))])
            .run(dir.path(), &hub)
            .unwrap_err();

        assert!(matches!(err, AssetdagError::Transform { ref step, .. } if step == "write"));
        assert!(!dir.path().join("build").exists());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn transform_leaves_disk_untouched() {
        let dir = project();
        let (inputs, files) = pipeline(vec![Arc::new(RenameTo("one.txt"))])
            .transform(dir.path())
            .unwrap();

        assert_eq!(inputs, 2);
        assert_eq!(files.len(), 1);
        assert_eq!(files.get("one.txt").map(|a| a.contents.as_slice()), Some(&b"b"[..]));
        assert!(!dir.path().join("build").exists());
    }
}
