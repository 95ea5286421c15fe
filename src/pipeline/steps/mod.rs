// src/pipeline/steps/mod.rs

//! Transformation steps.
//!
//! Each step wraps one external collaborator and is a pure function from a
//! [`FileSet`] to a new [`FileSet`]. Files a step does not understand (by
//! extension) pass through unchanged, so steps can be chained freely.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{StepConfig, StepKind};
use crate::errors::Result;
use crate::mode::Mode;
use crate::pipeline::files::FileSet;

pub mod command;
pub mod scripts;
pub mod styles;
pub mod template;

pub use command::CommandStep;
pub use scripts::{BundleStep, MinifyJsStep};
pub use styles::{AutoprefixStep, MinifyCssStep, ScssStep, SourceMapStep};
pub use template::TemplateStep;

/// One transformation in a pipeline.
pub trait Step: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Transform the whole set. Any error fails the enclosing pipeline run.
    fn apply(&self, files: FileSet) -> Result<FileSet>;
}

/// Inputs the built-in steps need besides the files themselves.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub mode: Mode,
    /// Absolute source root: template include root, SCSS load path, source
    /// map `sources` base.
    pub src_root: PathBuf,
    /// Browser name -> major version, for vendor prefixing.
    pub targets: BTreeMap<String, u32>,
}

impl StepContext {
    pub fn new(mode: Mode, src_root: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            src_root: src_root.into(),
            targets: BTreeMap::new(),
        }
    }

    pub fn with_targets(mut self, targets: BTreeMap<String, u32>) -> Self {
        self.targets = targets;
        self
    }
}

/// Turn the declarative step list into concrete steps for `ctx.mode`.
///
/// Mode-tagged steps are decided here, once, and never re-checked per file.
pub fn resolve_steps(specs: &[StepConfig], ctx: &StepContext) -> Vec<Arc<dyn Step>> {
    specs
        .iter()
        .filter(|spec| {
            let keep = ctx.mode.includes(spec.when);
            if !keep {
                debug!(step = spec.kind.label(), mode = %ctx.mode, "step skipped for mode");
            }
            keep
        })
        .map(|spec| build_step(&spec.kind, ctx))
        .collect()
}

fn build_step(kind: &StepKind, ctx: &StepContext) -> Arc<dyn Step> {
    match kind {
        StepKind::Template => Arc::new(TemplateStep::new(&ctx.src_root, ctx.mode)),
        StepKind::Scss => Arc::new(ScssStep::new(&ctx.src_root)),
        StepKind::Autoprefix => Arc::new(AutoprefixStep::new(ctx.targets.clone())),
        StepKind::MinifyCss => Arc::new(MinifyCssStep::new(ctx.targets.clone())),
        StepKind::SourceMap => Arc::new(SourceMapStep::new(&ctx.src_root)),
        StepKind::Bundle { name } => Arc::new(BundleStep::new(name)),
        StepKind::MinifyJs => Arc::new(MinifyJsStep),
        StepKind::Command { cmd, extension } => {
            Arc::new(CommandStep::new(cmd, extension.clone()))
        }
    }
}

/// Case-insensitive extension check.
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
