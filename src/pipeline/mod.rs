// src/pipeline/mod.rs

//! Pipeline runner: select source files by glob, push them through an
//! ordered chain of steps, write the result under a destination directory.
//!
//! - [`files`] holds the in-memory [`FileSet`] and source resolution.
//! - [`steps`] wraps the external transformation libraries as [`Step`]s.
//! - [`runner`] sequences a single run and its all-or-nothing write phase.

pub mod files;
pub mod runner;
pub mod steps;

pub use files::{resolve_sources, Asset, FileSet};
pub use runner::{Pipeline, PipelineOutcome};
pub use steps::{resolve_steps, Step, StepContext};
