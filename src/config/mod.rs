// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Provide the built-in configuration used when no file is present (`builtin.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate names, globs and DAG correctness (`validate.rs`).

pub mod builtin;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_builtin, DEFAULT_CONFIG_FILE};
pub use model::{
    ConfigFile, ConfigSection, MemberSpec, PipelineConfig, RawConfigFile, StepConfig, StepKind,
    TaskConfig, WatchBindingConfig, BUILTIN_TASKS,
};
