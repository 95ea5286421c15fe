// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Both `--development` and `--production` were given.
    #[error("Conflicting mode flags: {0}")]
    ConfigConflict(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A pipeline step rejected its input.
    #[error("step '{step}' failed on {path}: {message}")]
    Transform {
        step: String,
        path: String,
        message: String,
    },

    /// A child of a composed task failed.
    #[error("task '{task}' aborted: member '{child}' failed")]
    CompositionAbort {
        task: String,
        child: String,
        #[source]
        source: Box<AssetdagError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetdagError {
    pub(crate) fn transform(
        step: &str,
        path: impl std::fmt::Display,
        message: impl std::fmt::Display,
    ) -> Self {
        AssetdagError::Transform {
            step: step.to_string(),
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Walk down `CompositionAbort` wrappers to the error that started it.
    pub fn root_cause(&self) -> &AssetdagError {
        match self {
            AssetdagError::CompositionAbort { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
