// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetdagError, Result};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Assetdag.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (name resolution, DAG correctness, etc.). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks names, globs, build root sanity and DAG acyclicity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for a run.
///
/// - `Some(path)`: the file must exist.
/// - `None`: use `Assetdag.toml` under `root` when present, otherwise the
///   built-in configuration.
pub fn load_or_builtin(explicit: Option<&Path>, root: &Path) -> Result<ConfigFile> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(AssetdagError::ConfigError(format!(
                    "config file {:?} does not exist",
                    path
                )));
            }
            info!(path = ?path, "loading config");
            load_and_validate(path)
        }
        None => {
            let candidate = root.join(DEFAULT_CONFIG_FILE);
            if candidate.is_file() {
                info!(path = ?candidate, "loading config");
                load_and_validate(&candidate)
            } else {
                info!("no {DEFAULT_CONFIG_FILE} found, using built-in configuration");
                ConfigFile::builtin()
            }
        }
    }
}
