// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::mode::ModeFlags;

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build, watch and serve static front-end assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run (a pipeline, a composition, or clean/watch/serve).
    #[arg(value_name = "TASK", default_value = "default")]
    pub task: String,

    /// Development mode: source maps, watch + serve.
    #[arg(long)]
    pub development: bool,

    /// Production mode: minified output.
    #[arg(long)]
    pub production: bool,

    /// Path to the config file (TOML).
    ///
    /// Default: `Assetdag.toml` in the current directory, or the built-in
    /// configuration when that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Dev server port, overriding `[config].port`.
    #[arg(long, value_name = "N")]
    pub port: Option<u16>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve mode, config and task graph, print them, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            development: self.development,
            production: self.production,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
