// src/mode.rs

//! Build mode resolution.
//!
//! The mode is derived once from the process flags and then handed around by
//! value; nothing mutates it after startup.

use std::fmt;

use crate::errors::{AssetdagError, Result};
use crate::types::ModeTag;

/// Raw presence/absence flags as given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub development: bool,
    pub production: bool,
}

/// Resolved build mode.
///
/// `Plain` is the "neither flag set" state: a one-shot build that applies
/// only untagged steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Plain,
    Development,
    Production,
}

impl Mode {
    /// Resolve the mode from the process flags.
    ///
    /// Both flags at once is rejected rather than picking a winner.
    pub fn resolve(flags: ModeFlags) -> Result<Mode> {
        match (flags.development, flags.production) {
            (true, true) => Err(AssetdagError::ConfigConflict(
                "--development and --production are mutually exclusive".to_string(),
            )),
            (true, false) => Ok(Mode::Development),
            (false, true) => Ok(Mode::Production),
            (false, false) => Ok(Mode::Plain),
        }
    }

    /// Whether an item tagged with `when` participates in this mode.
    pub fn includes(self, when: Option<ModeTag>) -> bool {
        match when {
            None => true,
            Some(ModeTag::Development) => self == Mode::Development,
            Some(ModeTag::Production) => self == Mode::Production,
        }
    }

    pub fn source_maps(self) -> bool {
        self == Mode::Development
    }

    pub fn minify(self) -> bool {
        self == Mode::Production
    }

    /// Watching and serving are only wired up in development.
    pub fn watch(self) -> bool {
        self == Mode::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Plain => "plain",
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
