use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Asset class produced by a pipeline; scopes reload notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Page,
    Style,
    Script,
    Image,
    Font,
}

impl AssetClass {
    /// How connected clients should react to a change of this class.
    ///
    /// Stylesheets can be swapped in place; everything else needs a reload.
    pub fn reload_scope(self) -> ReloadScope {
        match self {
            AssetClass::Style => ReloadScope::InPlace,
            _ => ReloadScope::FullReload,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Page => "page",
            AssetClass::Style => "style",
            AssetClass::Script => "script",
            AssetClass::Image => "image",
            AssetClass::Font => "font",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReloadScope {
    FullReload,
    InPlace,
}

/// Mode an optional step or composition member is restricted to.
///
/// This is the `when = "development"` field in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeTag {
    Development,
    Production,
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeTag::Development => f.write_str("development"),
            ModeTag::Production => f.write_str("production"),
        }
    }
}
