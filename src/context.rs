// src/context.rs

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::model::ConfigFile;
use crate::errors::{AssetdagError, Result};
use crate::mode::Mode;
use crate::pipeline::StepContext;
use crate::reload::ReloadHub;

/// Everything a task needs at run time, fixed at startup.
///
/// Cheap to clone; the config is shared and the hub is a channel handle.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub root: PathBuf,
    pub mode: Mode,
    pub config: Arc<ConfigFile>,
    pub hub: ReloadHub,
}

impl BuildContext {
    pub fn new(root: impl Into<PathBuf>, mode: Mode, config: ConfigFile) -> Self {
        Self {
            root: root.into(),
            mode,
            config: Arc::new(config),
            hub: ReloadHub::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.config.config.src_root)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.config.config.build_root)
    }

    /// Listen address of the dev server from `[config].host`/`port`.
    pub fn server_addr(&self) -> Result<SocketAddr> {
        let host = self.config.config.host.as_str();
        let port = self.config.config.port;
        (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                AssetdagError::ConfigError(format!("host '{host}' did not resolve to an address"))
            })
    }

    pub fn step_context(&self) -> StepContext {
        StepContext::new(self.mode, self.src_dir()).with_targets(self.config.config.targets.clone())
    }
}
