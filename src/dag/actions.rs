// src/dag/actions.rs

//! Leaf actions: pipeline runs and the `clean`, `watch` and `serve` built-ins.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::config::model::WatchBindingConfig;
use crate::dag::graph::{GraphInvoker, TaskGraph};
use crate::dag::registry::{TaskAction, TaskFuture};
use crate::errors::AssetdagError;
use crate::pipeline::Pipeline;
use crate::reload::ReloadHub;
use crate::server::DevServer;
use crate::watch::{WatchController, build_bindings};

/// Runs one pipeline on the blocking pool.
#[derive(Debug, Clone)]
pub struct PipelineAction {
    pipeline: Arc<Pipeline>,
    root: PathBuf,
    hub: ReloadHub,
}

impl PipelineAction {
    pub fn new(pipeline: Pipeline, root: impl Into<PathBuf>, hub: ReloadHub) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            root: root.into(),
            hub,
        }
    }
}

impl TaskAction for PipelineAction {
    fn run(&self, _graph: Arc<TaskGraph>) -> TaskFuture<'_> {
        let pipeline = Arc::clone(&self.pipeline);
        let root = self.root.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let name = pipeline.name().to_string();
            let outcome = tokio::task::spawn_blocking(move || pipeline.run(&root, &hub))
                .await
                .map_err(|e| anyhow!("pipeline '{name}' panicked or was cancelled: {e}"))??;
            debug!(pipeline = %name, written = outcome.written.len(), "pipeline run complete");
            Ok(())
        })
    }
}

/// Removes the build root. A missing build root is already clean.
#[derive(Debug, Clone)]
pub struct CleanAction {
    build_dir: PathBuf,
}

impl CleanAction {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }
}

impl TaskAction for CleanAction {
    fn run(&self, _graph: Arc<TaskGraph>) -> TaskFuture<'_> {
        Box::pin(async move {
            match tokio::fs::remove_dir_all(&self.build_dir).await {
                Ok(()) => {
                    info!(dir = ?self.build_dir, "removed build directory");
                    Ok(())
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(dir = ?self.build_dir, "build directory absent, nothing to clean");
                    Ok(())
                }
                Err(err) => Err(AssetdagError::IoError(err)),
            }
        })
    }
}

/// Starts the watch controller and keeps it alive for the rest of the process.
#[derive(Debug, Clone)]
pub struct WatchAction {
    root: PathBuf,
    watch_dir: PathBuf,
    bindings: Vec<WatchBindingConfig>,
}

impl WatchAction {
    pub fn new(
        root: impl Into<PathBuf>,
        watch_dir: impl Into<PathBuf>,
        bindings: Vec<WatchBindingConfig>,
    ) -> Self {
        Self {
            root: root.into(),
            watch_dir: watch_dir.into(),
            bindings,
        }
    }
}

impl TaskAction for WatchAction {
    fn run(&self, graph: Arc<TaskGraph>) -> TaskFuture<'_> {
        Box::pin(async move {
            let bindings = build_bindings(&self.bindings)?;
            let mut controller = WatchController::new(&self.root, &self.watch_dir, bindings);
            let _handle = controller.start(Arc::new(GraphInvoker::new(graph)))?;
            std::future::pending::<()>().await;
            Ok(())
        })
    }
}

/// Serves the build root until the process ends.
#[derive(Debug, Clone)]
pub struct ServeAction {
    addr: SocketAddr,
    build_dir: PathBuf,
    hub: ReloadHub,
}

impl ServeAction {
    pub fn new(addr: SocketAddr, build_dir: impl Into<PathBuf>, hub: ReloadHub) -> Self {
        Self {
            addr,
            build_dir: build_dir.into(),
            hub,
        }
    }
}

impl TaskAction for ServeAction {
    fn run(&self, _graph: Arc<TaskGraph>) -> TaskFuture<'_> {
        Box::pin(async move {
            let server = DevServer::bind(self.addr, &self.build_dir, self.hub.clone()).await?;
            server.run().await
        })
    }
}
