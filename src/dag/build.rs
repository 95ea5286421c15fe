// src/dag/build.rs

use std::sync::Arc;

use tracing::debug;

use crate::config::model::TaskConfig;
use crate::context::BuildContext;
use crate::dag::actions::{CleanAction, PipelineAction, ServeAction, WatchAction};
use crate::dag::graph::TaskGraph;
use crate::dag::registry::TaskRegistry;
use crate::errors::Result;
use crate::mode::Mode;
use crate::pipeline::Pipeline;
use crate::types::TaskName;

/// Register every pipeline, composition and built-in of `ctx.config` and
/// freeze the result.
///
/// Mode-tagged composition members and pipeline steps are resolved here, so
/// the frozen graph is specific to `ctx.mode`.
pub fn build_graph(ctx: &BuildContext) -> Result<Arc<TaskGraph>> {
    let mut registry = TaskRegistry::new();
    let step_ctx = ctx.step_context();

    for (name, cfg) in ctx.config.pipeline.iter() {
        let pipeline = Pipeline::from_config(name, cfg, &step_ctx);
        debug!(pipeline = %name, steps = ?pipeline.step_names(), "resolved pipeline");
        registry.register(
            name.as_str(),
            Arc::new(PipelineAction::new(pipeline, &ctx.root, ctx.hub.clone())),
        )?;
    }

    registry.register("clean", Arc::new(CleanAction::new(ctx.build_dir())))?;
    registry.register(
        "watch",
        Arc::new(WatchAction::new(
            &ctx.root,
            ctx.src_dir(),
            ctx.config.watch.clone(),
        )),
    )?;
    registry.register(
        "serve",
        Arc::new(ServeAction::new(
            ctx.server_addr()?,
            ctx.build_dir(),
            ctx.hub.clone(),
        )),
    )?;

    for (name, task) in ctx.config.task.iter() {
        let members = members_for_mode(task, ctx.mode);
        if task.series.is_some() {
            registry.register_series(name.as_str(), members)?;
        } else {
            registry.register_parallel(name.as_str(), members)?;
        }
    }

    registry.freeze()
}

/// Member names of a composition that take part in `mode`.
pub fn members_for_mode(task: &TaskConfig, mode: Mode) -> Vec<TaskName> {
    task.members()
        .filter(|m| mode.includes(m.when()))
        .map(|m| m.name().to_string())
        .collect()
}
