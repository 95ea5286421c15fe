// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod mode;
pub mod pipeline;
pub mod reload;
pub mod server;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CliArgs;
use crate::config::load_or_builtin;
use crate::context::BuildContext;
use crate::dag::{TaskGraph, TaskNode, build_graph};
use crate::errors::AssetdagError;
use crate::mode::Mode;
use crate::pipeline::Pipeline;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - mode resolution (fails fast on conflicting flags)
/// - config loading (file or built-in)
/// - the frozen task graph
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mode = Mode::resolve(args.mode_flags())?;

    let root = project_root(args.config.as_deref())?;
    let mut cfg = load_or_builtin(args.config.as_deref(), &root)?;
    if let Some(port) = args.port {
        cfg.config.port = port;
    }

    let ctx = BuildContext::new(root, mode, cfg);
    let graph = build_graph(&ctx)?;
    if !graph.contains(&args.task) {
        return Err(AssetdagError::TaskNotFound(args.task).into());
    }

    if args.dry_run {
        print_dry_run(&ctx, &graph, &args.task);
        return Ok(());
    }

    info!(task = %args.task, %mode, root = ?ctx.root, "running");

    tokio::select! {
        res = graph.run(&args.task) => res?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl+C")?;
            info!("interrupted, shutting down");
        }
    }
    Ok(())
}

/// Directory all config paths are relative to.
///
/// - explicit config in a directory (e.g. "site/Assetdag.toml"): that directory;
/// - otherwise the current working directory.
fn project_root(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => std::env::current_dir().context("reading current directory"),
    }
}

fn print_dry_run(ctx: &BuildContext, graph: &TaskGraph, target: &str) {
    println!("assetdag dry-run");
    println!("  mode = {}", ctx.mode);
    println!("  task = {target}");
    println!("  src_root = {}", ctx.config.config.src_root);
    println!("  build_root = {}", ctx.config.config.build_root);
    println!(
        "  serve = {}:{}",
        ctx.config.config.host, ctx.config.config.port
    );
    println!();

    let step_ctx = ctx.step_context();
    println!("tasks:");
    for name in graph.task_names() {
        match graph.node(name) {
            Some(TaskNode::Series(members)) => println!("  - {name}: series {members:?}"),
            Some(TaskNode::Parallel(members)) => println!("  - {name}: parallel {members:?}"),
            Some(TaskNode::Action(_)) => match ctx.config.pipeline.get(name) {
                Some(cfg) => {
                    let pipeline = Pipeline::from_config(name, cfg, &step_ctx);
                    println!("  - {name}: pipeline ({})", cfg.asset);
                    println!("      src: {:?}", cfg.src);
                    println!("      dest: {}", cfg.dest);
                    println!("      steps: {:?}", pipeline.step_names());
                }
                None => println!("  - {name}: built-in"),
            },
            None => {}
        }
    }

    if !ctx.config.watch.is_empty() {
        println!();
        println!("watch:");
        for binding in ctx.config.watch.iter() {
            println!("  - {} -> {}", binding.pattern, binding.task);
        }
    }
}
