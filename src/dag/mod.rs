// src/dag/mod.rs

//! Task registry and execution.
//!
//! - [`registry`] collects named actions and compositions and freezes them.
//! - [`graph`] runs tasks from the frozen graph (series / parallel semantics).
//! - [`actions`] holds the leaf actions: pipelines, `clean`, `watch`, `serve`.
//! - [`build`] turns a validated config into a graph for one mode.

pub mod actions;
pub mod build;
pub mod graph;
pub mod registry;

pub use actions::{CleanAction, PipelineAction, ServeAction, WatchAction};
pub use build::{build_graph, members_for_mode};
pub use graph::{GraphInvoker, TaskGraph};
pub use registry::{TaskAction, TaskFuture, TaskNode, TaskRegistry, action_fn};
