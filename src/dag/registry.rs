// src/dag/registry.rs

//! Task registration.
//!
//! Tasks are registered once at startup and frozen into a [`TaskGraph`].
//! Freezing is the only way to obtain a graph, and it refuses to produce one
//! that references unknown names or contains a cycle.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::graph::TaskGraph;
use crate::errors::{AssetdagError, Result};
use crate::types::TaskName;

/// Boxed future returned by task actions and graph runs.
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A leaf task: a pipeline run, `clean`, `watch`, `serve`, or a test fake.
///
/// The frozen graph is handed in so long-running actions (the watcher) can
/// invoke other tasks.
pub trait TaskAction: Send + Sync {
    fn run(&self, graph: Arc<TaskGraph>) -> TaskFuture<'_>;
}

struct FnAction<F>(F);

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self, _graph: Arc<TaskGraph>) -> TaskFuture<'_> {
        Box::pin((self.0)())
    }
}

/// Wrap a closure returning a future as a [`TaskAction`].
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn TaskAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnAction(f))
}

/// What a registered name stands for.
#[derive(Clone)]
pub enum TaskNode {
    Action(Arc<dyn TaskAction>),
    Series(Vec<TaskName>),
    Parallel(Vec<TaskName>),
}

impl TaskNode {
    pub fn members(&self) -> &[TaskName] {
        match self {
            TaskNode::Action(_) => &[],
            TaskNode::Series(m) | TaskNode::Parallel(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TaskNode::Action(_) => "action",
            TaskNode::Series(_) => "series",
            TaskNode::Parallel(_) => "parallel",
        }
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskNode::Action(_) => f.write_str("Action(..)"),
            TaskNode::Series(m) => f.debug_tuple("Series").field(m).finish(),
            TaskNode::Parallel(m) => f.debug_tuple("Parallel").field(m).finish(),
        }
    }
}

/// Mutable registration phase of the task graph.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    nodes: BTreeMap<TaskName, TaskNode>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<TaskName>, action: Arc<dyn TaskAction>) -> Result<()> {
        self.insert(name.into(), TaskNode::Action(action))
    }

    /// Sequential composition: members run one after another.
    pub fn register_series<I, S>(&mut self, name: impl Into<TaskName>, members: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let members = members.into_iter().map(Into::into).collect();
        self.insert(name.into(), TaskNode::Series(members))
    }

    /// Parallel composition: members start together.
    pub fn register_parallel<I, S>(&mut self, name: impl Into<TaskName>, members: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let members = members.into_iter().map(Into::into).collect();
        self.insert(name.into(), TaskNode::Parallel(members))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, name: TaskName, node: TaskNode) -> Result<()> {
        if self.nodes.contains_key(&name) {
            return Err(AssetdagError::ConfigError(format!(
                "task '{name}' is registered more than once"
            )));
        }
        debug!(task = %name, kind = node.kind(), "registered task");
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Validate and freeze.
    ///
    /// - every member of every composition must be registered;
    /// - a composition may not (transitively) contain itself.
    pub fn freeze(self) -> Result<Arc<TaskGraph>> {
        for (name, node) in self.nodes.iter() {
            for member in node.members() {
                if !self.nodes.contains_key(member) {
                    return Err(AssetdagError::TaskNotFound(format!(
                        "'{member}' (member of '{name}')"
                    )));
                }
            }
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (name, node) in self.nodes.iter() {
            graph.add_node(name.as_str());
            for member in node.members() {
                graph.add_edge(name.as_str(), member.as_str(), ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(AssetdagError::DagCycle(format!(
                "task '{}' is part of a cycle",
                cycle.node_id()
            )));
        }

        debug!(tasks = self.nodes.len(), "task graph frozen");
        Ok(Arc::new(TaskGraph::new(self.nodes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn TaskAction> {
        action_fn(|| async { Ok(()) })
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = TaskRegistry::new();
        reg.register("a", noop()).unwrap();
        let err = reg.register_series("a", ["b"]).unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(_)));
    }

    #[test]
    fn unknown_member_fails_freeze() {
        let mut reg = TaskRegistry::new();
        reg.register_series("build", ["clean", "styles"]).unwrap();
        reg.register("clean", noop()).unwrap();
        let err = reg.freeze().unwrap_err();
        assert!(matches!(err, AssetdagError::TaskNotFound(ref m) if m.contains("styles")));
    }

    #[test]
    fn cycles_fail_freeze() {
        let mut reg = TaskRegistry::new();
        reg.register_series("a", ["b"]).unwrap();
        reg.register_parallel("b", ["a"]).unwrap();
        let err = reg.freeze().unwrap_err();
        assert!(matches!(err, AssetdagError::DagCycle(_)));
    }

    #[test]
    fn shared_members_are_not_cycles() {
        let mut reg = TaskRegistry::new();
        reg.register("clean", noop()).unwrap();
        reg.register_series("a", ["clean"]).unwrap();
        reg.register_series("b", ["clean", "a"]).unwrap();
        assert!(reg.freeze().is_ok());
    }
}
