// src/dag/graph.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::dag::registry::{TaskFuture, TaskNode};
use crate::errors::AssetdagError;
use crate::types::TaskName;
use crate::watch::TaskInvoker;

/// Frozen, validated task graph.
///
/// Obtained from [`TaskRegistry::freeze`](crate::dag::TaskRegistry::freeze);
/// every member name resolves and there are no cycles. Any task can be run
/// any number of times.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskName, TaskNode>,
}

impl TaskGraph {
    pub(crate) fn new(nodes: BTreeMap<TaskName, TaskNode>) -> Self {
        Self { nodes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Run `name` to completion.
    ///
    /// - action: awaited directly;
    /// - series: members in order, stopping at the first failure;
    /// - parallel: all members at once, the first failure reported after
    ///   every member has finished.
    ///
    /// Failures of composition members come back wrapped in
    /// [`AssetdagError::CompositionAbort`].
    pub fn run(self: &Arc<Self>, name: &str) -> TaskFuture<'static> {
        let graph = Arc::clone(self);
        let name = name.to_string();
        Box::pin(async move {
            let Some(node) = graph.nodes.get(&name).cloned() else {
                return Err(AssetdagError::TaskNotFound(name));
            };

            match node {
                TaskNode::Action(action) => {
                    info!(task = %name, "starting");
                    let started = Instant::now();
                    let res = action.run(Arc::clone(&graph)).await;
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    match &res {
                        Ok(()) => info!(task = %name, elapsed_ms, "finished"),
                        Err(err) => warn!(task = %name, elapsed_ms, error = %err, "failed"),
                    }
                    res
                }
                TaskNode::Series(members) => {
                    debug!(task = %name, ?members, "running series");
                    for (idx, member) in members.iter().enumerate() {
                        if let Err(err) = graph.run(member).await {
                            let skipped = &members[idx + 1..];
                            if !skipped.is_empty() {
                                warn!(task = %name, failed = %member, ?skipped, "series aborted");
                            }
                            return Err(AssetdagError::CompositionAbort {
                                task: name,
                                child: member.clone(),
                                source: Box::new(err),
                            });
                        }
                    }
                    Ok(())
                }
                TaskNode::Parallel(members) => {
                    debug!(task = %name, ?members, "running parallel");
                    let results = join_all(members.iter().map(|m| graph.run(m))).await;

                    let mut first = None;
                    for (member, res) in members.iter().zip(results) {
                        let Err(err) = res else { continue };
                        if first.is_none() {
                            first = Some(AssetdagError::CompositionAbort {
                                task: name.clone(),
                                child: member.clone(),
                                source: Box::new(err),
                            });
                        } else {
                            warn!(task = %name, member = %member, error = %err, "parallel member also failed");
                        }
                    }
                    match first {
                        Some(err) => Err(err),
                        None => Ok(()),
                    }
                }
            }
        })
    }
}

/// Runs watch-triggered tasks in the background.
///
/// Failures are logged and swallowed: a broken stylesheet must not stop the
/// watcher.
#[derive(Debug, Clone)]
pub struct GraphInvoker {
    graph: Arc<TaskGraph>,
}

impl GraphInvoker {
    pub fn new(graph: Arc<TaskGraph>) -> Self {
        Self { graph }
    }
}

impl TaskInvoker for GraphInvoker {
    fn invoke(&self, task: TaskName) {
        let run = self.graph.run(&task);
        tokio::spawn(async move {
            if let Err(err) = run.await {
                error!(task = %task, error = %err.root_cause(), "triggered run failed");
            }
        });
    }
}
