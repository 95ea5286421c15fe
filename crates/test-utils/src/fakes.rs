use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::dag::{TaskAction, TaskFuture, TaskGraph};
use assetdag::errors::{AssetdagError, Result};
use assetdag::pipeline::{FileSet, Step};
use assetdag::types::TaskName;
use assetdag::watch::TaskInvoker;

/// Shared, ordered record of which fake actions started and finished.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// How many times `name` started.
    pub fn starts(&self, name: &str) -> usize {
        let start = format!("start:{name}");
        self.entries().iter().filter(|e| **e == start).count()
    }
}

/// A task action that logs `start:<name>` / `end:<name>` and optionally fails.
pub struct FakeAction {
    name: String,
    log: RunLog,
    fail: bool,
    delay: Option<Duration>,
}

impl FakeAction {
    pub fn ok(name: &str, log: &RunLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            fail: false,
            delay: None,
        })
    }

    pub fn failing(name: &str, log: &RunLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            fail: true,
            delay: None,
        })
    }

    pub fn slow(name: &str, log: &RunLog, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            fail: false,
            delay: Some(delay),
        })
    }
}

impl TaskAction for FakeAction {
    fn run(&self, _graph: Arc<TaskGraph>) -> TaskFuture<'_> {
        Box::pin(async move {
            self.log.push(format!("start:{}", self.name));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log.push(format!("end:{}", self.name));
            if self.fail {
                return Err(AssetdagError::Transform {
                    step: "fake".to_string(),
                    path: self.name.clone(),
                    message: "configured to fail".to_string(),
                });
            }
            Ok(())
        })
    }
}

/// Records every task name handed to it instead of running anything.
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    invoked: Mutex<Vec<TaskName>>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invoked(&self) -> Vec<TaskName> {
        self.invoked.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.invoked.lock().unwrap().clear();
    }
}

impl TaskInvoker for RecordingInvoker {
    fn invoke(&self, task: TaskName) {
        self.invoked.lock().unwrap().push(task);
    }
}

/// A pipeline step that rejects every input.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStep;

impl Step for FailingStep {
    fn name(&self) -> &str {
        "failing"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let path = files
            .paths()
            .next()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Err(AssetdagError::Transform {
            step: "failing".to_string(),
            path,
            message: "rejected on purpose".to_string(),
        })
    }
}
