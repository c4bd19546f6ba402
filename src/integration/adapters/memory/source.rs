//! In-memory task and report source.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::integration::{
    domain::{Report, TaskKey, TaskSpec},
    ports::{TaskSource, TaskSourceError, TaskSourceResult},
};

/// Thread-safe map of tasks and reports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskSource {
    tasks: Arc<RwLock<HashMap<TaskKey, TaskSpec>>>,
    reports: Arc<RwLock<HashMap<TaskKey, Report>>>,
}

impl InMemoryTaskSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a task definition.
    pub fn insert_task(&self, task: TaskSpec) {
        if let Ok(mut tasks) = self.tasks.write() {
            tasks.insert(task.key().clone(), task);
        }
    }

    /// Adds or replaces the report for a task.
    pub fn insert_report(&self, task: &TaskKey, report: Report) {
        if let Ok(mut reports) = self.reports.write() {
            reports.insert(task.clone(), report);
        }
    }
}

fn poisoned(err: impl std::fmt::Display) -> TaskSourceError {
    TaskSourceError::io(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskSource for InMemoryTaskSource {
    async fn load_task(&self, task: &TaskKey) -> TaskSourceResult<TaskSpec> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        tasks
            .get(task)
            .cloned()
            .ok_or_else(|| TaskSourceError::NotFound(task.clone()))
    }

    async fn load_report(&self, task: &TaskKey) -> TaskSourceResult<Option<Report>> {
        let reports = self.reports.read().map_err(poisoned)?;
        Ok(reports.get(task).cloned())
    }
}
