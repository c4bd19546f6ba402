//! YAML task and report records.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use super::fs::read_optional;
use crate::integration::{
    domain::{ChangeType, IntegrationDomainError, Report, TaskKey, TaskSpec},
    ports::{TaskSource, TaskSourceError, TaskSourceResult},
};

/// On-disk task record.
#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    goal: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    #[serde(default, rename = "type")]
    change_type: Option<String>,
}

/// Loads tasks from `{tasks_dir}/{id}.yaml` and reports from
/// `{reports_dir}/{id}.report.yaml`.
#[derive(Debug, Clone)]
pub struct YamlTaskSource {
    tasks_dir: Utf8PathBuf,
    reports_dir: Utf8PathBuf,
}

impl YamlTaskSource {
    /// Creates a source reading from the given directories.
    #[must_use]
    pub fn new(tasks_dir: impl Into<Utf8PathBuf>, reports_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            tasks_dir: tasks_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }

    fn task_path(&self, task: &TaskKey) -> Utf8PathBuf {
        self.tasks_dir.join(format!("{task}.yaml"))
    }

    fn report_path(&self, task: &TaskKey) -> Utf8PathBuf {
        self.reports_dir.join(format!("{task}.report.yaml"))
    }
}

fn malformed(path: &Utf8Path, message: String) -> TaskSourceError {
    TaskSourceError::Malformed {
        path: path.to_string(),
        message,
    }
}

fn into_task(key: &TaskKey, record: TaskRecord, path: &Utf8Path) -> TaskSourceResult<TaskSpec> {
    if let Some(declared) = record.task_id.as_deref()
        && declared.trim() != key.as_str()
    {
        return Err(malformed(
            path,
            format!("declares task_id {declared} but is stored as {key}"),
        ));
    }
    let spec = TaskSpec::new(key.clone(), record.title)?
        .with_goal(record.goal)
        .with_context(record.context)
        .with_acceptance_criteria(record.acceptance_criteria);
    let Some(raw) = record.change_type.as_deref() else {
        return Ok(spec);
    };
    let change_type = ChangeType::try_from(raw).map_err(IntegrationDomainError::from)?;
    Ok(spec.with_change_type(change_type))
}

#[async_trait]
impl TaskSource for YamlTaskSource {
    async fn load_task(&self, task: &TaskKey) -> TaskSourceResult<TaskSpec> {
        let path = self.task_path(task);
        let contents = read_optional(&path)
            .map_err(TaskSourceError::io)?
            .ok_or_else(|| TaskSourceError::NotFound(task.clone()))?;
        let record: TaskRecord =
            serde_yaml::from_str(&contents).map_err(|err| malformed(&path, err.to_string()))?;
        into_task(task, record, &path)
    }

    async fn load_report(&self, task: &TaskKey) -> TaskSourceResult<Option<Report>> {
        let path = self.report_path(task);
        let Some(contents) = read_optional(&path).map_err(TaskSourceError::io)? else {
            return Ok(None);
        };
        serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(|err| malformed(&path, err.to_string()))
    }
}
