//! Task and report source port.

use crate::integration::domain::{IntegrationDomainError, Report, TaskKey, TaskSpec};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task source operations.
pub type TaskSourceResult<T> = Result<T, TaskSourceError>;

/// Loads task definitions and execution reports by task identifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Loads the task definition.
    async fn load_task(&self, task: &TaskKey) -> TaskSourceResult<TaskSpec>;

    /// Loads the execution report, returning `None` when none was written.
    async fn load_report(&self, task: &TaskKey) -> TaskSourceResult<Option<Report>>;
}

/// Errors returned by task source implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskSourceError {
    /// No task definition exists for the identifier.
    #[error("task not found: {0}")]
    NotFound(TaskKey),

    /// A task or report document could not be parsed.
    #[error("malformed document {path}: {message}")]
    Malformed {
        /// Document path.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The document parsed but violates domain rules.
    #[error(transparent)]
    Domain(#[from] IntegrationDomainError),

    /// Reading the document failed.
    #[error("task source failure: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskSourceError {
    /// Wraps an I/O failure.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
