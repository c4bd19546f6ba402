//! Application services for task integration orchestration.

mod error;
mod materializer;
mod reconciler;
pub mod render;
mod resolver;
mod retry;

pub use error::{ReconcileError, ReconcileResult};
pub use materializer::BranchMaterializer;
pub use reconciler::{
    DEFAULT_BASE_BRANCH, ReconcileOptions, ReconcileOutcome, Reconciler, ReconcilerPorts,
};
pub use resolver::{RemoteStateResolver, Resolved};
pub use retry::{RetryError, RetryPolicy, Retryable};
