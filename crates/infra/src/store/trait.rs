use std::sync::Arc;

use crier_core::{Cancelled, Context, Job, JobName};
use crier_events::{JobEvent, Subscription};

use super::patch::JobPatch;

/// Job store operation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobName),
    #[error("job already exists: {0}")]
    AlreadyExists(JobName),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("invalid patch: {0}")]
    Patch(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled(_))
    }
}

/// Keyed job storage as consumed by the reporting controllers.
///
/// ## Write discipline
///
/// Several controllers (one per reporter) mutate the same job concurrently.
/// They only ever write through `patch`, which must apply a field-scoped merge
/// atomically against the *current* record. A whole-record replace here would
/// race and drop another reporter's freshly written marker.
///
/// ## Cancellation
///
/// `get`, `list` and `patch` take the reconcile context and fail with
/// `StoreError::Cancelled` once it is done.
pub trait JobStore: Send + Sync {
    /// Fetch a job by name. A missing job is `Ok(None)`, not an error.
    fn get(&self, ctx: &Context, name: &JobName) -> Result<Option<Job>, StoreError>;

    /// All jobs, ordered by name.
    fn list(&self, ctx: &Context) -> Result<Vec<Job>, StoreError>;

    /// Apply a field-scoped merge patch and return the updated job.
    fn patch(&self, ctx: &Context, name: &JobName, patch: &JobPatch) -> Result<Job, StoreError>;

    /// Subscribe to change notifications for every job.
    fn watch(&self) -> Subscription<JobEvent>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn get(&self, ctx: &Context, name: &JobName) -> Result<Option<Job>, StoreError> {
        (**self).get(ctx, name)
    }

    fn list(&self, ctx: &Context) -> Result<Vec<Job>, StoreError> {
        (**self).list(ctx)
    }

    fn patch(&self, ctx: &Context, name: &JobName, patch: &JobPatch) -> Result<Job, StoreError> {
        (**self).patch(ctx, name, patch)
    }

    fn watch(&self) -> Subscription<JobEvent> {
        (**self).watch()
    }
}
