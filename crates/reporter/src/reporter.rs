//! The capability every reporting backend implements.

use std::sync::Arc;

use crier_core::{Cancelled, Context, Job, ReporterName};

/// Failure of a reporter's notify call.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The reconcile context was done before or during the call.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The external system rejected or never received the notification.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl ReportError {
    pub fn backend(msg: impl core::fmt::Display + core::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Backend(anyhow::Error::msg(msg))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReportError::Cancelled(_))
    }
}

/// A pluggable backend that communicates job status to an external system.
///
/// One controller runs per reporter, so implementations never see each
/// other. New backends are added by implementing this trait; the reconciler
/// does not change.
///
/// ## Contract
///
/// - `name()` is stable and unique among reporters running against the same
///   jobs. It keys the reporter's entry in `JobStatus::prev_report_states`.
/// - `should_report()` is a pure predicate evaluated on every reconcile. It
///   must not perform I/O.
/// - `report()` may block on the network and may fail. It must observe `ctx`
///   and give up with `ReportError::Cancelled` once it is done.
/// - `report()` can be called more than once for the same job and state: if
///   the process dies between a successful call and the marker being
///   persisted, the next reconcile calls it again. Backends must tolerate
///   that (idempotent writes, or duplicates acceptable downstream).
pub trait Reporter: Send + Sync {
    fn name(&self) -> &ReporterName;

    fn should_report(&self, job: &Job) -> bool;

    /// Notify the external system. The returned jobs are informational.
    fn report(&self, ctx: &Context, job: &Job) -> Result<Vec<Job>, ReportError>;
}

impl<R> Reporter for Arc<R>
where
    R: Reporter + ?Sized,
{
    fn name(&self) -> &ReporterName {
        (**self).name()
    }

    fn should_report(&self, job: &Job) -> bool {
        (**self).should_report(job)
    }

    fn report(&self, ctx: &Context, job: &Job) -> Result<Vec<Job>, ReportError> {
        (**self).report(ctx, job)
    }
}

impl<R> Reporter for Box<R>
where
    R: Reporter + ?Sized,
{
    fn name(&self) -> &ReporterName {
        (**self).name()
    }

    fn should_report(&self, job: &Job) -> bool {
        (**self).should_report(job)
    }

    fn report(&self, ctx: &Context, job: &Job) -> Result<Vec<Job>, ReportError> {
        (**self).report(ctx, job)
    }
}
