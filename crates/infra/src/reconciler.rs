//! Per-reporter reconcile pass: decide whether a job's current state must be
//! reported, report it, and record that it was reported.
//!
//! ## Decision sequence
//!
//! ```text
//! get(job) ── missing ───────────────────────────────▶ NotFound
//!    │
//!    ├─ spec.report == false ────────────────────────▶ ReportDisabled
//!    ├─ reporter.should_report(job) == false ────────▶ NotReportable
//!    ├─ prev_report_states[reporter] == state ───────▶ AlreadyReported
//!    │
//!    ├─ reporter.report(job) ── Err ─────────────────▶ ReconcileError::Report (no patch)
//!    │
//!    └─ patch prev_report_states[reporter] = state ──▶ Reported
//! ```
//!
//! The marker is written only after the reporter confirmed success, and only
//! the calling reporter's entry is touched. A crash between report and patch
//! leaves the marker unwritten, so the next pass reports the same state again:
//! reporters must tolerate duplicates, but a report is never silently skipped.
//!
//! The reconciler never retries or sleeps. Every error is returned to the
//! runner, which owns requeue and backoff.

use tracing::{debug, info, instrument};

use crier_core::{Context, JobName, JobState, ReporterName};
use crier_reporter::{ReportError, Reporter};

use crate::store::{JobPatch, JobStore, StoreError};

/// Which branch a successful reconcile took.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The job no longer exists (deleted between enqueue and processing).
    NotFound,
    /// `spec.report` is false.
    ReportDisabled,
    /// The reporter's predicate declined the job.
    NotReportable,
    /// This reporter already reported the current state.
    AlreadyReported { state: JobState },
    /// The reporter was called and the marker recorded.
    Reported { state: JobState, jobs: usize },
}

impl ReconcileOutcome {
    pub fn reported(&self) -> bool {
        matches!(self, ReconcileOutcome::Reported { .. })
    }
}

/// Failure of one reconcile attempt. Every variant is retryable.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to get job {job} for reporter {reporter}: {source}")]
    Fetch {
        job: JobName,
        reporter: ReporterName,
        #[source]
        source: StoreError,
    },
    #[error("failed to report job {job} with reporter {reporter}: {source}")]
    Report {
        job: JobName,
        reporter: ReporterName,
        #[source]
        source: ReportError,
    },
    #[error("failed to record state {state} of job {job} as reported by {reporter}: {source}")]
    Patch {
        job: JobName,
        reporter: ReporterName,
        state: JobState,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    pub fn job(&self) -> &JobName {
        match self {
            ReconcileError::Fetch { job, .. }
            | ReconcileError::Report { job, .. }
            | ReconcileError::Patch { job, .. } => job,
        }
    }

    pub fn reporter(&self) -> &ReporterName {
        match self {
            ReconcileError::Fetch { reporter, .. }
            | ReconcileError::Report { reporter, .. }
            | ReconcileError::Patch { reporter, .. } => reporter,
        }
    }

    /// The attempt was abandoned because its context was done.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ReconcileError::Fetch { source, .. } | ReconcileError::Patch { source, .. } => {
                source.is_cancelled()
            }
            ReconcileError::Report { source, .. } => source.is_cancelled(),
        }
    }
}

/// Reconciles jobs for exactly one reporter.
#[derive(Debug)]
pub struct Reconciler<S, R> {
    store: S,
    reporter: R,
}

impl<S, R> Reconciler<S, R> {
    pub fn new(store: S, reporter: R) -> Self {
        Self { store, reporter }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }
}

impl<S, R> Reconciler<S, R>
where
    S: JobStore,
    R: Reporter,
{
    /// Run one reconcile pass for `name`.
    #[instrument(
        level = "debug",
        skip_all,
        fields(job = %name, reporter = %self.reporter.name())
    )]
    pub fn reconcile(
        &self,
        ctx: &Context,
        name: &JobName,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let reporter = self.reporter.name();

        let job = self
            .store
            .get(ctx, name)
            .map_err(|source| ReconcileError::Fetch {
                job: name.clone(),
                reporter: reporter.clone(),
                source,
            })?;

        let Some(job) = job else {
            debug!("job not found, nothing to report");
            return Ok(ReconcileOutcome::NotFound);
        };

        if !job.is_report_enabled() {
            debug!("reporting disabled for job");
            return Ok(ReconcileOutcome::ReportDisabled);
        }

        if !self.reporter.should_report(&job) {
            debug!(state = %job.state(), "reporter declined job");
            return Ok(ReconcileOutcome::NotReportable);
        }

        let state = job.state();
        if job.already_reported(reporter) {
            debug!(state = %state, "state already reported");
            return Ok(ReconcileOutcome::AlreadyReported { state });
        }

        let reported = ctx
            .check()
            .map_err(ReportError::from)
            .and_then(|()| self.reporter.report(ctx, &job))
            .map_err(|source| ReconcileError::Report {
                job: name.clone(),
                reporter: reporter.clone(),
                source,
            })?;

        self.store
            .patch(ctx, name, &JobPatch::report_state(reporter, state))
            .map_err(|source| ReconcileError::Patch {
                job: name.clone(),
                reporter: reporter.clone(),
                state,
                source,
            })?;

        info!(state = %state, "reported job");
        Ok(ReconcileOutcome::Reported {
            state,
            jobs: reported.len(),
        })
    }
}
