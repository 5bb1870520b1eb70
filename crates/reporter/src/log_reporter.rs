//! Reporter that writes job status to the process log.

use tracing::info;

use crier_core::{Context, Job, ReporterName};

use crate::reporter::{ReportError, Reporter};

#[derive(Debug, Clone)]
pub struct LogReporter {
    name: ReporterName,
    terminal_only: bool,
}

impl LogReporter {
    pub fn new(name: ReporterName) -> Self {
        Self {
            name,
            terminal_only: false,
        }
    }

    /// Only report jobs that reached a final state.
    pub fn terminal_only(mut self, terminal_only: bool) -> Self {
        self.terminal_only = terminal_only;
        self
    }
}

impl Reporter for LogReporter {
    fn name(&self) -> &ReporterName {
        &self.name
    }

    fn should_report(&self, job: &Job) -> bool {
        !self.terminal_only || job.state().is_complete()
    }

    fn report(&self, ctx: &Context, job: &Job) -> Result<Vec<Job>, ReportError> {
        ctx.check()?;

        info!(
            reporter = %self.name,
            job = %job.name,
            spec_job = %job.spec.job,
            job_type = ?job.spec.job_type,
            state = %job.state(),
            url = job.status.url.as_deref().unwrap_or(""),
            "job status"
        );

        Ok(vec![job.clone()])
    }
}

#[cfg(test)]
mod tests {
    use crier_core::{JobName, JobState};

    use super::*;

    fn job(state: JobState) -> Job {
        Job::new(JobName::new("foo").unwrap()).with_state(state)
    }

    #[test]
    fn terminal_only_filters_running_jobs() {
        let r = LogReporter::new(ReporterName::new("log").unwrap()).terminal_only(true);
        assert!(!r.should_report(&job(JobState::Pending)));
        assert!(r.should_report(&job(JobState::Failure)));

        let r = LogReporter::new(ReporterName::new("log").unwrap());
        assert!(r.should_report(&job(JobState::Pending)));
    }

    #[test]
    fn report_observes_cancellation() {
        let r = LogReporter::new(ReporterName::new("log").unwrap());
        let ctx = Context::background();
        assert_eq!(r.report(&ctx, &job(JobState::Success)).unwrap().len(), 1);

        ctx.cancel();
        assert!(r.report(&ctx, &job(JobState::Success)).unwrap_err().is_cancelled());
    }
}
