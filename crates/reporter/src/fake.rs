//! Scriptable reporter for tests.
//!
//! Sets: which jobs should be reported, and whether notify fails.
//! Records: every notify call, by logical job name.

use std::sync::Mutex;

use crier_core::{Context, Job, ReporterName};

use crate::reporter::{ReportError, Reporter};

type Predicate = Box<dyn Fn(&Job) -> bool + Send + Sync>;

pub struct FakeReporter {
    name: ReporterName,
    should_report: Predicate,
    error: Option<String>,
    /// Calls left that fail before the reporter starts succeeding.
    fail_remaining: Mutex<usize>,
    reported: Mutex<Vec<String>>,
}

impl core::fmt::Debug for FakeReporter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FakeReporter")
            .field("name", &self.name)
            .field("error", &self.error)
            .field("reported", &self.reported())
            .finish_non_exhaustive()
    }
}

impl FakeReporter {
    /// A reporter that reports everything and always succeeds.
    pub fn new(name: ReporterName) -> Self {
        Self {
            name,
            should_report: Box::new(|_| true),
            error: None,
            fail_remaining: Mutex::new(0),
            reported: Mutex::new(Vec::new()),
        }
    }

    pub fn with_should_report<F>(mut self, f: F) -> Self
    where
        F: Fn(&Job) -> bool + Send + Sync + 'static,
    {
        self.should_report = Box::new(f);
        self
    }

    /// Every notify call fails with `msg`.
    pub fn failing(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self.fail_remaining = Mutex::new(usize::MAX);
        self
    }

    /// The first `n` notify calls fail with `msg`, later ones succeed.
    pub fn fail_times(mut self, n: usize, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self.fail_remaining = Mutex::new(n);
        self
    }

    /// Logical job names of every notify call, in call order.
    pub fn reported(&self) -> Vec<String> {
        self.reported.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn report_count(&self) -> usize {
        self.reported.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Reporter for FakeReporter {
    fn name(&self) -> &ReporterName {
        &self.name
    }

    fn should_report(&self, job: &Job) -> bool {
        (self.should_report)(job)
    }

    fn report(&self, ctx: &Context, job: &Job) -> Result<Vec<Job>, ReportError> {
        ctx.check()?;

        if let Ok(mut reported) = self.reported.lock() {
            reported.push(job.spec.job.clone());
        }

        let should_fail = match self.fail_remaining.lock() {
            Ok(mut remaining) if *remaining > 0 => {
                *remaining = remaining.saturating_sub(1);
                true
            }
            _ => false,
        };

        match (&self.error, should_fail) {
            (Some(msg), true) => Err(ReportError::backend(msg.clone())),
            _ => Ok(vec![job.clone()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use crier_core::{JobName, JobSpec};

    use super::*;

    fn job() -> Job {
        Job::new(JobName::new("foo").unwrap()).with_spec(JobSpec {
            job: "unit".to_string(),
            report: true,
            ..Default::default()
        })
    }

    #[test]
    fn fail_times_then_succeeds() {
        let r = FakeReporter::new(ReporterName::new("fake").unwrap()).fail_times(2, "boom");
        let ctx = Context::background();

        assert_eq!(r.report(&ctx, &job()).unwrap_err().to_string(), "boom");
        assert!(r.report(&ctx, &job()).is_err());
        assert!(r.report(&ctx, &job()).is_ok());
        assert_eq!(r.reported(), vec!["unit", "unit", "unit"]);
    }

    #[test]
    fn cancelled_context_is_not_recorded() {
        let r = FakeReporter::new(ReporterName::new("fake").unwrap());
        let ctx = Context::background();
        ctx.cancel();

        assert!(r.report(&ctx, &job()).unwrap_err().is_cancelled());
        assert_eq!(r.report_count(), 0);
    }
}
