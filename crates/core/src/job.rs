//! CI job records as seen by reporters.
//!
//! The job record is written by upstream job-execution components. The only
//! part the reporting controller ever writes is its own entry in
//! `JobStatus::prev_report_states`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{JobName, ReporterName};

/// Observed state of a job run.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not yet scheduled onto an agent.
    #[default]
    Triggered,
    /// Running.
    Pending,
    Success,
    Failure,
    /// Stopped before completion (e.g. superseded by a newer run).
    Aborted,
    /// Could not be run at all (infrastructure error).
    Error,
}

impl JobState {
    /// Whether the run has reached a final state.
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            JobState::Success | JobState::Failure | JobState::Aborted | JobState::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Triggered => "triggered",
            JobState::Pending => "pending",
            JobState::Success => "success",
            JobState::Failure => "failure",
            JobState::Aborted => "aborted",
            JobState::Error => "error",
        }
    }
}

impl core::fmt::Display for JobState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What triggered the job.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Presubmit,
    Postsubmit,
    #[default]
    Periodic,
    Batch,
}

/// Desired configuration of a job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSpec {
    /// Logical job identifier; empty means the job is not fully specified.
    pub job: String,
    pub job_type: JobType,
    /// When false the job must never be reported by any reporter.
    pub report: bool,
    /// Status context reporters may attach to (e.g. a commit status name).
    pub context: Option<String>,
}

/// Observed status of a job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatus {
    pub state: JobState,
    pub description: Option<String>,
    pub url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    /// Last state each reporter successfully reported, keyed by reporter name.
    pub prev_report_states: BTreeMap<ReporterName, JobState>,
}

/// A CI run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: JobName,
    #[serde(default)]
    pub spec: JobSpec,
    #[serde(default)]
    pub status: JobStatus,
}

impl Job {
    /// A job with default spec and status (not report-enabled).
    pub fn new(name: JobName) -> Self {
        Self {
            name,
            spec: JobSpec::default(),
            status: JobStatus::default(),
        }
    }

    pub fn with_spec(mut self, spec: JobSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_state(mut self, state: JobState) -> Self {
        self.status.state = state;
        self
    }

    pub fn state(&self) -> JobState {
        self.status.state
    }

    pub fn is_report_enabled(&self) -> bool {
        self.spec.report
    }

    /// Last state `reporter` recorded for this job, if any.
    pub fn reported_state(&self, reporter: &ReporterName) -> Option<JobState> {
        self.status.prev_report_states.get(reporter).copied()
    }

    /// Whether `reporter` already reported the current state.
    pub fn already_reported(&self, reporter: &ReporterName) -> bool {
        self.reported_state(reporter) == Some(self.status.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> JobName {
        JobName::new(s).unwrap()
    }

    #[test]
    fn default_job_is_not_report_enabled() {
        let job = Job::new(name("foo"));
        assert!(!job.is_report_enabled());
        assert_eq!(job.state(), JobState::Triggered);
        assert!(job.spec.job.is_empty());
    }

    #[test]
    fn already_reported_compares_current_state() {
        let reporter = ReporterName::new("slack").unwrap();
        let mut job = Job::new(name("foo")).with_state(JobState::Pending);
        assert!(!job.already_reported(&reporter));

        job.status
            .prev_report_states
            .insert(reporter.clone(), JobState::Pending);
        assert!(job.already_reported(&reporter));

        job.status.state = JobState::Success;
        assert!(!job.already_reported(&reporter));
        assert_eq!(job.reported_state(&reporter), Some(JobState::Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(!JobState::Triggered.is_complete());
        assert!(!JobState::Pending.is_complete());
        assert!(JobState::Success.is_complete());
        assert!(JobState::Aborted.is_complete());
    }

    #[test]
    fn deserializes_sparse_json_with_defaults() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "name": "foo",
            "spec": { "job": "unit", "report": true },
            "status": { "state": "pending", "prev_report_states": { "slack": "triggered" } }
        }))
        .unwrap();

        assert!(job.is_report_enabled());
        assert_eq!(job.spec.job_type, JobType::Periodic);
        assert_eq!(job.state(), JobState::Pending);
        assert_eq!(
            job.reported_state(&ReporterName::new("slack").unwrap()),
            Some(JobState::Triggered)
        );
    }
}
