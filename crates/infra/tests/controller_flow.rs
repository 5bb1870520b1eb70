//! End-to-end controller behaviour: store → watch → queue → reconcile → patch.
//!
//! Verifies:
//! - each (job, reporter, state) is reported once and recorded once
//! - failing reporters are retried without touching their marker
//! - reporters on the same job stay independent

use std::sync::Arc;

use anyhow::Context as _;
use std::thread;
use std::time::{Duration, Instant};

use crier_core::{Context, Job, JobName, JobSpec, JobState, ReporterName};
use crier_infra::controller::Backoff;
use crier_infra::{
    ControllerRunner, InMemoryJobStore, JobStore, Reconciler, RunnerHandle, RunnerOptions,
};
use crier_reporter::FakeReporter;

fn name(s: &str) -> JobName {
    JobName::new(s).unwrap()
}

fn reporter_name(s: &str) -> ReporterName {
    ReporterName::new(s).unwrap()
}

fn reportable(n: &str, state: JobState) -> Job {
    Job::new(name(n))
        .with_spec(JobSpec {
            job: n.to_string(),
            report: true,
            ..Default::default()
        })
        .with_state(state)
}

fn options() -> RunnerOptions {
    RunnerOptions {
        workers: 2,
        backoff: Backoff::fixed(Duration::from_millis(5)),
        reconcile_timeout: Some(Duration::from_secs(5)),
        watch_tick: Duration::from_millis(10),
    }
}

fn start(
    store: &Arc<InMemoryJobStore>,
    reporter: &Arc<FakeReporter>,
) -> anyhow::Result<RunnerHandle> {
    let handle =
        ControllerRunner::new(Reconciler::new(store.clone(), reporter.clone()), options())
            .spawn()?;
    Ok(handle)
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn marker(store: &InMemoryJobStore, job: &str, reporter: &ReporterName) -> Option<JobState> {
    store
        .get(&Context::background(), &name(job))
        .unwrap()
        .and_then(|j| j.reported_state(reporter))
}

#[test]
fn reports_each_state_once() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryJobStore::new());
    let reporter = Arc::new(FakeReporter::new(reporter_name("slack")));
    let handle = start(&store, &reporter)?;

    store.create(reportable("foo", JobState::Triggered))?;
    wait_until("triggered marker", || {
        marker(&store, "foo", &reporter_name("slack")) == Some(JobState::Triggered)
    });

    store
        .modify(&name("foo"), |j| j.status.state = JobState::Success)?;
    wait_until("success marker", || {
        marker(&store, "foo", &reporter_name("slack")) == Some(JobState::Success)
    });

    // Unrelated updates (and the runner's own patches) must not re-report.
    store
        .modify(&name("foo"), |j| j.status.description = Some("done".into()))?;
    thread::sleep(Duration::from_millis(100));

    assert_eq!(reporter.reported(), vec!["foo", "foo"]);
    let stats = handle.stats();
    assert_eq!(stats.reported, 2);
    assert_eq!(stats.failures, 0);
    handle.shutdown();
    Ok(())
}

#[test]
fn jobs_present_at_startup_are_reconciled() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryJobStore::new());
    store.create(reportable("a", JobState::Pending))?;
    store.create(reportable("b", JobState::Failure))?;

    let reporter = Arc::new(FakeReporter::new(reporter_name("pubsub")));
    let handle = start(&store, &reporter)?;

    wait_until("both jobs reported", || {
        marker(&store, "a", &reporter_name("pubsub")).is_some()
            && marker(&store, "b", &reporter_name("pubsub")).is_some()
    });

    let mut reported = reporter.reported();
    reported.sort();
    assert_eq!(reported, vec!["a", "b"]);
    handle.shutdown();
    Ok(())
}

#[test]
fn failing_reporter_is_retried_until_it_succeeds() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryJobStore::new());
    let reporter = Arc::new(FakeReporter::new(reporter_name("gerrit")).fail_times(2, "503"));
    let handle = start(&store, &reporter)?;

    store.create(reportable("foo", JobState::Failure))?;
    wait_until("marker after retries", || {
        marker(&store, "foo", &reporter_name("gerrit")) == Some(JobState::Failure)
    });

    assert_eq!(reporter.report_count(), 3);
    let stats = handle.stats();
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.requeues, 2);
    assert_eq!(stats.reported, 1);
    handle.shutdown();
    Ok(())
}

#[test]
fn reporters_are_isolated_from_each_other() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryJobStore::new());
    let healthy = Arc::new(FakeReporter::new(reporter_name("healthy")));
    let broken = Arc::new(FakeReporter::new(reporter_name("broken")).failing("backend down"));
    let healthy_handle = start(&store, &healthy)?;
    let broken_handle = start(&store, &broken)?;

    for i in 0..5 {
        store
            .create(reportable(&format!("job-{i}"), JobState::Success))?;
    }

    wait_until("healthy reporter done", || {
        (0..5).all(|i| marker(&store, &format!("job-{i}"), &reporter_name("healthy")).is_some())
    });
    wait_until("broken reporter retrying", || broken_handle.stats().failures >= 10);

    for i in 0..5 {
        let job = format!("job-{i}");
        assert_eq!(
            marker(&store, &job, &reporter_name("healthy")),
            Some(JobState::Success)
        );
        assert_eq!(marker(&store, &job, &reporter_name("broken")), None);
    }
    assert_eq!(healthy.report_count(), 5);

    broken_handle.shutdown();
    healthy_handle.shutdown();
    Ok(())
}

#[test]
fn report_disabled_jobs_are_never_touched() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryJobStore::new());
    let reporter = Arc::new(FakeReporter::new(reporter_name("slack")));
    let handle = start(&store, &reporter)?;

    let mut job = reportable("quiet", JobState::Success);
    job.spec.report = false;
    store.create(job)?;
    store.create(Job::new(name("empty")))?;

    wait_until("both jobs reconciled", || handle.stats().skipped >= 2);

    assert_eq!(reporter.report_count(), 0);
    let jobs = store
        .list(&Context::background())
        .context("listing jobs")?;
    assert!(jobs.iter().all(|j| j.status.prev_report_states.is_empty()));
    handle.shutdown();
    Ok(())
}

#[test]
fn deleted_jobs_are_benign() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryJobStore::new());
    let reporter = Arc::new(FakeReporter::new(reporter_name("slack")).with_should_report(|j| {
        j.state().is_complete()
    }));
    let handle = start(&store, &reporter)?;

    store.create(reportable("gone", JobState::Pending))?;
    store.delete(&name("gone"))?;

    wait_until("events drained", || handle.stats().reconciles >= 1);
    thread::sleep(Duration::from_millis(50));

    assert_eq!(handle.stats().failures, 0);
    assert_eq!(reporter.report_count(), 0);
    handle.shutdown();
    Ok(())
}
