//! Process wiring for the reporting controller.
//!
//! One `ControllerRunner` per configured reporter, all sharing one job store.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;

use crier_core::Job;
use crier_infra::{ControllerConfig, ControllerRunner, InMemoryJobStore, Reconciler, RunnerHandle, RunnerOptions};
use crier_reporter::LogReporter;

/// Load jobs from a JSON array into the store.
pub fn seed_from_str(store: &InMemoryJobStore, json: &str) -> anyhow::Result<usize> {
    let jobs: Vec<Job> = serde_json::from_str(json).context("seed file is not a JSON array of jobs")?;
    let count = jobs.len();
    for job in jobs {
        let name = job.name.clone();
        store
            .create(job)
            .with_context(|| format!("failed to seed job {name}"))?;
    }
    Ok(count)
}

pub fn seed_from_file(store: &InMemoryJobStore, path: &Path) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    seed_from_str(store, &raw)
}

/// Start one controller per configured reporter.
pub fn start_controllers(
    config: &ControllerConfig,
    store: Arc<InMemoryJobStore>,
) -> anyhow::Result<Vec<RunnerHandle>> {
    let options = RunnerOptions::from(config);
    let mut handles = Vec::with_capacity(config.reporters.len());

    for name in &config.reporters {
        let reporter = LogReporter::new(name.clone()).terminal_only(config.terminal_only);
        let runner = ControllerRunner::new(Reconciler::new(store.clone(), reporter), options.clone());
        let handle = runner
            .spawn()
            .with_context(|| format!("failed to start controller for reporter {name}"))?;
        handles.push(handle);
    }

    info!(reporters = handles.len(), workers = options.workers, "controllers running");
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use crier_core::{Context, JobName, JobState, ReporterName};
    use crier_infra::JobStore;

    use super::*;

    const SEED: &str = r#"[
        {"name": "pr-1", "spec": {"job": "unit", "job_type": "presubmit", "report": true},
         "status": {"state": "success"}},
        {"name": "nightly", "spec": {"job": "e2e", "report": false}}
    ]"#;

    #[test]
    fn seeds_jobs_from_json() {
        let store = InMemoryJobStore::new();
        assert_eq!(seed_from_str(&store, SEED).unwrap(), 2);
        assert_eq!(store.len(), 2);

        assert!(seed_from_str(&store, SEED).is_err(), "duplicate names are rejected");
        assert!(seed_from_str(&store, "{}").is_err());
    }

    #[test]
    fn every_configured_reporter_reports_independently() {
        let store = Arc::new(InMemoryJobStore::new());
        seed_from_str(&store, SEED).unwrap();

        let config = ControllerConfig {
            reporters: vec![
                ReporterName::new("log-a").unwrap(),
                ReporterName::new("log-b").unwrap(),
            ],
            ..Default::default()
        };
        let handles = start_controllers(&config, store.clone()).unwrap();

        let ctx = Context::background();
        let pr = JobName::new("pr-1").unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let job = store.get(&ctx, &pr).unwrap().unwrap();
            if job.status.prev_report_states.len() == 2 {
                assert!(job.status.prev_report_states.values().all(|s| *s == JobState::Success));
                break;
            }
            assert!(Instant::now() < deadline, "reporters did not converge");
            thread::sleep(Duration::from_millis(10));
        }

        let nightly = store.get(&ctx, &JobName::new("nightly").unwrap()).unwrap().unwrap();
        assert!(nightly.status.prev_report_states.is_empty());

        for h in handles {
            h.shutdown();
        }
    }
}
