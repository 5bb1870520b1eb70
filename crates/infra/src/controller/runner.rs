//! One controller per reporter: watch the store, queue changed job keys and
//! reconcile them on a pool of worker threads.
//!
//! Reporters never share a runner, queue or thread, so a backend that keeps
//! failing only delays its own markers. Concurrent runners touching the same
//! job are kept apart by the store's field-scoped patch, not by locks here.

use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crier_core::{Context, JobName, ReporterName};
use crier_events::{JobEvent, Subscription};
use crier_reporter::Reporter;

use super::backoff::Backoff;
use super::queue::WorkQueue;
use crate::config::ControllerConfig;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::store::{JobStore, StoreError};

/// Tuning knobs for a single runner.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Reconcile threads. Keys are still never processed concurrently.
    pub workers: usize,
    pub backoff: Backoff,
    /// Deadline applied to each reconcile's context.
    pub reconcile_timeout: Option<Duration>,
    /// How often the watch loop checks for shutdown while idle.
    pub watch_tick: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            backoff: Backoff::default(),
            reconcile_timeout: None,
            watch_tick: Duration::from_millis(250),
        }
    }
}

impl From<&ControllerConfig> for RunnerOptions {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            workers: config.workers,
            backoff: config.backoff,
            reconcile_timeout: config.reconcile_timeout,
            ..Default::default()
        }
    }
}

/// Runtime counters for one runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunnerStats {
    pub reconciles: u64,
    pub reported: u64,
    /// Successful passes that needed no report.
    pub skipped: u64,
    pub failures: u64,
    /// Failures put back on the queue with backoff (shutdown aborts are not).
    pub requeues: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("initial job list failed: {0}")]
    List(#[from] StoreError),
    #[error("failed to spawn controller thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to a running controller.
#[derive(Debug)]
pub struct RunnerHandle {
    reporter: ReporterName,
    root: Context,
    queue: Arc<WorkQueue<JobName>>,
    stats: Arc<Mutex<RunnerStats>>,
    joins: Vec<thread::JoinHandle<()>>,
}

impl RunnerHandle {
    pub fn reporter(&self) -> &ReporterName {
        &self.reporter
    }

    pub fn stats(&self) -> RunnerStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Queue a key by hand (e.g. a periodic resync).
    pub fn enqueue(&self, name: JobName) {
        self.queue.add(name);
    }

    /// Cancel in-flight reconciles, stop all threads and wait for them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.joins.is_empty() {
            return;
        }
        self.root.cancel();
        self.queue.shut_down();
        for join in self.joins.drain(..) {
            let _ = join.join();
        }
        info!(reporter = %self.reporter, "controller stopped");
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Controller for a single reporter.
#[derive(Debug)]
pub struct ControllerRunner<S, R> {
    reconciler: Arc<Reconciler<S, R>>,
    options: RunnerOptions,
}

impl<S, R> ControllerRunner<S, R>
where
    S: JobStore + 'static,
    R: Reporter + 'static,
{
    pub fn new(reconciler: Reconciler<S, R>, options: RunnerOptions) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            options,
        }
    }

    /// Start watching and reconciling.
    ///
    /// Subscribes before listing so no change between the two is missed; every
    /// existing job is queued once up front.
    pub fn spawn(self) -> Result<RunnerHandle, RunnerError> {
        let reporter = self.reconciler.reporter().name().clone();
        let root = Context::background();
        let queue = Arc::new(WorkQueue::new(self.options.backoff));
        let stats = Arc::new(Mutex::new(RunnerStats::default()));

        let sub = self.reconciler.store().watch();
        for job in self.reconciler.store().list(&root)? {
            queue.add(job.name);
        }

        let mut handle = RunnerHandle {
            reporter: reporter.clone(),
            root: root.clone(),
            queue: queue.clone(),
            stats: stats.clone(),
            joins: Vec::with_capacity(self.options.workers + 1),
        };

        let watch = {
            let queue = queue.clone();
            let root = root.clone();
            let tick = self.options.watch_tick;
            thread::Builder::new()
                .name(format!("crier-watch-{reporter}"))
                .spawn(move || watch_loop(sub, &queue, &root, tick))?
        };
        handle.joins.push(watch);

        for id in 0..self.options.workers.max(1) {
            let worker = Worker {
                id,
                reconciler: self.reconciler.clone(),
                queue: queue.clone(),
                root: root.clone(),
                stats: stats.clone(),
                timeout: self.options.reconcile_timeout,
            };
            // On error the handle is dropped, which stops the threads spawned so far.
            let join = thread::Builder::new()
                .name(format!("crier-{reporter}-{id}"))
                .spawn(move || worker.run())?;
            handle.joins.push(join);
        }

        info!(
            reporter = %reporter,
            workers = self.options.workers.max(1),
            queued = queue.len(),
            "controller started"
        );
        Ok(handle)
    }
}

fn watch_loop(
    sub: Subscription<JobEvent>,
    queue: &WorkQueue<JobName>,
    root: &Context,
    tick: Duration,
) {
    loop {
        if root.is_done() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(event) => queue.add(event.into_name()),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

struct Worker<S, R> {
    id: usize,
    reconciler: Arc<Reconciler<S, R>>,
    queue: Arc<WorkQueue<JobName>>,
    root: Context,
    stats: Arc<Mutex<RunnerStats>>,
    timeout: Option<Duration>,
}

impl<S, R> Worker<S, R>
where
    S: JobStore,
    R: Reporter,
{
    fn run(self) {
        let reporter = self.reconciler.reporter().name().clone();

        while let Some(name) = self.queue.get() {
            let mut ctx = self.root.child();
            if let Some(timeout) = self.timeout {
                ctx = ctx.with_timeout(timeout);
            }

            let result = self.reconciler.reconcile(&ctx, &name);
            self.record(&result);

            match result {
                Ok(outcome) => {
                    self.queue.forget(&name);
                    debug!(reporter = %reporter, job = %name, worker = self.id, ?outcome, "reconciled");
                }
                Err(err) if self.root.is_done() => {
                    debug!(reporter = %reporter, job = %name, error = %err, "reconcile abandoned on shutdown");
                }
                Err(err) => {
                    let delay = self.queue.add_rate_limited(name.clone());
                    if let Ok(mut stats) = self.stats.lock() {
                        stats.requeues += 1;
                    }
                    warn!(
                        reporter = %reporter,
                        job = %name,
                        error = %err,
                        cancelled = err.is_cancelled(),
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "reconcile failed, requeueing"
                    );
                }
            }

            self.queue.done(&name);
        }
    }

    fn record<E>(&self, result: &Result<ReconcileOutcome, E>) {
        let Ok(mut stats) = self.stats.lock() else {
            return;
        };
        stats.reconciles += 1;
        match result {
            Ok(outcome) if outcome.reported() => stats.reported += 1,
            Ok(_) => stats.skipped += 1,
            Err(_) => stats.failures += 1,
        }
    }
}
