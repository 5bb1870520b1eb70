use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use crier_core::{Context, Job, JobName};
use crier_events::{EventBus, InMemoryBusError, InMemoryEventBus, JobEvent, Subscription};

use super::patch::JobPatch;
use super::r#trait::{JobStore, StoreError};

/// In-memory job store for tests/dev.
///
/// Every write (including patches) publishes a `JobEvent` after the lock is
/// released. Patches are applied under the write lock against the current
/// record, which makes them atomic with respect to every other writer.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<BTreeMap<JobName, Job>>,
    events: InMemoryEventBus<JobEvent>,
}

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job (upstream job-execution components only).
    pub fn create(&self, job: Job) -> Result<(), StoreError> {
        let name = job.name.clone();
        {
            let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
            if jobs.contains_key(&name) {
                return Err(StoreError::AlreadyExists(name));
            }
            jobs.insert(name.clone(), job);
        }
        self.notify(JobEvent::added(name));
        Ok(())
    }

    /// Replace a whole job record (upstream job-execution components only).
    ///
    /// Reporting controllers must use `patch` instead.
    pub fn update(&self, job: Job) -> Result<(), StoreError> {
        let name = job.name.clone();
        {
            let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
            let Some(slot) = jobs.get_mut(&name) else {
                return Err(StoreError::NotFound(name));
            };
            *slot = job;
        }
        self.notify(JobEvent::modified(name));
        Ok(())
    }

    /// Read-modify-write a job under the store lock.
    ///
    /// Convenience for upstream writers that change one field (e.g. the state)
    /// without racing concurrent patches.
    pub fn modify<F>(&self, name: &JobName, f: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let updated = {
            let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
            let Some(job) = jobs.get_mut(name) else {
                return Err(StoreError::NotFound(name.clone()));
            };
            f(job);
            job.name = name.clone();
            job.clone()
        };
        self.notify(JobEvent::modified(name.clone()));
        Ok(updated)
    }

    pub fn delete(&self, name: &JobName) -> Result<Option<Job>, StoreError> {
        let removed = self.jobs.write().map_err(|_| poisoned())?.remove(name);
        if removed.is_some() {
            self.notify(JobEvent::deleted(name.clone()));
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// End every watch. Watchers drain pending events and then see a
    /// disconnect; the store itself stays readable and writable.
    pub fn close_watch(&self) {
        self.events.close();
    }

    fn notify(&self, event: JobEvent) {
        match self.events.broadcast(event) {
            Ok(watchers) => debug!(watchers, "published job event"),
            Err(InMemoryBusError::Closed) => {}
            Err(err) => warn!(error = %err, "failed to publish job event"),
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, ctx: &Context, name: &JobName) -> Result<Option<Job>, StoreError> {
        ctx.check()?;
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        Ok(jobs.get(name).cloned())
    }

    fn list(&self, ctx: &Context) -> Result<Vec<Job>, StoreError> {
        ctx.check()?;
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        Ok(jobs.values().cloned().collect())
    }

    fn patch(&self, ctx: &Context, name: &JobName, patch: &JobPatch) -> Result<Job, StoreError> {
        ctx.check()?;
        let patched = {
            let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
            let Some(current) = jobs.get_mut(name) else {
                return Err(StoreError::NotFound(name.clone()));
            };
            let patched = patch.apply_to(current)?;
            *current = patched.clone();
            patched
        };
        self.notify(JobEvent::modified(name.clone()));
        Ok(patched)
    }

    fn watch(&self) -> Subscription<JobEvent> {
        self.events.subscribe()
    }
}
