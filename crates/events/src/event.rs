use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crier_core::JobName;

/// What happened to a job record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Added,
    Modified,
    Deleted,
}

/// Change notification for a single job record.
///
/// Only the key travels; consumers always re-read the record from the store,
/// so a stale or duplicated notification is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    name: JobName,
    kind: JobEventKind,
    observed_at: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(name: JobName, kind: JobEventKind) -> Self {
        Self {
            name,
            kind,
            observed_at: Utc::now(),
        }
    }

    pub fn added(name: JobName) -> Self {
        Self::new(name, JobEventKind::Added)
    }

    pub fn modified(name: JobName) -> Self {
        Self::new(name, JobEventKind::Modified)
    }

    pub fn deleted(name: JobName) -> Self {
        Self::new(name, JobEventKind::Deleted)
    }

    pub fn name(&self) -> &JobName {
        &self.name
    }

    pub fn kind(&self) -> JobEventKind {
        self.kind
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn into_name(self) -> JobName {
        self.name
    }
}
