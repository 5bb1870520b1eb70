//! Infrastructure layer: job storage, the per-reporter reconciler and the
//! controller runner that drives it.

pub mod config;
pub mod controller;
pub mod reconciler;
pub mod store;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{Backoff, ControllerRunner, RunnerHandle, RunnerOptions, RunnerStats};
pub use reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
pub use store::{InMemoryJobStore, JobPatch, JobStore, StoreError};
