//! Controller runner: change notifications in, reconcile calls out.
//!
//! ## Components
//!
//! - `WorkQueue`: deduplicating, per-key serialized queue with delayed and
//!   rate-limited adds
//! - `Backoff`: retry delay policy for failed keys
//! - `ControllerRunner`: watch thread + worker pool for one reporter

pub mod backoff;
pub mod queue;
pub mod runner;

pub use backoff::{Backoff, BackoffStrategy};
pub use queue::WorkQueue;
pub use runner::{ControllerRunner, RunnerError, RunnerHandle, RunnerOptions, RunnerStats};
