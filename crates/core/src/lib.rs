//! Job model and shared primitives for the reporting controller.
//!
//! This crate contains no I/O; stores, reporters and runners build on it.

pub mod context;
pub mod error;
pub mod id;
pub mod job;

pub use context::{Cancelled, Context};
pub use error::{DomainError, DomainResult, NameProblem};
pub use id::{JobName, ReporterName};
pub use job::{Job, JobSpec, JobState, JobStatus, JobType};
