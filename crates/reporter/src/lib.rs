//! Reporter capability contract and the backends that ship with the controller.

pub mod fake;
pub mod log_reporter;
pub mod reporter;

pub use fake::FakeReporter;
pub use log_reporter::LogReporter;
pub use reporter::{ReportError, Reporter};
