//! Logging setup shared by the controller binaries.

/// Tracing subscriber configuration.
pub mod tracing;

pub use self::tracing::{LogFormat, ParseLogFormatError, init};
