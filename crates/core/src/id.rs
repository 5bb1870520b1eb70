//! Strongly-typed names used across the controller.
//!
//! Jobs are keyed by a unique, immutable name. Reporters are keyed by a stable
//! name that doubles as their slot in `JobStatus::prev_report_states`, so both
//! are validated up front instead of at every use site.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, NameProblem};

/// Unique key of a job record in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobName(String);

/// Stable identifier of a reporter backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReporterName(String);

fn validate(kind: &'static str, value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::invalid_name(kind, value, NameProblem::Empty));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(DomainError::invalid_name(kind, value, NameProblem::Whitespace));
    }
    Ok(())
}

macro_rules! impl_name_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                validate($name, &value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_name_newtype!(JobName, "job name");
impl_name_newtype!(ReporterName, "reporter name");
