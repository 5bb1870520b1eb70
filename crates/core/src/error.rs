//! Errors raised by the job model itself.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Why a job or reporter name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameProblem {
    Empty,
    Whitespace,
}

impl core::fmt::Display for NameProblem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            NameProblem::Empty => "must not be empty",
            NameProblem::Whitespace => "must not contain whitespace",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {kind} {value:?}: {problem}")]
    InvalidName {
        kind: &'static str,
        value: String,
        problem: NameProblem,
    },
}

impl DomainError {
    pub fn invalid_name(kind: &'static str, value: impl Into<String>, problem: NameProblem) -> Self {
        Self::InvalidName {
            kind,
            value: value.into(),
            problem,
        }
    }
}
