//! Cancellation-bearing execution context for a single reconcile.
//!
//! Store and reporter calls take a `&Context` and must give up promptly once
//! it is done, either because the owning runner is shutting down or because
//! the per-reconcile deadline passed.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

/// Returned by `Context::check` once the context is done.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl Context {
    /// A root context that is never done unless cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Child context: cancelled with its parent, cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Tighten the deadline to `now + timeout` (never loosens an existing one).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            return Err(Cancelled::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Cancelled::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
