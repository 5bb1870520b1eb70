//! Change publishing/subscription abstraction (mechanics only).
//!
//! The bus carries job-changed notifications from the store to the
//! controllers watching it. It is intentionally lightweight:
//!
//! - **Transport-agnostic**: in-memory channels here, anything else elsewhere
//! - **At-least-once delivery**: a key may arrive more than once; consumers
//!   re-read the record and must be idempotent
//! - **Broadcast**: every subscription sees every published message
//! - **No persistence**: the store is the source of truth, not the bus

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to a message stream.
///
/// Subscriptions are meant for a single consuming thread. Dropping the
/// subscription unsubscribes it on the next publish.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Pub/sub abstraction for change notifications.
///
/// `publish` may fail (closed or poisoned transport); callers decide whether
/// that matters. Store writes never roll back because a publish failed.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
