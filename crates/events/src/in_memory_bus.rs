//! Process-local change feed.

use std::sync::{Mutex, MutexGuard, mpsc};

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InMemoryBusError {
    #[error("event bus lock poisoned")]
    Poisoned,
    #[error("event bus closed")]
    Closed,
}

#[derive(Debug)]
struct Subscribers<M> {
    senders: Vec<mpsc::Sender<M>>,
    closed: bool,
}

/// Fan-out bus over std channels.
///
/// Every subscriber gets its own unbounded queue, so a slow watcher never
/// blocks the writer that published. Subscribers whose receiver is gone are
/// pruned on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    inner: Mutex<Subscribers<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Subscribers<M>>, InMemoryBusError> {
        self.inner.lock().map_err(|_| InMemoryBusError::Poisoned)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().map(|s| s.senders.len()).unwrap_or(0)
    }

    /// Drop every sender. Receivers drain what was already queued, then see
    /// a disconnect. Later subscriptions are born disconnected.
    pub fn close(&self) {
        if let Ok(mut subs) = self.lock() {
            subs.closed = true;
            subs.senders.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().map(|s| s.closed).unwrap_or(true)
    }
}

impl<M: Clone> InMemoryEventBus<M> {
    /// Publish and return how many subscribers received the message.
    pub fn broadcast(&self, message: M) -> Result<usize, InMemoryBusError> {
        let mut subs = self.lock()?;
        if subs.closed {
            return Err(InMemoryBusError::Closed);
        }

        subs.senders.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(subs.senders.len())
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Subscribers {
                senders: Vec::new(),
                closed: false,
            }),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.broadcast(message).map(|_| ())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        if let Ok(mut subs) = self.lock() {
            if !subs.closed {
                subs.senders.push(tx);
            }
        }

        Subscription::new(rx)
    }
}
