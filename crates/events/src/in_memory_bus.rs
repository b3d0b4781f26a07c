//! Single-process bus used by the API binary and the test suites.

use std::sync::Mutex;
use std::sync::mpsc;

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

/// Errors surfaced by [`InMemoryEventBus::publish`].
#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// The subscriber list mutex was poisoned by a panicking publisher.
    #[error("event bus subscriber list poisoned")]
    Poisoned,
}

/// Broadcast bus backed by one std channel per subscriber.
///
/// Every publish clones the message into each live channel. Senders whose
/// receiver has been dropped are pruned during that same publish, so an
/// abandoned subscription stops costing anything after the next message.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut senders = self
            .senders
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        // A send only fails when the receiving half is gone; prune those.
        senders.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // Register the sender even after a poisoning panic elsewhere; the
        // list itself is still a valid Vec.
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);

        Subscription::new(rx)
    }
}
