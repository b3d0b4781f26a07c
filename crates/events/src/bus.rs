//! Pub/sub seam between the event store and everything downstream.
//!
//! Appends always hit the store first; the bus only fans already-persisted
//! envelopes out to in-process consumers (projections, sagas, the realtime
//! feed). Because the store is the source of truth, delivery here is
//! best-effort at-least-once: a consumer that misses or double-sees a
//! message can always reconcile by replaying the stream, and every consumer
//! is written to be idempotent.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Fan-out contract for persisted event envelopes.
///
/// `publish` is invoked by the command dispatcher right after a successful
/// append. A publish failure never unwinds the append: the events are
/// already durable and a lagging consumer catches up from the store.
///
/// Implementations must be shareable across threads; the API binary keeps
/// one bus behind an `Arc` and lets every worker publish concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Deliver `message` to every live subscriber.
    fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Open a subscription that sees every message published after this call.
    /// Messages published earlier are not replayed.
    fn subscribe(&self) -> Subscription<M>;
}

/// Bus handles are routinely cloned as `Arc<B>`; forward through the pointer
/// so call sites can stay generic over `B: EventBus<M>`.
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

/// Receiving half of one subscriber's feed.
///
/// Each subscription owns a private channel; the bus clones every published
/// message into it. The usual consumer is a dedicated thread that blocks on
/// [`recv`](Subscription::recv) and treats a disconnect as shutdown:
///
/// ```ignore
/// let sub = bus.subscribe();
/// while let Ok(envelope) = sub.recv() {
///     projections.apply(&envelope);
/// }
/// // Sender side dropped, thread exits.
/// ```
///
/// A subscription is single-consumer: hand it to one thread and let that
/// thread decide how to distribute work further.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    /// Wrap a channel receiver. Called by bus implementations from
    /// [`EventBus::subscribe`].
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message arrives or the bus is dropped.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Non-blocking poll, for consumers that interleave other work.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for at most `timeout`. Lets a consumer loop wake up
    /// periodically to check for shutdown.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
