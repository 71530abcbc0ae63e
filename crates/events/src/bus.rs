//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus distributes change signals to whoever is listening: views that
//! need to re-query, other application instances sharing the same storage
//! medium, background workers.
//!
//! ## Delivery
//!
//! - **Broadcast**: every subscription gets a copy of every published message.
//! - **Best effort**: signals are hints to re-read state, never the state
//!   itself. A lost signal costs a stale view until the next one arrives.
//! - **Ordered per publisher**: one publisher's messages arrive in publish
//!   order. Interleaving between publishers is unspecified.
//! - **No persistence**: a subscription only sees messages published after it
//!   was created.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a bus.
///
/// Designed for single-consumer use; share it behind a mutex or re-broadcast
/// if several tasks need the same stream.
///
/// ```ignore
/// let sub = bus.subscribe();
/// while let Ok(signal) = sub.recv_timeout(Duration::from_secs(1)) {
///     refresh_view(signal);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transport-agnostic pub/sub bus.
///
/// Implementations must be `Send + Sync`; any thread or task may publish.
/// `publish` may fail (e.g. a poisoned lock); callers decide whether that
/// matters. For change signals it never does, since the write that triggered
/// the signal already happened.
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
