//! Store change notification, in-process and across instances.

use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use tracing::warn;

use matchng_core::InstanceId;

use crate::bus::{EventBus, Subscription};
use crate::error::BusError;
use crate::signal_bus::{SignalBus, SignalFilter};
use crate::topic::{ChangeSignal, Topic};

/// Bus shared by every instance attached to the same persistence medium.
pub type SharedChannel = Arc<dyn EventBus<ChangeSignal, Error = BusError>>;

/// Fires payload-less change signals on two channels:
///
/// - **local**: subscribers inside this instance, including the writer itself;
/// - **shared** (optional): other instances on the same medium. Remote
///   subscriptions never see signals this instance produced, the way browser
///   storage events skip the tab that wrote.
///
/// Publishing never fails from the caller's point of view; bus errors are
/// logged and dropped.
pub struct SyncNotifier {
    instance: InstanceId,
    local: SignalBus,
    shared: Option<SharedChannel>,
}

impl SyncNotifier {
    /// Notifier with an in-process channel only.
    pub fn new() -> Self {
        Self {
            instance: InstanceId::new(),
            local: SignalBus::new(),
            shared: None,
        }
    }

    /// Notifier that also broadcasts on `shared`.
    pub fn with_shared_channel(shared: SharedChannel) -> Self {
        Self {
            shared: Some(shared),
            ..Self::new()
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn notify(&self, topic: Topic) {
        let signal = ChangeSignal {
            topic,
            origin: self.instance,
        };

        if let Err(err) = self.local.publish(signal) {
            warn!(topic = %topic, error = ?err, "failed to publish local change signal");
        }
        if let Some(shared) = &self.shared {
            if let Err(err) = shared.publish(signal) {
                warn!(topic = %topic, error = ?err, "failed to publish shared change signal");
            }
        }
    }

    /// In-process subscription to one topic.
    pub fn subscribe(&self, topic: Topic) -> TopicSubscription {
        let filter = SignalFilter::topic(topic);
        TopicSubscription {
            inner: self.local.subscribe_filtered(filter),
            filter,
        }
    }

    /// Subscription to signals from *other* instances. `None` when no shared
    /// channel is attached.
    pub fn subscribe_remote(&self, topic: Topic) -> Option<TopicSubscription> {
        let shared = self.shared.as_ref()?;
        Some(TopicSubscription {
            inner: shared.subscribe(),
            filter: SignalFilter::from_others(topic, self.instance),
        })
    }
}

impl Default for SyncNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SyncNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncNotifier")
            .field("instance", &self.instance)
            .field("shared", &self.shared.is_some())
            .finish()
    }
}

/// A subscription filtered to one topic (and optionally one origin).
///
/// Shared channels are arbitrary [`EventBus`] implementations, so the filter
/// is checked again on receipt.
#[derive(Debug)]
pub struct TopicSubscription {
    inner: Subscription<ChangeSignal>,
    filter: SignalFilter,
}

impl TopicSubscription {
    pub fn topic(&self) -> Topic {
        self.filter.topic
    }

    fn accepts(&self, signal: &ChangeSignal) -> bool {
        self.filter.accepts(signal)
    }

    /// Next matching signal if one is already queued.
    pub fn try_recv(&self) -> Option<Topic> {
        loop {
            match self.inner.try_recv() {
                Ok(signal) if self.accepts(&signal) => return Some(signal.topic),
                Ok(_) => continue,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Wait up to `timeout` for a matching signal.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Topic> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inner.recv_timeout(remaining) {
                Ok(signal) if self.accepts(&signal) => return Some(signal.topic),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Consume everything queued; returns how many matching signals there
    /// were. Consumers usually only care whether this is non-zero.
    pub fn drain(&self) -> usize {
        let mut n = 0;
        while self.try_recv().is_some() {
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_subscribers_see_their_own_writes() {
        let notifier = SyncNotifier::new();
        let sub = notifier.subscribe(Topic::StoreChanged);

        notifier.notify(Topic::StoreChanged);
        assert_eq!(sub.try_recv(), Some(Topic::StoreChanged));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn topic_filter_skips_other_topics() {
        let notifier = SyncNotifier::new();
        let sub = notifier.subscribe(Topic::StoreChanged);

        notifier.notify(Topic::ConnectivityChanged);
        notifier.notify(Topic::StoreChanged);
        notifier.notify(Topic::StoreChanged);
        assert_eq!(sub.drain(), 2);
    }

    #[test]
    fn remote_subscribers_only_see_other_instances() {
        let shared: SharedChannel = Arc::new(SignalBus::new());
        let tab_a = SyncNotifier::with_shared_channel(shared.clone());
        let tab_b = SyncNotifier::with_shared_channel(shared);

        let a_remote = tab_a.subscribe_remote(Topic::StoreChanged).unwrap();
        let b_remote = tab_b.subscribe_remote(Topic::StoreChanged).unwrap();

        tab_a.notify(Topic::StoreChanged);

        assert_eq!(a_remote.try_recv(), None);
        assert_eq!(b_remote.try_recv(), Some(Topic::StoreChanged));
    }

    #[test]
    fn no_remote_subscription_without_shared_channel() {
        assert!(SyncNotifier::new().subscribe_remote(Topic::StoreChanged).is_none());
    }

    #[test]
    fn recv_timeout_gives_up() {
        let notifier = SyncNotifier::new();
        let sub = notifier.subscribe(Topic::StoreChanged);
        assert_eq!(sub.recv_timeout(Duration::from_millis(10)), None);
    }
}
