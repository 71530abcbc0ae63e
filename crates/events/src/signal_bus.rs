//! In-process routing of change signals.

use std::sync::{Mutex, mpsc};

use matchng_core::InstanceId;

use crate::bus::{EventBus, Subscription};
use crate::error::BusError;
use crate::topic::{ChangeSignal, Topic};

/// What one subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalFilter {
    pub topic: Topic,
    /// Drop signals fired by this instance (echo suppression).
    pub skip_origin: Option<InstanceId>,
}

impl SignalFilter {
    pub fn topic(topic: Topic) -> Self {
        Self {
            topic,
            skip_origin: None,
        }
    }

    pub fn from_others(topic: Topic, me: InstanceId) -> Self {
        Self {
            topic,
            skip_origin: Some(me),
        }
    }

    pub fn accepts(&self, signal: &ChangeSignal) -> bool {
        signal.topic == self.topic && Some(signal.origin) != self.skip_origin
    }
}

#[derive(Debug)]
struct Route {
    filter: Option<SignalFilter>,
    tx: mpsc::Sender<ChangeSignal>,
}

/// Routes each [`ChangeSignal`] to the subscribers whose filter accepts it.
///
/// Filtering happens on publish, so a subscriber to `StoreChanged` is never
/// woken for connectivity flaps. A route is dropped the first time a send to
/// it fails. Sharing one bus (behind an `Arc`) between several notifiers in a
/// process stands in for a common storage medium.
#[derive(Debug, Default)]
pub struct SignalBus {
    routes: Mutex<Vec<Route>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscription that only ever receives signals `filter` accepts.
    pub fn subscribe_filtered(&self, filter: SignalFilter) -> Subscription<ChangeSignal> {
        self.add_route(Some(filter))
    }

    /// Routes still registered.
    pub fn subscriber_count(&self) -> usize {
        self.routes.lock().map(|routes| routes.len()).unwrap_or(0)
    }

    fn add_route(&self, filter: Option<SignalFilter>) -> Subscription<ChangeSignal> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route { filter, tx });
        }
        Subscription::new(rx)
    }
}

impl EventBus<ChangeSignal> for SignalBus {
    type Error = BusError;

    fn publish(&self, signal: ChangeSignal) -> Result<(), Self::Error> {
        let mut routes = self.routes.lock().map_err(|_| BusError::Poisoned)?;
        routes.retain(|route| match route.filter {
            Some(filter) if !filter.accepts(&signal) => true,
            _ => route.tx.send(signal).is_ok(),
        });
        Ok(())
    }

    /// Unfiltered: every signal, every topic, every origin.
    fn subscribe(&self) -> Subscription<ChangeSignal> {
        self.add_route(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(topic: Topic, origin: InstanceId) -> ChangeSignal {
        ChangeSignal { topic, origin }
    }

    #[test]
    fn filtered_routes_only_get_matching_signals() {
        let bus = SignalBus::new();
        let me = InstanceId::new();
        let other = InstanceId::new();

        let store_only = bus.subscribe_filtered(SignalFilter::topic(Topic::StoreChanged));
        let others_only = bus.subscribe_filtered(SignalFilter::from_others(Topic::StoreChanged, me));
        let everything = bus.subscribe();

        bus.publish(signal(Topic::ConnectivityChanged, other)).unwrap();
        bus.publish(signal(Topic::StoreChanged, me)).unwrap();
        bus.publish(signal(Topic::StoreChanged, other)).unwrap();

        assert_eq!(store_only.try_recv().unwrap().origin, me);
        assert_eq!(store_only.try_recv().unwrap().origin, other);
        assert!(store_only.try_recv().is_err());

        assert_eq!(others_only.try_recv().unwrap().origin, other);
        assert!(others_only.try_recv().is_err());

        let mut seen = 0;
        while everything.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn closed_routes_are_dropped_on_delivery() {
        let bus = SignalBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(signal(Topic::StoreChanged, InstanceId::new())).unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn late_subscribers_miss_earlier_signals() {
        let bus = SignalBus::new();
        bus.publish(signal(Topic::StoreChanged, InstanceId::new())).unwrap();
        let late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }
}
