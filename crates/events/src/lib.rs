//! `matchng-events` — change signals between the store and its consumers.
//!
//! The store fires a [`Topic`] after every write; consumers re-read state on
//! receipt. [`SyncNotifier`] delivers signals in-process and, when a shared
//! channel is attached, to other instances on the same persistence medium.

pub mod bus;
pub mod error;
pub mod notifier;
pub mod signal_bus;
pub mod topic;

pub use bus::{EventBus, Subscription};
pub use error::BusError;
pub use notifier::{SharedChannel, SyncNotifier, TopicSubscription};
pub use signal_bus::{SignalBus, SignalFilter};
pub use topic::{ChangeSignal, Topic};
