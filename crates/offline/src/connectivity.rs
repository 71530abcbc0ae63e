//! Online/offline detection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use matchng_events::{SyncNotifier, Topic};

/// Deadline for a single probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Connectivity state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    pub fn is_online(self) -> bool {
        self == ConnectivityState::Online
    }
}

/// Result of a [`ConnectivityMonitor`] update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
    Unchanged,
}

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probe that issues `GET <url>`; any response within [`PROBE_TIMEOUT`]
/// counts as online, whatever its status code.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) => {
                debug!(url = %self.url, status = resp.status().as_u16(), "probe answered");
                true
            }
            Err(err) => {
                debug!(url = %self.url, error = %err, "probe failed");
                false
            }
        }
    }
}

/// Probe whose answer is set by hand. Used when no probe URL is configured
/// and by tests.
#[derive(Debug, Default)]
pub struct ManualProbe {
    online: AtomicBool,
}

impl ManualProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

#[async_trait]
impl ConnectivityProbe for ManualProbe {
    async fn is_reachable(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}

/// Tracks connectivity and announces changes on
/// [`Topic::ConnectivityChanged`].
pub struct ConnectivityMonitor {
    state: Mutex<ConnectivityState>,
    probe: Arc<dyn ConnectivityProbe>,
    notifier: Arc<SyncNotifier>,
}

impl ConnectivityMonitor {
    pub fn new(
        probe: Arc<dyn ConnectivityProbe>,
        notifier: Arc<SyncNotifier>,
        initial: ConnectivityState,
    ) -> Self {
        Self {
            state: Mutex::new(initial),
            probe,
            notifier,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// Probe and record the result.
    pub async fn refresh(&self) -> Transition {
        let next = if self.probe.is_reachable().await {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        };
        self.set_state(next)
    }

    /// Override the state without probing.
    pub fn set_state(&self, next: ConnectivityState) -> Transition {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, next)
        };

        let transition = match (previous, next) {
            (ConnectivityState::Offline, ConnectivityState::Online) => Transition::CameOnline,
            (ConnectivityState::Online, ConnectivityState::Offline) => Transition::WentOffline,
            _ => Transition::Unchanged,
        };

        if transition != Transition::Unchanged {
            info!(?previous, ?next, "connectivity changed");
            self.notifier.notify(Topic::ConnectivityChanged);
        }
        transition
    }
}

impl core::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
