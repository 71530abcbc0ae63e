use serde::{Deserialize, Serialize};

use matchng_core::InstanceId;

/// Named change topics. Signals carry no payload; subscribers re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Something in the persistent store was written or removed.
    StoreChanged,
    /// The instance moved between online and offline.
    ConnectivityChanged,
}

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::StoreChanged => "matchng.store.changed",
            Topic::ConnectivityChanged => "matchng.connectivity.changed",
        }
    }
}

impl core::str::FromStr for Topic {
    type Err = String;

    /// Parses the dotted [`Topic::name`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Topic::StoreChanged, Topic::ConnectivityChanged]
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown topic `{s}`"))
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// What actually travels on the bus.
///
/// `origin` lets an instance skip its own echoes on the shared channel; it is
/// routing metadata, not something subscribers get to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSignal {
    pub topic: Topic,
    pub origin: InstanceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for topic in [Topic::StoreChanged, Topic::ConnectivityChanged] {
            assert_eq!(topic.name().parse::<Topic>(), Ok(topic));
        }
        assert!("matchng.nope".parse::<Topic>().is_err());
    }
}
