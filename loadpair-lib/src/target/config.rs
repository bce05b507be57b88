use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Behaviour of the mock responder: how long to wait and what to answer.
///
/// Wire format (admin API): `{"duration": <ms>, "response": "<body>"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Simulated backend latency in milliseconds.
    #[serde(alias = "Duration")]
    pub duration: u64,
    /// Full response payload.
    #[serde(alias = "Response")]
    pub response: String,
}

impl ResponderConfig {
    pub fn new(duration: u64, response: impl Into<String>) -> Self {
        Self {
            duration,
            response: response.into(),
        }
    }

    #[inline(always)]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.duration)
    }
}

/// Process-wide store of the current [`ResponderConfig`].
///
/// Readers get an immutable snapshot, writers swap in a complete new record,
/// so a reader never observes a half-updated configuration.
/// Cloning shares the same underlying store.
#[derive(Debug, Clone)]
pub struct ResponderConfigStore(Arc<ArcSwap<ResponderConfig>>);

impl ResponderConfigStore {
    pub fn new(initial: ResponderConfig) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(initial)))
    }

    #[inline(always)]
    pub fn snapshot(&self) -> Arc<ResponderConfig> {
        self.0.load_full()
    }

    /// Atomically replace the config, returning the previous one.
    pub fn replace(&self, cfg: ResponderConfig) -> Arc<ResponderConfig> {
        self.0.swap(Arc::new(cfg))
    }
}

impl Default for ResponderConfigStore {
    fn default() -> Self {
        Self::new(ResponderConfig::default())
    }
}
