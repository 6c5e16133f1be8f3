//! Event bus configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Events buffered per subscriber before new ones are dropped.
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Idle time after which stream consumers emit a keep-alive (seconds).
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

fn default_inbox_capacity() -> usize {
    256
}

fn default_keepalive() -> u64 {
    15
}

impl EventBusConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
            keepalive_secs: default_keepalive(),
        }
    }
}
