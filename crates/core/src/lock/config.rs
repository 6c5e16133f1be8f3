//! Resource lock configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing knobs for [`ResourceLock`](super::ResourceLock).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long `acquire` waits before failing with `RESOURCE_BUSY` (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Age after which a marker is considered abandoned (seconds).
    /// Must comfortably exceed the slowest expected translation.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Poll interval while waiting for a held lock (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How often the server sweeps the lock directory for stale markers (seconds).
    /// 0 disables the periodic sweep; the startup sweep always runs.
    #[serde(default = "default_reclaim_interval")]
    pub reclaim_interval_secs: u64,
}

fn default_timeout() -> u64 {
    1800 // 30 minutes
}

fn default_stale_after() -> u64 {
    7200 // 2 hours
}

fn default_poll_interval() -> u64 {
    200
}

fn default_reclaim_interval() -> u64 {
    600 // 10 minutes
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// How often a held marker is refreshed: well inside `stale_after`.
    pub fn heartbeat_interval(&self) -> Duration {
        (self.stale_after() / 3).max(Duration::from_millis(50))
    }

    pub fn reclaim_interval(&self) -> Option<Duration> {
        (self.reclaim_interval_secs > 0).then(|| Duration::from_secs(self.reclaim_interval_secs))
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            stale_after_secs: default_stale_after(),
            poll_interval_ms: default_poll_interval(),
            reclaim_interval_secs: default_reclaim_interval(),
        }
    }
}
