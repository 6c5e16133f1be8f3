//! Session memory configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a stored result set stays usable (seconds).
    #[serde(default = "default_ttl")]
    pub papers_ttl_secs: u64,

    /// How long the last-active pointer stays usable (seconds).
    #[serde(default = "default_ttl")]
    pub active_ttl_secs: u64,

    /// Result sets are truncated to this many papers.
    #[serde(default = "default_max_papers")]
    pub max_papers: usize,
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_papers() -> usize {
    50
}

impl SessionConfig {
    pub fn papers_ttl(&self) -> Duration {
        Duration::from_secs(self.papers_ttl_secs)
    }

    pub fn active_ttl(&self) -> Duration {
        Duration::from_secs(self.active_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            papers_ttl_secs: default_ttl(),
            active_ttl_secs: default_ttl(),
            max_papers: default_max_papers(),
        }
    }
}
