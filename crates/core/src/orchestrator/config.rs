//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::translator::TranslatorConfig;

/// Request defaults applied by the task orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Translation service used when a request does not name one.
    #[serde(default = "default_service")]
    pub default_service: String,

    /// Translator threads used when a request does not specify them.
    #[serde(default = "default_threads")]
    pub default_threads: u32,

    /// Keep the side-by-side output unless a request says otherwise.
    #[serde(default)]
    pub keep_dual: bool,
}

fn default_service() -> String {
    "bing".to_string()
}

fn default_threads() -> u32 {
    4
}

impl OrchestratorConfig {
    /// Take the request defaults from the translator section.
    pub fn from_translator(config: &TranslatorConfig) -> Self {
        Self {
            default_service: config.default_service.clone(),
            default_threads: config.default_threads,
            keep_dual: config.keep_dual,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_service: default_service(),
            default_threads: default_threads(),
            keep_dual: false,
        }
    }
}
