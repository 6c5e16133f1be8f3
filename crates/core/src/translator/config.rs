//! Configuration for the translator module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the pdf2zh-based translator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Path to the pdf2zh binary.
    #[serde(default = "default_pdf2zh_bin")]
    pub pdf2zh_bin: PathBuf,

    /// Translation service used when a request does not name one.
    #[serde(default = "default_service")]
    pub default_service: String,

    /// Worker threads used when a request does not specify them.
    #[serde(default = "default_threads")]
    pub default_threads: u32,

    /// Keep the side-by-side output unless a request says otherwise.
    #[serde(default)]
    pub keep_dual: bool,

    /// Additional arguments appended to every pdf2zh invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_pdf2zh_bin() -> PathBuf {
    PathBuf::from("pdf2zh")
}

fn default_service() -> String {
    "bing".to_string()
}

fn default_threads() -> u32 {
    4
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            pdf2zh_bin: default_pdf2zh_bin(),
            default_service: default_service(),
            default_threads: default_threads(),
            keep_dual: false,
            extra_args: Vec::new(),
        }
    }
}
