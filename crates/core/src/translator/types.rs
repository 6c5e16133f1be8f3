//! Types for the translator module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One translation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateJob {
    pub paper_id: String,
    pub input_path: PathBuf,
    /// Directory the tool writes its outputs into.
    pub output_dir: PathBuf,
    /// File the tool's stdout and stderr are appended to.
    pub log_path: PathBuf,
    pub service: String,
    pub threads: u32,
}

/// Files produced by a successful translation, as named by the tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateOutput {
    pub mono_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_path: Option<PathBuf>,
    pub duration_ms: u64,
}
