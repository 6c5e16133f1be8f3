//! Error types for the translator module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during translation.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// pdf2zh binary not found.
    #[error("pdf2zh not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// Input file not found or empty.
    #[error("Input PDF not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The tool exited unsuccessfully.
    #[error("Translation failed: {reason}")]
    ProcessFailed {
        reason: String,
        /// Last lines of the tool's log.
        log_tail: Option<String>,
    },

    /// The tool succeeded but the expected output is missing.
    #[error("Translation produced no output at {expected}")]
    OutputMissing { expected: PathBuf },

    /// I/O error during translation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    /// Creates a new process failure with an optional log excerpt.
    pub fn process_failed(reason: impl Into<String>, log_tail: Option<String>) -> Self {
        Self::ProcessFailed {
            reason: reason.into(),
            log_tail,
        }
    }

    /// Message including the log excerpt, suitable for storing on a record.
    pub fn detailed(&self) -> String {
        match self {
            Self::ProcessFailed {
                log_tail: Some(tail),
                ..
            } if !tail.trim().is_empty() => format!("{}\n{}", self, tail.trim_end()),
            _ => self.to_string(),
        }
    }
}
