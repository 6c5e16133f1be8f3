//! Types for the task orchestrator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{AssetClass, PdfAsset, TranslateAsset};
use crate::fetch::FetchError;
use crate::lock::LockError;
use crate::session::{PaperRef, ResolveError};
use crate::task::{TaskError, TaskKind};
use crate::translator::TranslateError;

// ============================================================================
// Requests
// ============================================================================

/// Translation parameters. Unset fields fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_dual: Option<bool>,
}

/// A request to fetch or translate a paper.
///
/// The paper is identified, in priority order, by an existing local
/// `input_pdf_path`, an explicit `paper_id`, or `ref` resolved against the
/// session (absent `ref` means the session's last-used paper).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnqueueRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub kind: TaskKind,
    #[serde(default, rename = "ref", alias = "reference", skip_serializing_if = "Option::is_none")]
    pub reference: Option<PaperRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_pdf_path: Option<PathBuf>,
    /// Redo the work even if a cached result exists.
    #[serde(default)]
    pub force: bool,
    #[serde(flatten)]
    pub options: TranslateOptions,
}

impl EnqueueRequest {
    pub fn translate(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            kind: TaskKind::Translate,
            ..Default::default()
        }
    }

    pub fn download(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            kind: TaskKind::Download,
            ..Default::default()
        }
    }

    pub fn with_ref(mut self, reference: impl Into<PaperRef>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_paper_id(mut self, paper_id: impl Into<String>) -> Self {
        self.paper_id = Some(paper_id.into());
        self
    }

    pub fn with_pdf_url(mut self, pdf_url: impl Into<String>) -> Self {
        self.pdf_url = Some(pdf_url.into());
        self
    }

    pub fn with_input_pdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_pdf_path = Some(path.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Cache state of one paper across both asset classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperCacheStatus {
    pub paper_id: String,
    pub pdf: Option<PdfAsset>,
    pub translate: Option<TranslateAsset>,
    /// READY with the file present.
    pub pdf_ready: bool,
    /// READY with the file present.
    pub translated_ready: bool,
}

/// Records of one asset class.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AssetList {
    Pdf(Vec<PdfAsset>),
    Translate(Vec<TranslateAsset>),
}

impl AssetList {
    pub fn len(&self) -> usize {
        match self {
            AssetList::Pdf(v) => v.len(),
            AssetList::Translate(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Background workers currently running.
    pub active_workers: usize,
    /// Tasks per status.
    pub tasks: BTreeMap<String, usize>,
    pub pdf_assets: usize,
    pub translate_assets: usize,
    /// Event subscribers across all sessions.
    pub subscribers: usize,
    /// Sessions with a live result set or last-active paper.
    pub sessions: usize,
}

// ============================================================================
// Errors
// ============================================================================

/// Failure categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ResourceBusy,
    TransformFailed,
    FetchFailed,
    CacheIoError,
    InvalidRequest,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ResourceBusy => "RESOURCE_BUSY",
            ErrorCode::TransformFailed => "TRANSFORM_FAILED",
            ErrorCode::FetchFailed => "FETCH_FAILED",
            ErrorCode::CacheIoError => "CACHE_IO_ERROR",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The paper reference could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The operation conflicts with work in progress.
    #[error("resource busy: {0}")]
    Busy(String),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("translation failed: {0}")]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A concurrent worker for the same asset failed while this job waited.
    #[error("{error}")]
    AlreadyFailed { class: AssetClass, error: String },

    /// The background worker died unexpectedly.
    #[error("worker aborted: {0}")]
    WorkerAborted(String),
}

impl OrchestratorError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Resolve(_) | Self::TaskNotFound(_) => ErrorCode::NotFound,
            Self::Task(TaskError::NotFound(_)) => ErrorCode::NotFound,
            Self::Task(TaskError::InvalidTransition { .. }) => ErrorCode::Internal,
            Self::Busy(_) | Self::Lock(LockError::Busy { .. }) => ErrorCode::ResourceBusy,
            Self::Lock(LockError::Io { .. }) => ErrorCode::Internal,
            Self::Fetch(_) => ErrorCode::FetchFailed,
            Self::Translate(_) => ErrorCode::TransformFailed,
            Self::AlreadyFailed { class, .. } => match class {
                AssetClass::Pdf => ErrorCode::FetchFailed,
                AssetClass::Translate => ErrorCode::TransformFailed,
            },
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::Io(_) | Self::WorkerAborted(_) => ErrorCode::Internal,
        }
    }

    /// Message recorded on failed tasks and assets.
    pub fn detail(&self) -> String {
        match self {
            Self::Translate(e) => format!("translation failed: {}", e.detailed()),
            other => other.to_string(),
        }
    }
}
