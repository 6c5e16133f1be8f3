//! Asset record types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::layout::is_nonempty_file;

// ============================================================================
// Status and Class
// ============================================================================

/// Lifecycle of a cached asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    #[default]
    NotReady,
    InProgress,
    Ready,
    Failed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::NotReady => "NOT_READY",
            AssetStatus::InProgress => "IN_PROGRESS",
            AssetStatus::Ready => "READY",
            AssetStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two resource classes that share the fetch/transform pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Raw PDF fetched from its source.
    Pdf,
    /// Translated output derived from a raw PDF.
    Translate,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Pdf => "pdf",
            AssetClass::Translate => "translate",
        }
    }

    /// Resource lock key for `paper_id` in this class.
    pub fn lock_key(&self, paper_id: &str) -> String {
        format!("{}:{}", self.as_str(), paper_id)
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown class name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown asset class '{0}' (expected 'pdf' or 'translate')")]
pub struct UnknownAssetClass(pub String);

impl FromStr for AssetClass {
    type Err = UnknownAssetClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" | "raw" => Ok(AssetClass::Pdf),
            "translate" | "translated" => Ok(AssetClass::Translate),
            other => Err(UnknownAssetClass(other.to_string())),
        }
    }
}

// ============================================================================
// Asset trait
// ============================================================================

/// A record stored in an [`AssetIndex`](super::AssetIndex).
pub trait Asset: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + 'static {
    /// Class of the records in the index. Used for logging and metrics labels.
    const CLASS: AssetClass;

    fn paper_id(&self) -> &str;

    fn status(&self) -> AssetStatus;

    /// The file this record owns, if one has been assigned.
    fn artifact_path(&self) -> Option<&Path>;

    /// When the artifact last became READY.
    fn ready_at(&self) -> Option<DateTime<Utc>>;

    /// When the record last became FAILED.
    fn failed_at(&self) -> Option<DateTime<Utc>>;

    /// The recorded failure, if any.
    fn error(&self) -> Option<&str>;

    fn touch(&mut self, now: DateTime<Utc>);

    /// Move the record to FAILED with `error`.
    fn fail(&mut self, error: &str);

    /// READY and the artifact is present and non-empty.
    fn is_verified_ready(&self) -> bool {
        self.status() == AssetStatus::Ready
            && self.artifact_path().is_some_and(is_nonempty_file)
    }
}

// ============================================================================
// PDF records
// ============================================================================

/// A fetched PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfAsset {
    pub paper_id: String,
    /// Where the PDF was (or will be) fetched from.
    pub pdf_url: String,
    pub local_path: PathBuf,
    #[serde(default)]
    pub status: AssetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PdfAsset {
    pub fn new(paper_id: impl Into<String>, pdf_url: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            paper_id: paper_id.into(),
            pdf_url: pdf_url.into(),
            local_path,
            status: AssetStatus::NotReady,
            size_bytes: None,
            sha256: None,
            downloaded_at: None,
            failed_at: None,
            updated_at: Utc::now(),
            error: None,
        }
    }

    pub fn mark_in_progress(&mut self) {
        self.status = AssetStatus::InProgress;
        self.error = None;
    }

    pub fn mark_ready(&mut self, size_bytes: u64, sha256: String) {
        self.status = AssetStatus::Ready;
        self.size_bytes = Some(size_bytes);
        self.sha256 = Some(sha256);
        self.downloaded_at = Some(Utc::now());
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = AssetStatus::Failed;
        self.failed_at = Some(Utc::now());
        self.error = Some(error.into());
    }
}

impl Asset for PdfAsset {
    const CLASS: AssetClass = AssetClass::Pdf;

    fn paper_id(&self) -> &str {
        &self.paper_id
    }

    fn status(&self) -> AssetStatus {
        self.status
    }

    fn artifact_path(&self) -> Option<&Path> {
        Some(&self.local_path)
    }

    fn ready_at(&self) -> Option<DateTime<Utc>> {
        self.downloaded_at
    }

    fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn fail(&mut self, error: &str) {
        self.mark_failed(error);
    }
}

// ============================================================================
// Translation records
// ============================================================================

/// A translated PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateAsset {
    pub paper_id: String,
    pub input_pdf_path: PathBuf,
    /// The translated (mono-lingual) output this record owns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_mono_path: Option<PathBuf>,
    /// Side-by-side output, kept only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dual_path: Option<PathBuf>,
    #[serde(default)]
    pub status: AssetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslateAsset {
    pub fn new(paper_id: impl Into<String>, input_pdf_path: PathBuf) -> Self {
        Self {
            paper_id: paper_id.into(),
            input_pdf_path,
            output_mono_path: None,
            output_dual_path: None,
            status: AssetStatus::NotReady,
            service: None,
            threads: None,
            size_bytes: None,
            sha256: None,
            translated_at: None,
            failed_at: None,
            updated_at: Utc::now(),
            error: None,
        }
    }

    pub fn mark_in_progress(&mut self, input_pdf_path: PathBuf, service: &str, threads: u32) {
        self.status = AssetStatus::InProgress;
        self.input_pdf_path = input_pdf_path;
        self.service = Some(service.to_string());
        self.threads = Some(threads);
        self.error = None;
    }

    pub fn mark_ready(
        &mut self,
        mono_path: PathBuf,
        dual_path: Option<PathBuf>,
        size_bytes: u64,
        sha256: String,
    ) {
        self.status = AssetStatus::Ready;
        self.output_mono_path = Some(mono_path);
        self.output_dual_path = dual_path;
        self.size_bytes = Some(size_bytes);
        self.sha256 = Some(sha256);
        self.translated_at = Some(Utc::now());
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = AssetStatus::Failed;
        self.failed_at = Some(Utc::now());
        self.error = Some(error.into());
    }
}

impl Asset for TranslateAsset {
    const CLASS: AssetClass = AssetClass::Translate;

    fn paper_id(&self) -> &str {
        &self.paper_id
    }

    fn status(&self) -> AssetStatus {
        self.status
    }

    fn artifact_path(&self) -> Option<&Path> {
        self.output_mono_path.as_deref()
    }

    fn ready_at(&self) -> Option<DateTime<Utc>> {
        self.translated_at
    }

    fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn fail(&mut self, error: &str) {
        self.mark_failed(error);
    }
}
