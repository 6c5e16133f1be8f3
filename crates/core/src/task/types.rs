//! Task record types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::AssetClass;

/// What a task produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Fetch the raw PDF.
    Download,
    /// Fetch if needed, then translate.
    #[default]
    Translate,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Download => "download",
            TaskKind::Translate => "translate",
        }
    }

    /// Asset class whose READY record satisfies this kind of task.
    pub fn asset_class(&self) -> AssetClass {
        match self {
            TaskKind::Download => AssetClass::Pdf,
            TaskKind::Translate => AssetClass::Translate,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(TaskKind::Download),
            "translate" => Ok(TaskKind::Translate),
            other => Err(format!("unknown task kind: {}", other)),
        }
    }
}

/// Task lifecycle.
///
/// ```text
/// PENDING -> RUNNING -> SUCCEEDED
///    |          \-----> FAILED
///    +----------------> SUCCEEDED   (cache hit)
///    +----------------> FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    /// Whether a task in this status may move to `next`.
    ///
    /// Staying in the same non-terminal status is allowed so progress can be
    /// reported without a state change.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Running)
                | (Pending, Succeeded)
                | (Pending, Failed)
                | (Running, Running)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of user-requested work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    /// Session that owns the task and receives its events.
    pub session_id: String,
    pub paper_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// Fraction complete, 0.0 to 1.0.
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_pdf_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_pdf_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Request parameters, as strings.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

/// Parameters for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub session_id: String,
    pub paper_id: String,
    pub kind: TaskKind,
    pub input_pdf_url: Option<String>,
    pub input_pdf_path: Option<PathBuf>,
    pub meta: BTreeMap<String, String>,
}

/// Partial update applied atomically by [`TaskTable::update`](super::TaskTable::update).
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub progress: Option<f64>,
    pub input_pdf_url: Option<String>,
    pub input_pdf_path: Option<PathBuf>,
    pub output_pdf_path: Option<PathBuf>,
    pub error: Option<String>,
    pub meta: BTreeMap<String, String>,
}

impl TaskUpdate {
    pub fn running(progress: f64) -> Self {
        Self {
            status: Some(TaskStatus::Running),
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn succeeded(output_pdf_path: PathBuf) -> Self {
        Self {
            status: Some(TaskStatus::Succeeded),
            progress: Some(1.0),
            output_pdf_path: Some(output_pdf_path),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_input_path(mut self, path: PathBuf) -> Self {
        self.input_pdf_path = Some(path);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}
