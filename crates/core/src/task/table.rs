//! Task table implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use thiserror::Error;

use super::types::{NewTask, Task, TaskStatus, TaskUpdate};

/// Errors from task table operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("task {task_id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Registry of all tasks created during this process's lifetime.
///
/// Every operation takes one internal lock, so each update is applied and
/// observed atomically.
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: Mutex<HashMap<String, Task>>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Task>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new PENDING task with a fresh id.
    pub fn create(&self, new: NewTask) -> Task {
        let now = Utc::now();
        let task = Task {
            task_id: uuid::Uuid::new_v4().simple().to_string(),
            session_id: new.session_id,
            paper_id: new.paper_id,
            kind: new.kind,
            status: TaskStatus::Pending,
            progress: 0.0,
            created_at: now,
            updated_at: now,
            input_pdf_url: new.input_pdf_url,
            input_pdf_path: new.input_pdf_path,
            output_pdf_path: None,
            error: None,
            meta: new.meta,
        };
        self.lock().insert(task.task_id.clone(), task.clone());
        task
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.lock().get(task_id).cloned()
    }

    /// Apply `update` to a task and return the new snapshot.
    ///
    /// Fails if the task does not exist or the status change is not allowed.
    pub fn update(&self, task_id: &str, update: TaskUpdate) -> Result<Task, TaskError> {
        let mut tasks = self.lock();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;

        if let Some(next) = update.status {
            if !task.status.can_transition_to(next) {
                return Err(TaskError::InvalidTransition {
                    task_id: task_id.to_string(),
                    from: task.status,
                    to: next,
                });
            }
            task.status = next;
        } else if task.status.is_terminal() {
            return Err(TaskError::InvalidTransition {
                task_id: task_id.to_string(),
                from: task.status,
                to: task.status,
            });
        }

        if let Some(progress) = update.progress {
            task.progress = progress.clamp(0.0, 1.0);
        }
        if let Some(url) = update.input_pdf_url {
            task.input_pdf_url = Some(url);
        }
        if let Some(path) = update.input_pdf_path {
            task.input_pdf_path = Some(path);
        }
        if let Some(path) = update.output_pdf_path {
            task.output_pdf_path = Some(path);
        }
        if let Some(error) = update.error {
            task.error = Some(error);
        }
        task.meta.extend(update.meta);
        task.updated_at = Utc::now();

        Ok(task.clone())
    }

    /// Tasks of `session_id`, most recently updated first.
    pub fn list(&self, session_id: &str, limit: usize) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .lock()
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        tasks.truncate(limit);
        tasks
    }

    /// Drop a task from the table.
    pub fn remove(&self, task_id: &str) -> Option<Task> {
        self.lock().remove(task_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of tasks per status, keyed by the status name.
    pub fn count_by_status(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for task in self.lock().values() {
            *counts.entry(task.status.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }
}
