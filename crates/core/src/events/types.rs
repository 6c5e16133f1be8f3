//! Task lifecycle events.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskKind, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    TaskCreated,
    TaskStarted,
    TaskSucceeded,
    TaskFailed,
}

/// Event published on a session channel whenever a task changes state.
///
/// Serialized as `{"type": "task_created", "kind": "translate", "task": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(rename = "type")]
    pub event_type: TaskEventType,
    pub kind: TaskKind,
    pub task: Task,
}

impl TaskEvent {
    fn new(event_type: TaskEventType, task: Task) -> Self {
        Self {
            event_type,
            kind: task.kind,
            task,
        }
    }

    pub fn created(task: Task) -> Self {
        Self::new(TaskEventType::TaskCreated, task)
    }

    pub fn started(task: Task) -> Self {
        Self::new(TaskEventType::TaskStarted, task)
    }

    /// Event for a task that reached a terminal status.
    ///
    /// Returns `None` if the task is still pending or running.
    pub fn terminal(task: Task) -> Option<Self> {
        let event_type = match task.status {
            TaskStatus::Succeeded => TaskEventType::TaskSucceeded,
            TaskStatus::Failed => TaskEventType::TaskFailed,
            TaskStatus::Pending | TaskStatus::Running => return None,
        };
        Some(Self::new(event_type, task))
    }
}
