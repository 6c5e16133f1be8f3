//! In-memory task registry.

mod table;
mod types;

pub use table::{TaskError, TaskTable};
pub use types::{NewTask, Task, TaskKind, TaskStatus, TaskUpdate};
