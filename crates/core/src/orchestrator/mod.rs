//! Task orchestrator for fetch and translate requests.
//!
//! The orchestrator turns a request into a task and drives it to a terminal
//! state:
//! - **Resolution**: the request's reference is resolved against session memory
//! - **Fast path**: a verified cached asset completes the task immediately
//! - **Slow path**: a background worker runs the class pipeline under a
//!   per-resource lock, updates the asset index, then the task
//!
//! Every state change is published on the owning session's event channel.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{OrchestratorDeps, TaskOrchestrator};
pub use types::{
    AssetList, EnqueueRequest, ErrorCode, OrchestratorError, OrchestratorStatus,
    PaperCacheStatus, TranslateOptions,
};
