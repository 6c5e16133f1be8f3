//! Testing utilities and mock implementations.
//!
//! The mocks stand in for the network fetcher and the external translator so
//! the orchestrator can be exercised end to end without either.
//!
//! # Example
//!
//! ```rust,ignore
//! use arxivist_core::testing::{fixtures, Harness};
//!
//! let dir = tempfile::tempdir()?;
//! let harness = Harness::new(dir.path());
//! harness.sessions.set_last_papers("s", fixtures::papers(3));
//!
//! let task = harness.orchestrator.enqueue(EnqueueRequest::translate("s").with_ref(2u64))?;
//! let done = harness.wait_for_terminal(&task.task_id).await;
//! ```

mod mock_fetcher;
mod mock_translator;

pub use mock_fetcher::{MockFetcher, RecordedFetch};
pub use mock_translator::MockTranslator;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{PdfIndex, TranslateIndex};
use crate::events::EventBus;
use crate::layout::StorageLayout;
use crate::lock::{LockConfig, ResourceLock};
use crate::orchestrator::{OrchestratorConfig, OrchestratorDeps, TaskOrchestrator};
use crate::session::{SessionConfig, SessionStore};
use crate::task::{Task, TaskTable};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::session::Paper;

    /// A paper with a reasonable id, title and PDF link.
    pub fn paper(id: &str, title: &str) -> Paper {
        Paper::new(id, title)
            .with_pdf_url(format!("https://arxiv.org/pdf/{}", id))
    }

    /// `n` distinct papers, ids `2401.0000<i>` with titles `Paper <i>`.
    pub fn papers(n: usize) -> Vec<Paper> {
        (1..=n)
            .map(|i| paper(&format!("2401.{:05}", i), &format!("Paper {}", i)))
            .collect()
    }
}

/// A fully wired orchestrator over mock collaborators, rooted at a directory.
pub struct Harness {
    pub layout: StorageLayout,
    pub fetcher: Arc<MockFetcher>,
    pub translator: Arc<MockTranslator>,
    pub tasks: Arc<TaskTable>,
    pub sessions: Arc<SessionStore>,
    pub pdf_index: Arc<PdfIndex>,
    pub translate_index: Arc<TranslateIndex>,
    pub orchestrator: TaskOrchestrator,
}

impl Harness {
    pub fn new(root: &Path) -> Self {
        Self::with_mocks(root, Arc::new(MockFetcher::new()), Arc::new(MockTranslator::new()))
    }

    /// Wire the orchestrator around caller-provided mocks.
    ///
    /// Reopening the same `root` with fresh mocks simulates a restart.
    pub fn with_mocks(
        root: &Path,
        fetcher: Arc<MockFetcher>,
        translator: Arc<MockTranslator>,
    ) -> Self {
        let layout = StorageLayout::new(root);
        let lock_config = LockConfig {
            poll_interval_ms: 10,
            ..LockConfig::default()
        };
        let tasks = Arc::new(TaskTable::new());
        let sessions = Arc::new(SessionStore::new(SessionConfig::default()));
        let pdf_index = Arc::new(PdfIndex::open(layout.pdf_index_path()));
        let translate_index = Arc::new(TranslateIndex::open(layout.translate_index_path()));

        let orchestrator = TaskOrchestrator::new(
            OrchestratorDeps {
                layout: layout.clone(),
                locks: ResourceLock::new(layout.lock_dir(), lock_config),
                pdf_index: pdf_index.clone(),
                translate_index: translate_index.clone(),
                tasks: tasks.clone(),
                sessions: sessions.clone(),
                events: EventBus::new(256),
                fetcher: fetcher.clone(),
                translator: translator.clone(),
            },
            OrchestratorConfig::default(),
        );

        Self {
            layout,
            fetcher,
            translator,
            tasks,
            sessions,
            pdf_index,
            translate_index,
            orchestrator,
        }
    }

    /// Poll until the task is SUCCEEDED or FAILED.
    ///
    /// # Panics
    ///
    /// Panics if the task is unknown or does not finish within ten seconds.
    pub async fn wait_for_terminal(&self, task_id: &str) -> Task {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let task = self
                .tasks
                .get(task_id)
                .unwrap_or_else(|| panic!("unknown task {}", task_id));
            if task.status.is_terminal() {
                return task;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("task {} still {} after 10s", task_id, task.status);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until no background worker is running.
    pub async fn wait_idle(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while self.orchestrator.status().active_workers > 0 {
            if tokio::time::Instant::now() >= deadline {
                panic!("workers still active after 10s");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
