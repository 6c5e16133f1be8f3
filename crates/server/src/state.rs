use std::sync::Arc;

use arxivist_core::{
    Config, EventBus, Fetcher, OrchestratorConfig, OrchestratorDeps, PdfIndex, ResourceLock,
    SessionStore, StorageLayout, TaskOrchestrator, TaskTable, TranslateIndex, Translator,
};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: TaskOrchestrator,
}

impl AppState {
    pub fn new(config: Config, orchestrator: TaskOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Wire the orchestrator and its stores from configuration.
    ///
    /// Cache indices are loaded from the data directory; tasks and sessions
    /// start empty.
    pub fn from_config(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let layout = StorageLayout::from_config(&config.storage);
        let deps = OrchestratorDeps {
            locks: ResourceLock::new(layout.lock_dir(), config.locks.clone()),
            pdf_index: Arc::new(PdfIndex::open(layout.pdf_index_path())),
            translate_index: Arc::new(TranslateIndex::open(layout.translate_index_path())),
            tasks: Arc::new(TaskTable::new()),
            sessions: Arc::new(SessionStore::new(config.sessions.clone())),
            events: EventBus::new(config.events.inbox_capacity),
            fetcher,
            translator,
            layout,
        };
        let orchestrator = TaskOrchestrator::new(
            deps,
            OrchestratorConfig::from_translator(&config.translate),
        );
        Self::new(config, orchestrator)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }
}
