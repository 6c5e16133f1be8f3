pub mod cache;
pub mod config;
pub mod digest;
pub mod events;
pub mod fetch;
pub mod layout;
pub mod lock;
pub mod metrics;
pub mod orchestrator;
pub mod session;
pub mod task;
pub mod testing;
pub mod translator;

pub use cache::{
    Asset, AssetClass, AssetIndex, AssetStatus, PdfAsset, PdfIndex, TranslateAsset,
    TranslateIndex,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ServerConfig,
    StorageConfig,
};
pub use events::{EventBus, EventBusConfig, Polled, Subscription, TaskEvent, TaskEventType};
pub use fetch::{FetchError, FetchOutcome, Fetcher, FetcherConfig, HttpFetcher};
pub use layout::StorageLayout;
pub use lock::{LockConfig, LockError, LockGuard, ResourceLock};
pub use orchestrator::{
    AssetList, EnqueueRequest, ErrorCode, OrchestratorConfig, OrchestratorDeps,
    OrchestratorError, OrchestratorStatus, PaperCacheStatus, TaskOrchestrator, TranslateOptions,
};
pub use session::{Paper, PaperRef, ResolveError, ResolvedPaper, SessionConfig, SessionStore};
pub use task::{Task, TaskError, TaskKind, TaskStatus, TaskTable};
pub use translator::{
    Pdf2zhTranslator, TranslateError, TranslateJob, TranslateOutput, Translator,
    TranslatorConfig,
};
