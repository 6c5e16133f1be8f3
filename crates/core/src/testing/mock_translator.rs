//! Mock translator for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::translator::{TranslateError, TranslateJob, TranslateOutput, Translator};

/// Mock implementation of the Translator trait.
///
/// Writes `<stem>-mono.pdf` and `<stem>-dual.pdf` into the job's output
/// directory, the way pdf2zh names its outputs.
///
/// # Example
///
/// ```rust,ignore
/// use arxivist_core::testing::MockTranslator;
///
/// let translator = MockTranslator::new();
/// translator.set_next_error(TranslateError::process_failed("boom", None)).await;
///
/// // ... run tasks ...
///
/// assert_eq!(translator.translate_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockTranslator {
    jobs: Arc<RwLock<Vec<TranslateJob>>>,
    next_error: Arc<RwLock<Option<TranslateError>>>,
    delay: Arc<RwLock<Duration>>,
    panic_next: AtomicBool,
    healthy: Arc<RwLock<bool>>,
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            panic_next: AtomicBool::new(false),
            healthy: Arc::new(RwLock::new(true)),
        }
    }

    /// Jobs submitted so far, including failed ones.
    pub async fn recorded_jobs(&self) -> Vec<TranslateJob> {
        self.jobs.read().await.clone()
    }

    pub async fn translate_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Configure the next translation to fail with the given error.
    pub async fn set_next_error(&self, error: TranslateError) {
        *self.next_error.write().await = Some(error);
    }

    /// Simulated translation time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Make the next translation panic.
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    /// Control the result of `validate`.
    pub async fn set_healthy(&self, healthy: bool) {
        *self.healthy.write().await = healthy;
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, job: TranslateJob) -> Result<TranslateOutput, TranslateError> {
        self.jobs.write().await.push(job.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("mock translator panic for {}", job.paper_id);
        }
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if !job.input_path.is_file() {
            return Err(TranslateError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let stem = job
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::create_dir_all(&job.output_dir).await?;
        let mono_path = job.output_dir.join(format!("{}-mono.pdf", stem));
        let dual_path = job.output_dir.join(format!("{}-dual.pdf", stem));
        let body = format!("%PDF-1.7\n% translated {} via {}\n", job.paper_id, job.service);
        tokio::fs::write(&mono_path, body.as_bytes()).await?;
        tokio::fs::write(&dual_path, body.as_bytes()).await?;

        Ok(TranslateOutput {
            mono_path,
            dual_path: Some(dual_path),
            duration_ms: delay.as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), TranslateError> {
        if *self.healthy.read().await {
            Ok(())
        } else {
            Err(TranslateError::process_failed("mock translator unhealthy", None))
        }
    }
}
