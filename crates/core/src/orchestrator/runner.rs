//! Task orchestrator implementation.
//!
//! Requests are resolved and checked against the cache synchronously; misses
//! are handed to one background worker per task. Workers for the same paper
//! serialize on the per-class resource lock and re-check the cache once they
//! hold it, so concurrent requests never repeat finished work.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::cache::{
    Asset, AssetClass, AssetIndex, AssetStatus, PdfAsset, PdfIndex, TranslateAsset,
    TranslateIndex,
};
use crate::digest::file_digest;
use crate::events::{EventBus, Subscription, TaskEvent};
use crate::fetch::{normalize_pdf_url, Fetcher};
use crate::layout::{is_nonempty_file, StorageLayout};
use crate::lock::ResourceLock;
use crate::metrics;
use crate::session::{arxiv_pdf_url, normalize_session_id, PaperRef, SessionStore};
use crate::task::{NewTask, Task, TaskKind, TaskTable, TaskUpdate};
use crate::translator::{TranslateJob, TranslateOutput, Translator};

use super::config::OrchestratorConfig;
use super::types::{
    AssetList, EnqueueRequest, OrchestratorError, OrchestratorStatus, PaperCacheStatus,
};

/// Progress reported once the input PDF is available to a translate task.
const PROGRESS_INPUT_READY: f64 = 0.3;

/// Progress reported when a worker starts.
const PROGRESS_STARTED: f64 = 0.01;

/// Collaborators and shared state the orchestrator works with.
pub struct OrchestratorDeps {
    pub layout: StorageLayout,
    pub locks: ResourceLock,
    pub pdf_index: Arc<PdfIndex>,
    pub translate_index: Arc<TranslateIndex>,
    pub tasks: Arc<TaskTable>,
    pub sessions: Arc<SessionStore>,
    pub events: EventBus,
    pub fetcher: Arc<dyn Fetcher>,
    pub translator: Arc<dyn Translator>,
}

struct Inner {
    config: OrchestratorConfig,
    layout: StorageLayout,
    locks: ResourceLock,
    pdf_index: Arc<PdfIndex>,
    translate_index: Arc<TranslateIndex>,
    tasks: Arc<TaskTable>,
    sessions: Arc<SessionStore>,
    events: EventBus,
    fetcher: Arc<dyn Fetcher>,
    translator: Arc<dyn Translator>,
    active_workers: AtomicUsize,
}

/// Fully resolved work item handed to a worker.
#[derive(Debug, Clone)]
struct Job {
    paper_id: String,
    pdf_url: String,
    input_pdf_path: Option<PathBuf>,
    force: bool,
    service: String,
    threads: u32,
    keep_dual: bool,
    requested_at: DateTime<Utc>,
}

/// What a finished pipeline produced.
struct Produced {
    input_pdf_path: Option<PathBuf>,
    output_pdf_path: PathBuf,
}

/// Decrements the active worker count when dropped.
struct WorkerSlot<'a>(&'a AtomicUsize);

impl Drop for WorkerSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Coordinates fetch and translate tasks.
///
/// Cheaply cloneable; clones share all state.
#[derive(Clone)]
pub struct TaskOrchestrator {
    inner: Arc<Inner>,
}

impl TaskOrchestrator {
    pub fn new(deps: OrchestratorDeps, config: OrchestratorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                layout: deps.layout,
                locks: deps.locks,
                pdf_index: deps.pdf_index,
                translate_index: deps.translate_index,
                tasks: deps.tasks,
                sessions: deps.sessions,
                events: deps.events,
                fetcher: deps.fetcher,
                translator: deps.translator,
                active_workers: AtomicUsize::new(0),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.inner.layout
    }

    pub fn locks(&self) -> &ResourceLock {
        &self.inner.locks
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    // =========================================================================
    // Enqueue
    // =========================================================================

    /// Accept a request and return its task.
    ///
    /// A cache hit returns a task that has already SUCCEEDED. Otherwise the
    /// returned task is PENDING and a background worker owns it. Must be
    /// called from within a Tokio runtime.
    pub fn enqueue(&self, request: EnqueueRequest) -> Result<Task, OrchestratorError> {
        let session_id = normalize_session_id(&request.session_id).to_string();
        let job = self.resolve_job(&session_id, &request)?;

        self.inner.sessions.set_last_active(&session_id, &job.paper_id);

        let mut meta = BTreeMap::new();
        meta.insert("force".to_string(), job.force.to_string());
        meta.insert("service".to_string(), job.service.clone());
        meta.insert("threads".to_string(), job.threads.to_string());
        meta.insert("keep_dual".to_string(), job.keep_dual.to_string());

        let new_task = NewTask {
            session_id,
            paper_id: job.paper_id.clone(),
            kind: request.kind,
            input_pdf_url: Some(job.pdf_url.clone()),
            input_pdf_path: job.input_pdf_path.clone(),
            meta,
        };

        if !job.force {
            if let Some(produced) = self.cached_output(request.kind, &job.paper_id) {
                return self.complete_from_cache(new_task, produced);
            }
        }

        let task = self.inner.tasks.create(new_task);
        metrics::TASKS_CREATED
            .with_label_values(&[task.kind.as_str(), "slow"])
            .inc();
        info!(
            task_id = %task.task_id,
            paper_id = %task.paper_id,
            kind = %task.kind,
            force = job.force,
            "Task queued"
        );
        self.publish(TaskEvent::created(task.clone()));

        self.inner.active_workers.fetch_add(1, Ordering::SeqCst);
        let this = self.clone();
        let worker_task = task.clone();
        tokio::spawn(async move { this.run_worker(worker_task, job).await });

        Ok(task)
    }

    /// Work out which paper a request means and with which parameters.
    fn resolve_job(
        &self,
        session_id: &str,
        request: &EnqueueRequest,
    ) -> Result<Job, OrchestratorError> {
        let config = &self.inner.config;
        let service = request
            .options
            .service
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(config.default_service.as_str())
            .to_string();
        let threads = request.options.threads.unwrap_or(config.default_threads);
        if threads == 0 {
            return Err(OrchestratorError::invalid_request("threads must be at least 1"));
        }
        let keep_dual = request.options.keep_dual.unwrap_or(config.keep_dual);

        let explicit_id = request
            .paper_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let explicit_url = request
            .pdf_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let local_input = request
            .input_pdf_path
            .as_ref()
            .filter(|p| is_nonempty_file(p));
        if local_input.is_some() && request.kind == TaskKind::Download {
            return Err(OrchestratorError::invalid_request(
                "input_pdf_path only applies to translate tasks",
            ));
        }

        let (paper_id, pdf_url, input_pdf_path) = if let Some(path) = local_input {
            let paper_id = match explicit_id {
                Some(id) => id.to_string(),
                None => path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        OrchestratorError::invalid_request(
                            "cannot derive a paper id from input_pdf_path",
                        )
                    })?,
            };
            let pdf_url = explicit_url
                .map(str::to_string)
                .unwrap_or_else(|| arxiv_pdf_url(&paper_id));
            (paper_id, pdf_url, Some(path.clone()))
        } else if let Some(id) = explicit_id {
            let pdf_url = explicit_url
                .map(str::to_string)
                .unwrap_or_else(|| arxiv_pdf_url(id));
            (id.to_string(), pdf_url, None)
        } else {
            let resolved = self
                .inner
                .sessions
                .resolve(session_id, request.reference.as_ref())?;
            let pdf_url = explicit_url
                .map(str::to_string)
                .unwrap_or(resolved.pdf_url);
            (resolved.paper_id, pdf_url, None)
        };

        Ok(Job {
            paper_id,
            pdf_url,
            input_pdf_path,
            force: request.force,
            service,
            threads,
            keep_dual,
            requested_at: Utc::now(),
        })
    }

    /// Output of a verified READY asset that satisfies `kind`.
    fn cached_output(&self, kind: TaskKind, paper_id: &str) -> Option<Produced> {
        match kind {
            TaskKind::Download => self.inner.pdf_index.get_ready(paper_id).map(|a| Produced {
                input_pdf_path: None,
                output_pdf_path: a.local_path,
            }),
            TaskKind::Translate => {
                let asset = self.inner.translate_index.get_ready(paper_id)?;
                Some(Produced {
                    input_pdf_path: Some(asset.input_pdf_path),
                    output_pdf_path: asset.output_mono_path?,
                })
            }
        }
    }

    fn complete_from_cache(
        &self,
        new_task: NewTask,
        produced: Produced,
    ) -> Result<Task, OrchestratorError> {
        let task = self.inner.tasks.create(new_task);
        let mut update =
            TaskUpdate::succeeded(produced.output_pdf_path).with_meta("fast_path", "true");
        update.input_pdf_path = produced.input_pdf_path;
        let task = self.inner.tasks.update(&task.task_id, update)?;

        metrics::TASKS_CREATED
            .with_label_values(&[task.kind.as_str(), "fast"])
            .inc();
        metrics::TASKS_FINISHED
            .with_label_values(&[task.kind.as_str(), "succeeded"])
            .inc();
        info!(
            task_id = %task.task_id,
            paper_id = %task.paper_id,
            kind = %task.kind,
            "Task served from cache"
        );

        self.publish(TaskEvent::created(task.clone()));
        if let Some(event) = TaskEvent::terminal(task.clone()) {
            self.publish(event);
        }
        Ok(task)
    }

    fn publish(&self, event: TaskEvent) {
        let channel = event.task.session_id.clone();
        let delivered = self.inner.events.publish(&channel, &event);
        debug!(
            session_id = %channel,
            task_id = %event.task.task_id,
            event = ?event.event_type,
            delivered,
            "Task event published"
        );
    }

    // =========================================================================
    // Worker
    // =========================================================================

    async fn run_worker(self, task: Task, job: Job) {
        let _slot = WorkerSlot(&self.inner.active_workers);
        let started = Instant::now();
        let task_id = task.task_id.clone();
        let kind = task.kind;

        match self
            .inner
            .tasks
            .update(&task_id, TaskUpdate::running(PROGRESS_STARTED))
        {
            Ok(running) => self.publish(TaskEvent::started(running)),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Task vanished before start");
                return;
            }
        }

        // The pipeline runs as its own task so that a panic inside it still
        // ends with a FAILED task instead of one stuck in RUNNING.
        let pipeline = {
            let this = self.clone();
            let task_id = task_id.clone();
            tokio::spawn(async move {
                match kind {
                    TaskKind::Download => this.run_download(&job).await,
                    TaskKind::Translate => this.run_translate(&task_id, &job).await,
                }
            })
        };
        let result = match pipeline.await {
            Ok(result) => result,
            Err(e) => {
                let err = OrchestratorError::WorkerAborted(e.to_string());
                self.fail_abandoned(kind, &task.paper_id, &err.detail());
                Err(err)
            }
        };

        let (update, status) = match result {
            Ok(produced) => {
                let mut update = TaskUpdate::succeeded(produced.output_pdf_path);
                update.input_pdf_path = produced.input_pdf_path;
                (update, "succeeded")
            }
            Err(e) => {
                error!(
                    task_id = %task_id,
                    paper_id = %task.paper_id,
                    kind = %kind,
                    code = %e.code(),
                    error = %e,
                    "Task failed"
                );
                (TaskUpdate::failed(e.detail()), "failed")
            }
        };

        metrics::TASK_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(started.elapsed().as_secs_f64());
        metrics::TASKS_FINISHED
            .with_label_values(&[kind.as_str(), status])
            .inc();

        match self.inner.tasks.update(&task_id, update) {
            Ok(done) => {
                info!(
                    task_id = %task_id,
                    status = %done.status,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Task finished"
                );
                if let Some(event) = TaskEvent::terminal(done) {
                    self.publish(event);
                }
            }
            Err(e) => warn!(task_id = %task_id, error = %e, "Could not record task result"),
        }
    }

    /// Mark records a dead worker left IN_PROGRESS as FAILED.
    ///
    /// Done under the class lock, so a record another worker has claimed
    /// since is left alone.
    fn fail_abandoned(&self, kind: TaskKind, paper_id: &str, error: &str) {
        // Translate workers may also have died while fetching their input.
        let classes: &[AssetClass] = match kind.asset_class() {
            AssetClass::Pdf => &[AssetClass::Pdf],
            AssetClass::Translate => &[AssetClass::Pdf, AssetClass::Translate],
        };
        for &class in classes {
            let key = class.lock_key(paper_id);
            let _guard = match self.inner.locks.try_acquire(&key) {
                Ok(Some(guard)) => guard,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %key, error = %e, "Could not lock abandoned asset");
                    continue;
                }
            };
            let marked = match class {
                AssetClass::Pdf => {
                    mark_failed_if_in_progress(&self.inner.pdf_index, paper_id, error)
                }
                AssetClass::Translate => {
                    mark_failed_if_in_progress(&self.inner.translate_index, paper_id, error)
                }
            };
            if marked {
                warn!(class = %class, paper_id = %paper_id, "Marked abandoned asset FAILED");
            }
        }
    }

    async fn run_download(&self, job: &Job) -> Result<Produced, OrchestratorError> {
        let local_path = self.ensure_pdf(job).await?;
        Ok(Produced {
            input_pdf_path: None,
            output_pdf_path: local_path,
        })
    }

    async fn run_translate(&self, task_id: &str, job: &Job) -> Result<Produced, OrchestratorError> {
        let input = match &job.input_pdf_path {
            Some(path) => path.clone(),
            None => self.ensure_pdf(job).await?,
        };

        if let Err(e) = self.inner.tasks.update(
            task_id,
            TaskUpdate::progress(PROGRESS_INPUT_READY).with_input_path(input.clone()),
        ) {
            warn!(task_id = %task_id, error = %e, "Failed to report progress");
        }

        let mono = self.ensure_translation(job, &input).await?;
        Ok(Produced {
            input_pdf_path: Some(input),
            output_pdf_path: mono,
        })
    }

    /// Whether a READY record lets the worker skip its work.
    ///
    /// Unforced jobs accept any verified asset; forced jobs accept only one
    /// that became ready after they were requested (a concurrent forced job
    /// already redid the work).
    fn satisfies<A: Asset>(asset: &A, job: &Job) -> bool {
        !job.force || asset.ready_at().is_some_and(|at| at >= job.requested_at)
    }

    /// The failure a concurrent worker recorded after this job was requested.
    ///
    /// Jobs that waited on the lock while that worker ran adopt its outcome
    /// instead of invoking the collaborator again.
    fn failed_since_requested<A: Asset>(asset: &A, job: &Job) -> Option<String> {
        let failed_after = asset.status() == AssetStatus::Failed
            && asset.failed_at().is_some_and(|at| at >= job.requested_at);
        failed_after.then(|| asset.error().unwrap_or("failed").to_string())
    }

    /// Make sure the raw PDF for the job's paper is on disk and indexed READY.
    async fn ensure_pdf(&self, job: &Job) -> Result<PathBuf, OrchestratorError> {
        let inner = &self.inner;
        let paper_id = job.paper_id.as_str();
        let local_path = inner.layout.raw_pdf_path(paper_id);
        let url = normalize_pdf_url(&job.pdf_url);

        let _guard = inner
            .locks
            .acquire(&AssetClass::Pdf.lock_key(paper_id))
            .await?;

        if let Some(asset) = inner.pdf_index.get_ready(paper_id) {
            if Self::satisfies(&asset, job) {
                debug!(paper_id = %paper_id, "PDF already cached");
                return Ok(asset.local_path);
            }
        }
        if let Some(error) = inner
            .pdf_index
            .get(paper_id)
            .and_then(|a| Self::failed_since_requested(&a, job))
        {
            debug!(paper_id = %paper_id, "PDF fetch already failed for this request");
            return Err(OrchestratorError::AlreadyFailed {
                class: AssetClass::Pdf,
                error,
            });
        }

        let new_record = || PdfAsset::new(paper_id, url.clone(), local_path.clone());

        if !job.force && is_nonempty_file(&local_path) {
            let (size, sha256) = file_digest(&local_path).await?;
            inner.pdf_index.upsert_with(paper_id, new_record, |a| {
                a.pdf_url = url.clone();
                a.local_path = local_path.clone();
                a.mark_ready(size, sha256);
            });
            info!(paper_id = %paper_id, path = %local_path.display(), "Indexed PDF found on disk");
            return Ok(local_path);
        }

        inner.pdf_index.upsert_with(paper_id, new_record, |a| {
            a.pdf_url = url.clone();
            a.local_path = local_path.clone();
            a.mark_in_progress();
        });

        match inner.fetcher.fetch(&url, &local_path).await {
            Ok(outcome) => {
                metrics::FETCH_INVOCATIONS.with_label_values(&["success"]).inc();
                inner.pdf_index.update(paper_id, |a| {
                    a.mark_ready(outcome.size_bytes, outcome.sha256.clone())
                });
                Ok(local_path)
            }
            Err(e) => {
                metrics::FETCH_INVOCATIONS.with_label_values(&["failure"]).inc();
                let err = OrchestratorError::from(e);
                inner.pdf_index.update(paper_id, |a| a.mark_failed(err.detail()));
                Err(err)
            }
        }
    }

    /// Make sure the translation of `input` is on disk and indexed READY.
    async fn ensure_translation(&self, job: &Job, input: &Path) -> Result<PathBuf, OrchestratorError> {
        let inner = &self.inner;
        let paper_id = job.paper_id.as_str();
        let mono_path = inner.layout.mono_pdf_path(paper_id);

        let _guard = inner
            .locks
            .acquire(&AssetClass::Translate.lock_key(paper_id))
            .await?;

        if let Some(asset) = inner.translate_index.get_ready(paper_id) {
            if Self::satisfies(&asset, job) {
                if let Some(mono) = asset.output_mono_path {
                    debug!(paper_id = %paper_id, "Translation already cached");
                    return Ok(mono);
                }
            }
        }
        if let Some(error) = inner
            .translate_index
            .get(paper_id)
            .and_then(|a| Self::failed_since_requested(&a, job))
        {
            debug!(paper_id = %paper_id, "Translation already failed for this request");
            return Err(OrchestratorError::AlreadyFailed {
                class: AssetClass::Translate,
                error,
            });
        }

        let new_record = || TranslateAsset::new(paper_id, input.to_path_buf());

        if !job.force && is_nonempty_file(&mono_path) {
            let (size, sha256) = file_digest(&mono_path).await?;
            let dual = Some(inner.layout.dual_pdf_path(paper_id))
                .filter(|p| job.keep_dual && is_nonempty_file(p));
            inner.translate_index.upsert_with(paper_id, new_record, |a| {
                a.mark_in_progress(input.to_path_buf(), &job.service, job.threads);
                a.mark_ready(mono_path.clone(), dual, size, sha256);
            });
            info!(paper_id = %paper_id, path = %mono_path.display(), "Indexed translation found on disk");
            return Ok(mono_path);
        }

        inner.translate_index.upsert_with(paper_id, new_record, |a| {
            a.mark_in_progress(input.to_path_buf(), &job.service, job.threads);
        });

        let translate_job = TranslateJob {
            paper_id: paper_id.to_string(),
            input_path: input.to_path_buf(),
            output_dir: inner.layout.translated_dir(),
            log_path: inner.layout.translate_log_path(paper_id),
            service: job.service.clone(),
            threads: job.threads,
        };
        info!(
            paper_id = %paper_id,
            translator = %inner.translator.name(),
            service = %job.service,
            threads = job.threads,
            "Translating"
        );

        let result = match inner.translator.translate(translate_job).await {
            Ok(output) => {
                metrics::TRANSFORM_INVOCATIONS.with_label_values(&["success"]).inc();
                self.finish_translation(paper_id, output, job.keep_dual).await
            }
            Err(e) => {
                metrics::TRANSFORM_INVOCATIONS.with_label_values(&["failure"]).inc();
                Err(OrchestratorError::from(e))
            }
        };

        match result {
            Ok((dual, size, sha256)) => {
                inner.translate_index.update(paper_id, |a| {
                    a.mark_ready(mono_path.clone(), dual, size, sha256)
                });
                Ok(mono_path)
            }
            Err(err) => {
                inner
                    .translate_index
                    .update(paper_id, |a| a.mark_failed(err.detail()));
                Err(err)
            }
        }
    }

    /// Move the tool's outputs to their canonical names and hash the result.
    async fn finish_translation(
        &self,
        paper_id: &str,
        output: TranslateOutput,
        keep_dual: bool,
    ) -> Result<(Option<PathBuf>, u64, String), OrchestratorError> {
        let layout = &self.inner.layout;
        let mono_path = layout.mono_pdf_path(paper_id);
        if output.mono_path != mono_path {
            replace_file(&output.mono_path, &mono_path).await?;
        }

        let dual = match output.dual_path {
            Some(dual) if keep_dual => {
                let target = layout.dual_pdf_path(paper_id);
                if dual != target {
                    replace_file(&dual, &target).await?;
                }
                Some(target)
            }
            Some(dual) => {
                if let Err(e) = tokio::fs::remove_file(&dual).await {
                    warn!(path = %dual.display(), error = %e, "Failed to remove dual output");
                }
                None
            }
            None => None,
        };

        let (size, sha256) = file_digest(&mono_path).await?;
        if size == 0 {
            return Err(OrchestratorError::Translate(
                crate::translator::TranslateError::OutputMissing {
                    expected: mono_path,
                },
            ));
        }
        Ok((dual, size, sha256))
    }

    // =========================================================================
    // Queries and maintenance
    // =========================================================================

    /// Cache state of a paper, identified by id or by session reference.
    ///
    /// Counts as using the paper: the session's last-active pointer moves to it.
    pub fn paper_status(
        &self,
        session_id: &str,
        reference: Option<&PaperRef>,
        paper_id: Option<&str>,
    ) -> Result<PaperCacheStatus, OrchestratorError> {
        let session_id = normalize_session_id(session_id);
        let paper_id = match paper_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => self.inner.sessions.resolve(session_id, reference)?.paper_id,
        };
        self.inner.sessions.set_last_active(session_id, &paper_id);

        let pdf = self.inner.pdf_index.get(&paper_id);
        let translate = self.inner.translate_index.get(&paper_id);
        Ok(PaperCacheStatus {
            pdf_ready: pdf.as_ref().is_some_and(Asset::is_verified_ready),
            translated_ready: translate.as_ref().is_some_and(Asset::is_verified_ready),
            paper_id,
            pdf,
            translate,
        })
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task, OrchestratorError> {
        self.inner
            .tasks
            .get(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))
    }

    /// Tasks of a session, most recently updated first.
    pub fn list_tasks(&self, session_id: &str, limit: usize) -> Vec<Task> {
        self.inner
            .tasks
            .list(normalize_session_id(session_id), limit)
    }

    /// Forget a finished task.
    pub fn remove_task(&self, task_id: &str) -> Result<Task, OrchestratorError> {
        let task = self.get_task(task_id)?;
        if !task.status.is_terminal() {
            return Err(OrchestratorError::Busy(format!(
                "task {} is still {}",
                task_id, task.status
            )));
        }
        self.inner
            .tasks
            .remove(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))
    }

    pub fn list_assets(&self, class: AssetClass) -> AssetList {
        match class {
            AssetClass::Pdf => AssetList::Pdf(self.inner.pdf_index.list()),
            AssetClass::Translate => AssetList::Translate(self.inner.translate_index.list()),
        }
    }

    /// Remove an asset record, optionally with its files.
    ///
    /// Refused while the class lock is held, i.e. while the asset is being
    /// produced. Returns whether a record existed.
    pub fn delete_asset(
        &self,
        class: AssetClass,
        paper_id: &str,
        delete_files: bool,
    ) -> Result<bool, OrchestratorError> {
        let key = class.lock_key(paper_id);
        let Some(_guard) = self.inner.locks.try_acquire(&key)? else {
            return Err(OrchestratorError::Busy(format!("{} is locked", key)));
        };

        let (status, files) = match class {
            AssetClass::Pdf => match self.inner.pdf_index.get(paper_id) {
                Some(a) => (a.status, vec![a.local_path]),
                None => return Ok(false),
            },
            AssetClass::Translate => match self.inner.translate_index.get(paper_id) {
                Some(a) => (
                    a.status,
                    a.output_mono_path.into_iter().chain(a.output_dual_path).collect(),
                ),
                None => return Ok(false),
            },
        };
        // Holding the class lock means no worker is producing this asset.
        if status == AssetStatus::InProgress {
            warn!(key = %key, "Deleting IN_PROGRESS record left by an interrupted run");
        }

        if delete_files {
            for file in &files {
                match std::fs::remove_file(file) {
                    Ok(()) => debug!(path = %file.display(), "Removed asset file"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(OrchestratorError::Io(e)),
                }
            }
        }

        let existed = match class {
            AssetClass::Pdf => self.inner.pdf_index.delete(paper_id),
            AssetClass::Translate => self.inner.translate_index.delete(paper_id),
        };
        info!(class = %class, paper_id = %paper_id, delete_files, "Asset record deleted");
        Ok(existed)
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            active_workers: self.inner.active_workers.load(Ordering::SeqCst),
            tasks: self.inner.tasks.count_by_status(),
            pdf_assets: self.inner.pdf_index.len(),
            translate_assets: self.inner.translate_index.len(),
            subscribers: self.inner.events.total_subscribers(),
            sessions: self.inner.sessions.session_count(),
        }
    }

    /// Subscribe to a session's task events.
    pub fn subscribe(&self, session_id: &str) -> Subscription {
        self.inner
            .events
            .subscription(normalize_session_id(session_id))
    }
}

fn mark_failed_if_in_progress<A: Asset>(
    index: &AssetIndex<A>,
    paper_id: &str,
    error: &str,
) -> bool {
    if !index
        .get(paper_id)
        .is_some_and(|a| a.status() == AssetStatus::InProgress)
    {
        return false;
    }
    index.update(paper_id, |a| a.fail(error)).is_some()
}

/// Rename `from` over `to`, removing an existing target first.
async fn replace_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(to).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::rename(from, to).await
}
