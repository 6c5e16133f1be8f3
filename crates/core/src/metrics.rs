//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task lifecycle (creation path, terminal status, duration)
//! - Collaborators (fetch and translate invocations)
//! - Coordination primitives (lock waits, stale reclaims)
//! - Event delivery and cache index persistence

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Task Metrics
// =============================================================================

/// Tasks created, split by kind and by fast/slow path.
pub static TASKS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("arxivist_tasks_created_total", "Total tasks created"),
        &["kind", "path"], // path: "fast", "slow"
    )
    .unwrap()
});

/// Tasks that reached a terminal state.
pub static TASKS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "arxivist_tasks_finished_total",
            "Total tasks that reached a terminal state",
        ),
        &["kind", "status"], // status: "succeeded", "failed"
    )
    .unwrap()
});

/// Wall time of slow-path workers.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "arxivist_task_duration_seconds",
            "Duration of background task execution",
        )
        .buckets(vec![
            0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Collaborator Metrics
// =============================================================================

/// Translator invocations by result.
pub static TRANSFORM_INVOCATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "arxivist_transform_invocations_total",
            "Total invocations of the external translator",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Fetcher invocations by result.
pub static FETCH_INVOCATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "arxivist_fetch_invocations_total",
            "Total invocations of the PDF fetcher",
        ),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Lock Metrics
// =============================================================================

/// Time spent waiting for a resource lock.
pub static LOCK_WAIT: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "arxivist_lock_wait_seconds",
            "Time spent waiting to acquire a resource lock",
        )
        .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0]),
    )
    .unwrap()
});

/// Stale lock markers reclaimed.
pub static LOCKS_RECLAIMED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arxivist_locks_reclaimed_total",
        "Total stale lock markers reclaimed",
    )
    .unwrap()
});

// =============================================================================
// Event Bus Metrics
// =============================================================================

/// Events delivered to a subscriber inbox.
pub static EVENTS_PUBLISHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arxivist_events_published_total",
        "Total events delivered to subscriber inboxes",
    )
    .unwrap()
});

/// Events dropped because a subscriber inbox was full.
pub static EVENTS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arxivist_events_dropped_total",
        "Total events dropped on full subscriber inboxes",
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics
// =============================================================================

/// Failed snapshot writes per cache index.
pub static CACHE_WRITE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "arxivist_cache_write_failures_total",
            "Total failed cache index snapshot writes",
        ),
        &["index"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Tasks
        Box::new(TASKS_CREATED.clone()),
        Box::new(TASKS_FINISHED.clone()),
        Box::new(TASK_DURATION.clone()),
        // Collaborators
        Box::new(TRANSFORM_INVOCATIONS.clone()),
        Box::new(FETCH_INVOCATIONS.clone()),
        // Locks
        Box::new(LOCK_WAIT.clone()),
        Box::new(LOCKS_RECLAIMED.clone()),
        // Events
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(EVENTS_DROPPED.clone()),
        // Cache
        Box::new(CACHE_WRITE_FAILURES.clone()),
    ]
}
