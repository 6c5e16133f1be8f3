//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the arxivist server:
//! - HTTP request metrics (latency, counts, in flight)
//! - SSE connection metrics
//! - Task, worker and cache gauges (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "arxivist_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("arxivist_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "arxivist_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// SSE Metrics
// =============================================================================

/// Open event streams.
pub static SSE_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "arxivist_sse_connections_active",
        "Number of open session event streams",
    )
    .unwrap()
});

/// Total event streams opened (cumulative).
pub static SSE_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arxivist_sse_connections_total",
        "Total session event streams since startup",
    )
    .unwrap()
});

/// Events written to event streams.
pub static SSE_EVENTS_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arxivist_sse_events_sent_total",
        "Task events written to session event streams",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Tasks by current status.
pub static TASKS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("arxivist_tasks_by_status", "Current task count by status"),
        &["status"],
    )
    .unwrap()
});

/// Background workers currently running.
pub static WORKERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "arxivist_workers_active",
        "Number of running background task workers",
    )
    .unwrap()
});

/// Records per cache index.
pub static CACHE_ASSETS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("arxivist_cache_assets", "Records in each cache index"),
        &["index"],
    )
    .unwrap()
});

/// Event subscribers across all sessions.
pub static EVENT_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "arxivist_event_subscribers",
        "Number of event bus subscribers",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // SSE
    registry
        .register(Box::new(SSE_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(SSE_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(SSE_EVENTS_SENT.clone())).unwrap();

    // Orchestrator
    registry
        .register(Box::new(TASKS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(WORKERS_ACTIVE.clone())).unwrap();
    registry.register(Box::new(CACHE_ASSETS.clone())).unwrap();
    registry
        .register(Box::new(EVENT_SUBSCRIBERS.clone()))
        .unwrap();

    // Core metrics (tasks, collaborators, locks, events, cache)
    for metric in arxivist_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the orchestrator right now.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status();

    WORKERS_ACTIVE.set(status.active_workers as i64);
    EVENT_SUBSCRIBERS.set(status.subscribers as i64);
    CACHE_ASSETS
        .with_label_values(&["pdf"])
        .set(status.pdf_assets as i64);
    CACHE_ASSETS
        .with_label_values(&["translate"])
        .set(status.translate_assets as i64);

    for task_status in ["PENDING", "RUNNING", "SUCCEEDED", "FAILED"] {
        let count = status.tasks.get(task_status).copied().unwrap_or(0);
        TASKS_BY_STATUS
            .with_label_values(&[task_status])
            .set(count as i64);
    }
}

static TASK_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-f]{32}").unwrap());
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static ARXIV_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}\.\d{4,5}(v\d+)?").unwrap());
static SESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"/sessions/[^/]+").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID.replace_all(path, "{id}");
    let result = TASK_ID.replace_all(&result, "{id}");
    let result = ARXIV_ID.replace_all(&result, "{paper_id}");
    let result = SESSION.replace_all(&result, "/sessions/{session}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_task_id() {
        let path = "/api/v1/tasks/0f8fad5bd9cb469fa16570867728950e";
        assert_eq!(normalize_path(path), "/api/v1/tasks/{id}");
    }

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/tasks/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/tasks/{id}");
    }

    #[test]
    fn test_normalize_path_arxiv_id() {
        let path = "/api/v1/assets/translate/2401.12345v2";
        assert_eq!(normalize_path(path), "/api/v1/assets/translate/{paper_id}");
    }

    #[test]
    fn test_normalize_path_session() {
        let path = "/api/v1/sessions/demo1/events";
        assert_eq!(normalize_path(path), "/api/v1/sessions/{session}/events");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("arxivist_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        // Prometheus only outputs vectors that have at least one child
        arxivist_core::metrics::TASKS_CREATED
            .with_label_values(&["translate", "fast"])
            .inc_by(0);
        SSE_CONNECTIONS_ACTIVE.set(0);
        WORKERS_ACTIVE.set(0);
        TASKS_BY_STATUS.with_label_values(&["PENDING"]).set(0);

        let output = encode_metrics();

        assert!(output.contains("arxivist_tasks_created_total"));
        assert!(output.contains("arxivist_locks_reclaimed_total"));
        assert!(output.contains("arxivist_sse_connections_active"));
        assert!(output.contains("arxivist_workers_active"));
        assert!(output.contains("arxivist_tasks_by_status"));
    }
}
