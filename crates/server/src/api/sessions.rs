//! Session API handlers: result sets and the task event stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use arxivist_core::{session::normalize_session_id, Paper, Polled};

use crate::metrics::{SSE_CONNECTIONS_ACTIVE, SSE_CONNECTIONS_TOTAL, SSE_EVENTS_SENT};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for replacing a session's result set
#[derive(Debug, Deserialize)]
pub struct SetPapersBody {
    pub papers: Vec<Paper>,
}

/// Response for result set operations
#[derive(Debug, Serialize)]
pub struct PapersResponse {
    pub session_id: String,
    pub count: usize,
    pub papers: Vec<Paper>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Replace the session's result set (e.g. after a search).
///
/// The set is truncated to the configured maximum.
pub async fn set_papers(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<SetPapersBody>,
) -> Json<PapersResponse> {
    let session_id = normalize_session_id(&session_id).to_string();
    let sessions = state.orchestrator().sessions();
    let count = sessions.set_last_papers(&session_id, body.papers);
    Json(PapersResponse {
        papers: sessions.last_papers(&session_id),
        session_id,
        count,
    })
}

/// The session's live result set.
pub async fn get_papers(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<PapersResponse> {
    let session_id = normalize_session_id(&session_id).to_string();
    let papers = state.orchestrator().sessions().last_papers(&session_id);
    Json(PapersResponse {
        session_id,
        count: papers.len(),
        papers,
    })
}

/// Counts an open event stream for as long as it lives.
struct SseConnection;

impl SseConnection {
    fn open() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        SSE_CONNECTIONS_TOTAL.inc();
        Self
    }
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// Relay the session's task events as server-sent events.
///
/// Each event's data is the JSON task event. A stream that stays idle for
/// `events.keepalive_secs` gets a `keep-alive` comment.
pub async fn session_events(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let orchestrator = state.orchestrator();
    let subscription = orchestrator.subscribe(&session_id);
    tracing::debug!(
        session_id = %subscription.channel(),
        subscriber = subscription.id(),
        subscribers = orchestrator.events().subscriber_count(subscription.channel()),
        "Event stream opened"
    );

    let keepalive = state.config().events.keepalive();
    let events = stream::unfold(
        (subscription, SseConnection::open()),
        move |(mut subscription, connection)| async move {
            let event = match subscription.recv_timeout(keepalive).await {
                Polled::Event(payload) => {
                    SSE_EVENTS_SENT.inc();
                    SseEvent::default().data(payload)
                }
                Polled::KeepAlive => SseEvent::default().comment("keep-alive"),
                Polled::Closed => return None,
            };
            Some((Ok::<_, Infallible>(event), (subscription, connection)))
        },
    );

    Sse::new(events)
}
