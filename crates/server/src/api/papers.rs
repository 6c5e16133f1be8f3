//! Paper cache status handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use arxivist_core::{PaperCacheStatus, PaperRef};

use super::error::{from_orchestrator, ApiError};
use crate::state::AppState;

/// Query parameters for the status lookup
#[derive(Debug, Deserialize)]
pub struct PaperStatusParams {
    #[serde(default)]
    pub session_id: String,
    /// Position, ordinal, id or title fragment in the session's result set.
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub paper_id: Option<String>,
}

/// Cache state of a paper.
///
/// With neither `ref` nor `paper_id`, reports on the session's last-used paper.
pub async fn paper_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaperStatusParams>,
) -> Result<Json<PaperCacheStatus>, ApiError> {
    let reference = params
        .reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(PaperRef::from);

    state
        .orchestrator()
        .paper_status(
            &params.session_id,
            reference.as_ref(),
            params.paper_id.as_deref(),
        )
        .map(Json)
        .map_err(from_orchestrator)
}
