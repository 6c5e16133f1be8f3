//! Cache asset handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use arxivist_core::{AssetClass, AssetList, ErrorCode};

use super::error::{api_error, bad_request, from_orchestrator, ApiError};
use crate::state::AppState;

/// Query parameters for deleting an asset
#[derive(Debug, Deserialize)]
pub struct DeleteAssetParams {
    /// Also remove the asset's files.
    #[serde(default)]
    pub delete_files: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteAssetResponse {
    pub class: AssetClass,
    pub paper_id: String,
    pub deleted: bool,
    pub files_deleted: bool,
}

fn parse_class(class: &str) -> Result<AssetClass, ApiError> {
    class.parse().map_err(|e| bad_request(format!("{}", e)))
}

/// All records of one class (`pdf` or `translate`).
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    Path(class): Path<String>,
) -> Result<Json<AssetList>, ApiError> {
    let class = parse_class(&class)?;
    Ok(Json(state.orchestrator().list_assets(class)))
}

/// Delete one record. 409 while the asset is locked or in progress.
pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    Path((class, paper_id)): Path<(String, String)>,
    Query(params): Query<DeleteAssetParams>,
) -> Result<Json<DeleteAssetResponse>, ApiError> {
    let class = parse_class(&class)?;
    let deleted = state
        .orchestrator()
        .delete_asset(class, &paper_id, params.delete_files)
        .map_err(from_orchestrator)?;

    if !deleted {
        return Err(api_error(
            ErrorCode::NotFound,
            format!("no {} asset for {}", class, paper_id),
        ));
    }
    Ok(Json(DeleteAssetResponse {
        class,
        paper_id,
        deleted,
        files_deleted: params.delete_files,
    }))
}
