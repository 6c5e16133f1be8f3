use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{assets, handlers, middleware::metrics_middleware, papers, sessions, tasks};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and status
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        // Sessions
        .route("/sessions/{id}/papers", put(sessions::set_papers))
        .route("/sessions/{id}/papers", get(sessions::get_papers))
        .route("/sessions/{id}/events", get(sessions::session_events))
        .route("/sessions/{id}/tasks", get(tasks::list_session_tasks))
        // Tasks
        .route("/tasks", post(tasks::create_task))
        .route("/tasks/{id}", get(tasks::get_task))
        .route("/tasks/{id}", delete(tasks::delete_task))
        // Papers and cache assets
        .route("/papers/status", get(papers::paper_status))
        .route("/assets/{class}", get(assets::list_assets))
        .route("/assets/{class}/{paper_id}", delete(assets::delete_asset));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
