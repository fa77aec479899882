pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analyzer::handlers as analyzer;
use crate::history::handlers as history;
use crate::navigator::handlers as navigator;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Live analysis (/analyze)
        .route(
            "/api/v1/analyze/single",
            post(analyzer::handle_analyze_single).layer(upload_limit.clone()),
        )
        .route(
            "/api/v1/analyze/bulk",
            post(analyzer::handle_analyze_bulk).layer(upload_limit),
        )
        // History (/history, /history/{id})
        .route("/api/v1/history", get(history::handle_list_history))
        .route("/api/v1/history/:id", get(history::handle_history_detail))
        // Navigator
        .route(
            "/api/v1/session",
            get(navigator::handle_current_view).delete(navigator::handle_teardown),
        )
        .route("/api/v1/session/back", post(navigator::handle_back))
        .route(
            "/api/v1/session/entries/:index",
            post(navigator::handle_select_entry),
        )
        .with_state(state)
}
