use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
    service: &'static str,
    record_store: &'static str,
}

/// GET /health
///
/// Liveness only. The scoring API and the database are not probed.
pub async fn health_handler(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        service: env!("CARGO_PKG_NAME"),
        record_store: state.config.record_store.as_str(),
    })
}
