use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::view::{render_session, ViewResponse};

#[derive(Deserialize)]
pub struct SessionQuery {
    pub session_id: Uuid,
}

/// GET /api/v1/session
///
/// An unknown session renders the initial view without being registered.
pub async fn handle_current_view(
    State(state): State<AppState>,
    Query(params): Query<SessionQuery>,
) -> Json<ViewResponse> {
    Json(state.sessions.peek(params.session_id, render_session).await)
}

/// POST /api/v1/session/back
pub async fn handle_back(
    State(state): State<AppState>,
    Query(params): Query<SessionQuery>,
) -> Json<ViewResponse> {
    let response = state
        .sessions
        .peek(params.session_id, |session| {
            session.back();
            render_session(session)
        })
        .await;
    Json(response)
}

/// POST /api/v1/session/entries/:index
pub async fn handle_select_entry(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Query(params): Query<SessionQuery>,
) -> Result<Json<ViewResponse>, AppError> {
    let response = state
        .sessions
        .peek(params.session_id, |session| {
            session.select_entry(index)?;
            Ok::<_, AppError>(render_session(session))
        })
        .await?;
    Ok(Json(response))
}

/// DELETE /api/v1/session
pub async fn handle_teardown(
    State(state): State<AppState>,
    Query(params): Query<SessionQuery>,
) -> StatusCode {
    state.sessions.teardown(params.session_id).await;
    StatusCode::NO_CONTENT
}
