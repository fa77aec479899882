use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::analysis::model::AnalysisKind;
use crate::errors::AppError;
use crate::history::{load_detail, load_records};
use crate::state::AppState;
use crate::view::{render_session, ViewResponse};

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub kind: Option<AnalysisKind>,
}

#[derive(Deserialize)]
pub struct HistoryDetailQuery {
    pub session_id: Uuid,
    pub user_id: Uuid,
}

/// GET /api/v1/history
pub async fn handle_list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<ViewResponse>, AppError> {
    let loaded = load_records(state.store.as_ref(), params.user_id).await?;

    let response = state
        .sessions
        .with(params.session_id, |session| {
            session.load_list(loaded.records, params.kind);
            for notice in loaded.notices {
                session.notify(notice);
            }
            render_session(session)
        })
        .await;
    Ok(Json(response))
}

/// GET /api/v1/history/:id
///
/// A failed fetch keeps the current view and reports a notice; a missing or
/// foreign record lands in the not-found view.
pub async fn handle_history_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<HistoryDetailQuery>,
) -> Result<Json<ViewResponse>, AppError> {
    let (load, notices) = load_detail(state.store.as_ref(), params.user_id, id).await;

    let response = state
        .sessions
        .with(params.session_id, |session| {
            session.select(load);
            for notice in notices {
                session.notify(notice);
            }
            render_session(session)
        })
        .await;
    Ok(Json(response))
}
