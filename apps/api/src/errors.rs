use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::builder::BuildError;
use crate::analysis_client::AnalysisClientError;
use crate::navigator::session::SessionError;
use crate::navigator::NavError;
use crate::store::StoreError;

/// Service-level error. Boundary errors convert in with `?`; each maps to a
/// status and a stable `code` in the `{error: {code, message}}` body.
///
/// A missing history record is not an error: it renders the not-found view.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Navigation(#[from] NavError),

    #[error("Malformed analysis payload: {0}")]
    Build(#[from] BuildError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisClientError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Session(e) => (StatusCode::CONFLICT, "SUBMISSION_IN_FLIGHT", e.to_string()),
            AppError::Navigation(e) => (StatusCode::CONFLICT, "NAVIGATION_ERROR", e.to_string()),
            AppError::Build(e) => {
                tracing::warn!("Unusable analysis payload: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_PAYLOAD",
                    "The analysis service returned no result. Please try again.".to_string(),
                )
            }
            AppError::Analysis(e) => {
                tracing::error!("Analysis service error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_ERROR",
                    "Error analyzing resume. Please try again.".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Analysis history is unavailable right now".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
