//! Axum route handlers for live analysis uploads.

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::analysis::model::AnalysisKind;
use crate::analysis_client::ResumeUpload;
use crate::analyzer::pipeline::{run_submission, Submission};
use crate::errors::AppError;
use crate::navigator::handlers::SessionQuery;
use crate::state::AppState;
use crate::view::ViewResponse;

/// POST /api/v1/analyze/single
///
/// Multipart fields: `file`, `job_description`, optional `title` and `user_id`.
pub async fn handle_analyze_single(
    State(state): State<AppState>,
    Query(params): Query<SessionQuery>,
    multipart: Multipart,
) -> Result<Json<ViewResponse>, AppError> {
    let submission = read_submission(multipart).await?;
    let view = run_submission(state, params.session_id, AnalysisKind::Single, submission).await?;
    Ok(Json(view))
}

/// POST /api/v1/analyze/bulk
///
/// Multipart fields: up to ten `files`, `job_description`, optional `title` and `user_id`.
pub async fn handle_analyze_bulk(
    State(state): State<AppState>,
    Query(params): Query<SessionQuery>,
    multipart: Multipart,
) -> Result<Json<ViewResponse>, AppError> {
    let submission = read_submission(multipart).await?;
    let view = run_submission(state, params.session_id, AnalysisKind::Bulk, submission).await?;
    Ok(Json(view))
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, AppError> {
    let mut submission = Submission {
        uploads: Vec::new(),
        job_description: String::new(),
        title: None,
        owner: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_form)?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue; // empty file input
                }
                submission.uploads.push(ResumeUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "job_description" => submission.job_description = field.text().await.map_err(bad_form)?,
            "title" => submission.title = Some(field.text().await.map_err(bad_form)?),
            "user_id" => {
                let raw = field.text().await.map_err(bad_form)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let owner = Uuid::parse_str(raw).map_err(|_| {
                        AppError::Validation("user_id must be a UUID".to_string())
                    })?;
                    submission.owner = Some(owner);
                }
            }
            other => debug!("Ignoring unknown form field '{other}'"),
        }
    }
    Ok(submission)
}

fn bad_form(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid upload form: {}", e.body_text()))
}
