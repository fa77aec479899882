//! Submission pipeline: validate → latch → score → normalize → persist → apply.
//!
//! The work runs on its own task so a dropped HTTP request cannot strand the
//! form latch; the result is still saved, and shown only if its request is
//! still the session's current one.

use anyhow::anyhow;
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::builder::{
    build_document, build_record_summary, normalize_bulk, normalize_single, resolve_title,
};
use crate::analysis::model::{Analysis, AnalysisKind, AnalysisRecord};
use crate::analysis_client::{ResumeUpload, ACCEPTED_EXTENSIONS, MAX_BULK_FILES};
use crate::errors::AppError;
use crate::navigator::session::{SubmissionOutcome, SubmissionTicket};
use crate::state::AppState;
use crate::store::{RecordStore, StoredDocument};
use crate::view::{render_session, ViewResponse};

const NOT_SAVED_NOTICE: &str = "The analysis is shown but could not be saved to your history.";

/// Resumes plus the job description they are scored against.
#[derive(Debug, Clone)]
pub struct Submission {
    pub uploads: Vec<ResumeUpload>,
    pub job_description: String,
    pub title: Option<String>,
    /// Absent for anonymous runs; those are shown but not persisted.
    pub owner: Option<Uuid>,
}

pub fn validate(kind: AnalysisKind, submission: &Submission) -> Result<(), AppError> {
    if submission.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    match (kind, submission.uploads.len()) {
        (_, 0) => return Err(AppError::Validation("a resume file is required".to_string())),
        (AnalysisKind::Single, n) if n > 1 => {
            return Err(AppError::Validation(
                "single analysis takes exactly one file".to_string(),
            ))
        }
        (AnalysisKind::Bulk, n) if n > MAX_BULK_FILES => {
            return Err(AppError::Validation(format!(
                "bulk analysis takes at most {MAX_BULK_FILES} files, got {n}"
            )))
        }
        _ => {}
    }

    if let Some(bad) = submission
        .uploads
        .iter()
        .find(|u| !u.has_accepted_extension())
    {
        return Err(AppError::Validation(format!(
            "'{}' is not a supported file type (expected one of: {})",
            bad.file_name,
            ACCEPTED_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

/// Runs a submission for a session and returns the session's resulting view.
pub async fn run_submission(
    state: AppState,
    session_id: Uuid,
    kind: AnalysisKind,
    submission: Submission,
) -> Result<ViewResponse, AppError> {
    validate(kind, &submission)?;

    let ticket = state
        .sessions
        .with(session_id, |session| session.begin_submission(kind))
        .await?;

    let task = tokio::spawn(async move {
        let result = analyze(&state, kind, submission).await;
        finish(&state, session_id, ticket, result).await
    });

    task.await
        .map_err(|e| AppError::Internal(anyhow!("submission task failed: {e}")))?
}

async fn analyze(
    state: &AppState,
    kind: AnalysisKind,
    submission: Submission,
) -> Result<SubmissionOutcome, AppError> {
    let Submission {
        uploads,
        job_description,
        title,
        owner,
    } = submission;
    let mut notices = Vec::new();

    let analysis = match kind {
        AnalysisKind::Single => {
            let upload = uploads
                .into_iter()
                .next()
                .ok_or_else(|| AppError::Validation("a resume file is required".to_string()))?;
            let raw = state
                .analysis
                .submit_single(upload, &job_description)
                .await?;
            Analysis::Single(normalize_single(&raw)?)
        }
        AnalysisKind::Bulk => {
            let raw = state.analysis.submit_bulk(uploads, &job_description).await?;
            let normalized = normalize_bulk(&raw)?;
            for w in &normalized.warnings {
                warn!("Bulk analysis: {w}");
                notices.push(w.to_string());
            }
            Analysis::Bulk(normalized.value)
        }
    };

    let title = resolve_title(kind, title.as_deref());
    let saved = match owner {
        Some(owner) => {
            let saved = persist(state.store.as_ref(), owner, title, &analysis).await;
            if saved.is_none() {
                notices.push(NOT_SAVED_NOTICE.to_string());
            }
            saved
        }
        None => None,
    };

    Ok(SubmissionOutcome {
        analysis,
        saved,
        notices,
    })
}

/// Saves the record. `None` means the write was not acknowledged and the
/// record must not be treated as part of history.
pub async fn persist(
    store: &dyn RecordStore,
    owner: Uuid,
    title: String,
    analysis: &Analysis,
) -> Option<AnalysisRecord> {
    let record = AnalysisRecord::new(
        Uuid::new_v4(),
        title,
        Utc::now(),
        build_record_summary(analysis),
    );
    let document = StoredDocument {
        id: record.id,
        body: build_document(owner, &record, analysis),
    };

    match store.save(owner, document).await {
        Ok(()) => Some(record),
        Err(e) => {
            error!("Failed to save analysis {} for user {}: {}", record.id, owner, e);
            None
        }
    }
}

async fn finish(
    state: &AppState,
    session_id: Uuid,
    ticket: SubmissionTicket,
    result: Result<SubmissionOutcome, AppError>,
) -> Result<ViewResponse, AppError> {
    let kind = ticket.kind();
    // A session torn down mid-flight is not recreated for a result it can no longer show.
    state
        .sessions
        .peek(session_id, |session| match result {
            Ok(outcome) => {
                if !session.finish_submission(ticket, outcome) {
                    info!(
                        "Discarding stale {} result for session {} (now at {})",
                        kind.as_str(),
                        session_id,
                        session.navigator().state().name()
                    );
                }
                Ok(render_session(session))
            }
            Err(e) => {
                session.abandon_submission(ticket);
                Err(e)
            }
        })
        .await
}
