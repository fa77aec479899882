/// Analysis client: the single point of entry for calls to the resume scoring API.
///
/// The scoring API owns parsing, keyword matching and feedback generation.
/// This module only ships uploads and hands back the raw JSON body; turning it
/// into canonical shapes is the builder's job.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const SINGLE_PATH: &str = "/upload_resume";
const BULK_PATH: &str = "/upload_bulk_resumes";

/// Upper bound on files per bulk submission, enforced by the scoring API.
pub const MAX_BULK_FILES: usize = 10;

/// Extensions accepted by the scoring API.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "docx", "png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum AnalysisClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One uploaded resume file.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ResumeUpload {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn has_accepted_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }

    fn into_part(self) -> Result<Part, AnalysisClientError> {
        let part = Part::bytes(self.bytes.to_vec()).file_name(self.file_name);
        Ok(match self.content_type {
            Some(mime) => part.mime_str(&mime)?,
            None => part,
        })
    }
}

/// Boundary to the scoring API. Implementations return the raw response body.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn submit_single(
        &self,
        upload: ResumeUpload,
        job_description: &str,
    ) -> Result<Value, AnalysisClientError>;

    async fn submit_bulk(
        &self,
        uploads: Vec<ResumeUpload>,
        job_description: &str,
    ) -> Result<Value, AnalysisClientError>;
}

#[derive(Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    base_url: String,
}

impl HttpAnalysisClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AnalysisClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_form(&self, path: &str, form: Form) -> Result<Value, AnalysisClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Scoring API returned {} for {}: {}", status, path, body);
            return Err(AnalysisClientError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let body = response.bytes().await?;
        debug!("Scoring API {} returned {} bytes", path, body.len());
        // An empty body is the "no payload" case; the builder rejects it.
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn submit_single(
        &self,
        upload: ResumeUpload,
        job_description: &str,
    ) -> Result<Value, AnalysisClientError> {
        let form = Form::new()
            .part("file", upload.into_part()?)
            .text("job_description", job_description.to_string());
        self.post_form(SINGLE_PATH, form).await
    }

    async fn submit_bulk(
        &self,
        uploads: Vec<ResumeUpload>,
        job_description: &str,
    ) -> Result<Value, AnalysisClientError> {
        let mut form = Form::new();
        for upload in uploads.into_iter().take(MAX_BULK_FILES) {
            form = form.part("files", upload.into_part()?);
        }
        let form = form.text("job_description", job_description.to_string());
        self.post_form(BULK_PATH, form).await
    }
}

/// Pulls `detail` or `error` out of a JSON error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
