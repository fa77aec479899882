//! Record store: boundary to the persisted analysis history.
//!
//! Append-only: documents are saved once and never updated or deleted.
//! The owner is always passed in explicitly.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document {0} already exists")]
    Duplicate(Uuid),
}

/// A history document as stored, with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub body: Value,
}

impl StoredDocument {
    /// The owning account recorded in the document, if readable.
    pub fn owner(&self) -> Option<Uuid> {
        self.body
            .get("userId")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, owner: Uuid, document: StoredDocument) -> Result<(), StoreError>;

    /// All documents for an owner, newest first.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<StoredDocument>, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredDocument>, StoreError>;
}
