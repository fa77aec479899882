use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{RecordStore, StoreError, StoredDocument};

/// Process-local store for development runs (`RECORD_STORE=memory`) and tests.
#[derive(Default)]
pub struct MemoryRecordStore {
    documents: RwLock<Vec<(Uuid, StoredDocument)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn analysis_date(doc: &StoredDocument) -> Option<DateTime<Utc>> {
    doc.body
        .get("analysisDate")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, owner: Uuid, document: StoredDocument) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        if documents.iter().any(|(_, d)| d.id == document.id) {
            return Err(StoreError::Duplicate(document.id));
        }
        documents.push((owner, document));
        Ok(())
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<StoredDocument>, StoreError> {
        let mut owned: Vec<StoredDocument> = self
            .documents
            .read()
            .await
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, d)| d.clone())
            .collect();
        owned.sort_by(|a, b| analysis_date(b).cmp(&analysis_date(a)));
        Ok(owned)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .find(|(_, d)| d.id == id)
            .map(|(_, d)| d.clone()))
    }
}
