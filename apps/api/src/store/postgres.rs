use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::store::{RecordStore, StoreError, StoredDocument};

#[derive(Debug, Clone, FromRow)]
struct HistoryRow {
    id: Uuid,
    document: Value,
}

impl From<HistoryRow> for StoredDocument {
    fn from(row: HistoryRow) -> Self {
        StoredDocument {
            id: row.id,
            body: row.document,
        }
    }
}

/// Postgres-backed history. Documents live in a JSONB column; the owner and
/// analysis date are lifted into columns for filtering and ordering.
/// Schema: `migrations/0001_analysis_history.sql`.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn save(&self, owner: Uuid, document: StoredDocument) -> Result<(), StoreError> {
        let analysis_date: DateTime<Utc> = document
            .body
            .get("analysisDate")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        // Append-only: a conflicting id is an error, never an overwrite.
        let result = sqlx::query(
            r#"
            INSERT INTO analysis_history (id, user_id, document, analysis_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(document.id)
        .bind(owner)
        .bind(&document.body)
        .bind(analysis_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(document.id));
        }

        info!("Saved analysis {} for user {}", document.id, owner);
        Ok(())
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, document FROM analysis_history WHERE user_id = $1 ORDER BY analysis_date DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, document FROM analysis_history WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StoredDocument::from))
    }
}
