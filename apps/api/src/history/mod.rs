//! History loading: reads stored documents through the builder into
//! list records and navigator detail loads.

pub mod handlers;

use tracing::{error, warn};
use uuid::Uuid;

use crate::analysis::builder::{analysis_from_document, record_from_document};
use crate::analysis::model::AnalysisRecord;
use crate::navigator::DetailLoad;
use crate::store::{RecordStore, StoreError};

const DETAIL_LOAD_FAILED: &str = "Could not load this analysis. Please try again.";
const DETAIL_UNREADABLE: &str = "This analysis could not be read.";

/// Records plus any notices worth showing alongside them.
#[derive(Debug, Default)]
pub struct LoadedHistory {
    pub records: Vec<AnalysisRecord>,
    pub notices: Vec<String>,
}

/// Loads an owner's history, newest first. Unreadable documents are skipped.
pub async fn load_records(
    store: &dyn RecordStore,
    owner: Uuid,
) -> Result<LoadedHistory, StoreError> {
    let documents = store.list_by_owner(owner).await?;
    let mut loaded = LoadedHistory::default();
    let mut skipped = 0usize;

    for doc in documents {
        match record_from_document(doc.id, &doc.body) {
            Ok(normalized) => {
                for w in &normalized.warnings {
                    warn!("History record {}: {}", doc.id, w);
                }
                loaded.records.push(normalized.value);
            }
            Err(e) => {
                warn!("Skipping unreadable history document {}: {}", doc.id, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        loaded
            .notices
            .push(format!("{skipped} history entries could not be read"));
    }
    loaded
        .records
        .sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(loaded)
}

/// Fetches one record's full analysis for the navigator. Documents owned by
/// another account are reported as not found.
pub async fn load_detail(
    store: &dyn RecordStore,
    owner: Uuid,
    id: Uuid,
) -> (DetailLoad, Vec<String>) {
    let doc = match store.get_by_id(id).await {
        Ok(Some(doc)) if doc.owner() == Some(owner) => doc,
        Ok(Some(_)) => {
            warn!("History document {id} requested by non-owner {owner}");
            return (DetailLoad::NotFound(id), vec![]);
        }
        Ok(None) => return (DetailLoad::NotFound(id), vec![]),
        Err(e) => {
            error!("Failed to load history document {id}: {e}");
            return (DetailLoad::Failed(DETAIL_LOAD_FAILED.to_string()), vec![]);
        }
    };

    match analysis_from_document(&doc.body) {
        Ok(normalized) => {
            let notices = normalized.warnings.iter().map(|w| w.to_string()).collect();
            (DetailLoad::Loaded(normalized.value), notices)
        }
        Err(e) => {
            warn!("History document {id} is unreadable: {e}");
            (DetailLoad::Failed(DETAIL_UNREADABLE.to_string()), vec![])
        }
    }
}
