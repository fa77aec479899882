//! Canonical analysis shapes.
//!
//! Every payload variant (live API response, stored history document) is
//! converted into these types by [`crate::analysis::builder`] before it is
//! rendered or persisted. Nothing downstream reads raw field names.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Sentinel shown when a bulk analysis has no entries to name.
pub const NO_TOP_ENTRY: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Single,
    Bulk,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Single => "single",
            AnalysisKind::Bulk => "bulk",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Some(AnalysisKind::Single),
            "bulk" => Some(AnalysisKind::Bulk),
            _ => None,
        }
    }
}

/// Score and keyword coverage for one named sub-dimension of the match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category_name: String,
    pub score: f64, // clamped to 0 – 100
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleAnalysis {
    pub match_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    pub categories: BTreeMap<String, CategoryScore>,
    pub feedback: BTreeMap<String, String>,
}

/// Outcome of scoring one file in a bulk batch. A file either failed with
/// an error message or carries a score together with its full detail.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Scored {
        match_score: f64,
        detail: SingleAnalysis,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkEntry {
    pub file_name: String,
    pub outcome: EntryOutcome,
}

impl BulkEntry {
    pub fn match_score(&self) -> Option<f64> {
        match &self.outcome {
            EntryOutcome::Scored { match_score, .. } => Some(*match_score),
            EntryOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            EntryOutcome::Failed { error } => Some(error),
            EntryOutcome::Scored { .. } => None,
        }
    }

    pub fn detail(&self) -> Option<&SingleAnalysis> {
        match &self.outcome {
            EntryOutcome::Scored { detail, .. } => Some(detail),
            EntryOutcome::Failed { .. } => None,
        }
    }
}

// Persisted as the flat `{fileName, matchScore?, error?, detail?}` document
// shape so stored bulk histories read back through the same builder path.
impl Serialize for BulkEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct EntryDocument<'a> {
            file_name: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            match_score: Option<f64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            detail: Option<&'a SingleAnalysis>,
        }

        EntryDocument {
            file_name: &self.file_name,
            match_score: self.match_score(),
            error: self.error(),
            detail: self.detail(),
        }
        .serialize(serializer)
    }
}

/// A ranked batch of entries. Entry order is the rank order returned by the
/// scoring API and is never re-sorted here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAnalysis {
    pub entries: Vec<BulkEntry>,
    pub total_count: usize,
    pub top_entry_name: String,
}

impl BulkAnalysis {
    pub fn from_entries(entries: Vec<BulkEntry>) -> Self {
        let top_entry_name = entries
            .first()
            .map(|e| e.file_name.clone())
            .unwrap_or_else(|| NO_TOP_ENTRY.to_string());
        Self {
            total_count: entries.len(),
            top_entry_name,
            entries,
        }
    }

    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Single(SingleAnalysis),
    Bulk(BulkAnalysis),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum RecordSummary {
    Single {
        match_score: f64,
    },
    Bulk {
        total_count: usize,
        top_entry_name: String,
    },
}

impl RecordSummary {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            RecordSummary::Single { .. } => AnalysisKind::Single,
            RecordSummary::Bulk { .. } => AnalysisKind::Bulk,
        }
    }
}

/// One entry of a user's append-only analysis history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub kind: AnalysisKind,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub summary: RecordSummary,
}

impl AnalysisRecord {
    /// The kind is taken from the summary so the two can never disagree.
    pub fn new(id: Uuid, title: String, created_at: DateTime<Utc>, summary: RecordSummary) -> Self {
        Self {
            id,
            kind: summary.kind(),
            title,
            created_at,
            summary,
        }
    }
}
