//! Result builder: converts raw scoring-API responses and stored history
//! documents into the canonical shapes in [`crate::analysis::model`].
//!
//! Payload shapes drift between the live API (`match_score`, `file_name`) and
//! documents written by older clients (`matchScore`, `filename`). Every field
//! is looked up under all of its known spellings, and field-level gaps are
//! always filled with defaults. The only hard failure is a payload that is not
//! there at all.
//!
//! Pure: no I/O, no logging. Recoverable shape problems are returned as
//! [`ShapeWarning`]s for the caller to log and surface.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::model::{
    Analysis, AnalysisKind, AnalysisRecord, BulkAnalysis, BulkEntry, CategoryScore,
    EntryOutcome, RecordSummary, SingleAnalysis, NO_TOP_ENTRY,
};

pub const DEFAULT_SINGLE_TITLE: &str = "Untitled";
pub const DEFAULT_BULK_TITLE: &str = "Untitled Bulk Analysis";

const MATCH_SCORE_KEYS: &[&str] = &["match_score", "matchScore"];
const FILE_NAME_KEYS: &[&str] = &["filename", "file_name", "fileName"];
const BULK_SEQUENCE_KEYS: &[&str] = &["results", "entries"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("analysis payload is missing")]
    MalformedPayload,

    #[error("unknown analysis type '{0}'")]
    UnknownKind(String),
}

/// Non-fatal problems found while normalizing. The result is still usable.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeWarning {
    /// A bulk response had no usable results sequence; an empty batch was substituted.
    UnexpectedShape { found: &'static str },
    /// A stored record had no parseable analysis date.
    MissingAnalysisDate { record_id: Uuid },
}

impl fmt::Display for ShapeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeWarning::UnexpectedShape { found } => write!(
                f,
                "Unexpected bulk response shape ({found}); showing no results"
            ),
            ShapeWarning::MissingAnalysisDate { record_id } => {
                write!(f, "Record {record_id} has no readable analysis date")
            }
        }
    }
}

/// A normalized value plus any warnings recorded while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub warnings: Vec<ShapeWarning>,
}

impl<T> Normalized<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        Normalized {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Single analyses
// ────────────────────────────────────────────────────────────────────────────

/// Normalizes a single-resume payload in either key casing.
pub fn normalize_single(raw: &Value) -> Result<SingleAnalysis, BuildError> {
    let obj = raw.as_object().ok_or(BuildError::MalformedPayload)?;
    Ok(single_from_object(obj))
}

fn single_from_object(obj: &Map<String, Value>) -> SingleAnalysis {
    let categories = field(obj, &["categories"])
        .and_then(Value::as_object)
        .map(|cats| {
            cats.iter()
                .map(|(name, data)| (name.clone(), category_score(name, data)))
                .collect()
        })
        .unwrap_or_default();

    let feedback = field(obj, &["feedback"])
        .and_then(Value::as_object)
        .map(|fb| {
            fb.iter()
                .filter_map(|(name, text)| text.as_str().map(|t| (name.clone(), t.to_string())))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    SingleAnalysis {
        match_score: score_field(obj, MATCH_SCORE_KEYS),
        contact_name: text_field(obj, &["name", "contactName", "contact_name"]),
        contact_email: text_field(obj, &["email", "contactEmail", "contact_email"]),
        contact_phone: text_field(obj, &["phone", "contactPhone", "contact_phone"]),
        categories,
        feedback,
    }
}

fn category_score(name: &str, data: &Value) -> CategoryScore {
    let empty = Map::new();
    let obj = data.as_object().unwrap_or(&empty);
    CategoryScore {
        category_name: name.to_string(),
        score: score_field(obj, &["score"]),
        matched_keywords: keywords(field(obj, &["matched_keywords", "matchedKeywords"])),
        missing_keywords: keywords(field(obj, &["missing_keywords", "missingKeywords"])),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bulk analyses
// ────────────────────────────────────────────────────────────────────────────

/// Normalizes a bulk payload: `{results: [...]}` from the live API,
/// `{entries: [...]}` from an already-normalized batch, or the bare sequence
/// stored in history documents.
///
/// A payload without a usable sequence degrades to an empty batch plus an
/// [`ShapeWarning::UnexpectedShape`] instead of failing.
pub fn normalize_bulk(raw: &Value) -> Result<Normalized<BulkAnalysis>, BuildError> {
    let sequence = match raw {
        Value::Null => return Err(BuildError::MalformedPayload),
        Value::Array(items) => Ok(items),
        Value::Object(obj) => match field(obj, BULK_SEQUENCE_KEYS) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(type_name(other)),
            None => Err("no results field"),
        },
        other => Err(type_name(other)),
    };

    match sequence {
        Ok(items) => {
            let entries = items
                .iter()
                .enumerate()
                .map(|(idx, item)| bulk_entry(idx + 1, item))
                .collect();
            Ok(Normalized::clean(BulkAnalysis::from_entries(entries)))
        }
        Err(found) => Ok(Normalized {
            value: BulkAnalysis::empty(),
            warnings: vec![ShapeWarning::UnexpectedShape { found }],
        }),
    }
}

fn bulk_entry(rank: usize, item: &Value) -> BulkEntry {
    let Some(obj) = item.as_object() else {
        return BulkEntry {
            file_name: format!("Resume {rank}"),
            outcome: EntryOutcome::Failed {
                error: "Unreadable result entry".to_string(),
            },
        };
    };

    let file_name =
        text_field(obj, FILE_NAME_KEYS).unwrap_or_else(|| format!("Resume {rank}"));

    // Error entries are kept as-is; their score/category data is not trusted.
    if let Some(error) = text_field(obj, &["error"]) {
        return BulkEntry {
            file_name,
            outcome: EntryOutcome::Failed { error },
        };
    }

    let mut detail = match field(obj, &["detail"]).and_then(Value::as_object) {
        Some(nested) => single_from_object(nested),
        None => single_from_object(obj),
    };
    let match_score = match field(obj, MATCH_SCORE_KEYS) {
        Some(_) => score_field(obj, MATCH_SCORE_KEYS),
        None => detail.match_score,
    };
    detail.match_score = match_score;

    BulkEntry {
        file_name,
        outcome: EntryOutcome::Scored {
            match_score,
            detail,
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

/// Derives the list-view summary of an analysis.
pub fn build_record_summary(analysis: &Analysis) -> RecordSummary {
    match analysis {
        Analysis::Single(single) => RecordSummary::Single {
            match_score: single.match_score,
        },
        Analysis::Bulk(bulk) => RecordSummary::Bulk {
            total_count: bulk.entries.len(),
            top_entry_name: bulk
                .entries
                .first()
                .map(|e| e.file_name.clone())
                .unwrap_or_else(|| NO_TOP_ENTRY.to_string()),
        },
    }
}

/// Resolves a user-supplied title, falling back to the per-kind default.
pub fn resolve_title(kind: AnalysisKind, title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_string(),
        None => match kind {
            AnalysisKind::Single => DEFAULT_SINGLE_TITLE.to_string(),
            AnalysisKind::Bulk => DEFAULT_BULK_TITLE.to_string(),
        },
    }
}

/// Builds the document persisted for a record. Details are stored in
/// canonical form; bulk details are stored as the bare entry sequence.
pub fn build_document(owner: Uuid, record: &AnalysisRecord, analysis: &Analysis) -> Value {
    let mut doc = json!({
        "type": record.kind.as_str(),
        "userId": owner.to_string(),
        "title": record.title,
        "analysisDate": record.created_at.to_rfc3339(),
    });

    match analysis {
        Analysis::Single(single) => {
            doc["matchScore"] = json!(single.match_score);
            doc["analysisDetails"] = json!(single);
        }
        Analysis::Bulk(bulk) => {
            doc["totalResumes"] = json!(bulk.total_count);
            doc["topResumeFile"] = json!(bulk.top_entry_name);
            doc["analysisDetails"] = json!(bulk.entries);
        }
    }
    doc
}

/// Reads the list-view record out of a stored history document.
pub fn record_from_document(
    id: Uuid,
    doc: &Value,
) -> Result<Normalized<AnalysisRecord>, BuildError> {
    let obj = doc.as_object().ok_or(BuildError::MalformedPayload)?;
    let kind = document_kind(obj)?;
    let mut warnings = Vec::new();

    let title = text_field(obj, &["title"]).unwrap_or_else(|| DEFAULT_SINGLE_TITLE.to_string());

    let created_at = field(obj, &["analysisDate", "date"])
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| {
            warnings.push(ShapeWarning::MissingAnalysisDate { record_id: id });
            DateTime::<Utc>::default()
        });

    let summary = match kind {
        AnalysisKind::Single => RecordSummary::Single {
            match_score: score_field(obj, MATCH_SCORE_KEYS),
        },
        AnalysisKind::Bulk => {
            let stored = field(obj, &["analysisDetails"]).and_then(Value::as_array);
            // Fallbacks read the stored entries so the summary agrees with the detail view.
            let first_stored_name = || {
                stored
                    .and_then(|entries| entries.first())
                    .and_then(Value::as_object)
                    .map(|first| {
                        text_field(first, FILE_NAME_KEYS).unwrap_or_else(|| "Resume 1".to_string())
                    })
            };
            RecordSummary::Bulk {
                total_count: field(obj, &["totalResumes"])
                    .and_then(Value::as_u64)
                    .filter(|n| *n > 0)
                    .map(|n| n as usize)
                    .unwrap_or_else(|| stored.map_or(0, Vec::len)),
                top_entry_name: text_field(obj, &["topResumeFile"])
                    .or_else(first_stored_name)
                    .unwrap_or_else(|| NO_TOP_ENTRY.to_string()),
            }
        }
    };

    Ok(Normalized {
        value: AnalysisRecord::new(id, title, created_at, summary),
        warnings,
    })
}

/// Reads the full analysis out of a stored history document.
pub fn analysis_from_document(doc: &Value) -> Result<Normalized<Analysis>, BuildError> {
    let obj = doc.as_object().ok_or(BuildError::MalformedPayload)?;
    match document_kind(obj)? {
        AnalysisKind::Single => {
            // Older documents kept the API response inline instead of under analysisDetails.
            let details = field(obj, &["analysisDetails"]).unwrap_or(doc);
            let single = normalize_single(details)?;
            Ok(Normalized::clean(Analysis::Single(single)))
        }
        AnalysisKind::Bulk => {
            let details = field(obj, &["analysisDetails"]).unwrap_or(&Value::Null);
            if details.is_null() {
                return Ok(Normalized::clean(Analysis::Bulk(BulkAnalysis::empty())));
            }
            Ok(normalize_bulk(details)?.map(Analysis::Bulk))
        }
    }
}

fn document_kind(obj: &Map<String, Value>) -> Result<AnalysisKind, BuildError> {
    let raw = field(obj, &["type", "kind"])
        .and_then(Value::as_str)
        .unwrap_or_default();
    AnalysisKind::parse(raw).ok_or_else(|| BuildError::UnknownKind(raw.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Field helpers
// ────────────────────────────────────────────────────────────────────────────

/// First non-null value among the given key spellings.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn score_field(obj: &Map<String, Value>, keys: &[&str]) -> f64 {
    let raw = match field(obj, keys) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    clamp_score(raw.unwrap_or(0.0))
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

fn keywords(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
