//! Navigator: the explicit view state machine behind `/analyze` and `/history`.
//!
//! States and transitions:
//!
//! ```text
//! List ──select(record)──▶ SingleDetail | BulkList | NotFound
//! BulkList ──select_entry(i)──▶ BulkEntryDetail
//! BulkEntryDetail ──back──▶ BulkList          (same batch, not re-fetched)
//! SingleDetail | BulkList | NotFound ──back──▶ preceding state (List at the root)
//! any ──submit_new(analysis)──▶ SingleDetail | BulkList
//! ```
//!
//! The navigator never performs I/O. Callers fetch details first and hand the
//! outcome to [`Navigator::select`]; a failed fetch leaves the state untouched.

pub mod handlers;
pub mod session;

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::model::{
    Analysis, AnalysisKind, AnalysisRecord, BulkAnalysis, SingleAnalysis,
};

/// Depth of the back stack. Older states are dropped; `back` then lands on the list.
const MAX_BACK_DEPTH: usize = 16;

/// Where a detail view was reached from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Live,
    History,
}

/// The user's history as last loaded, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryList {
    pub records: Vec<AnalysisRecord>,
    pub loaded: bool,
    pub kind_filter: Option<AnalysisKind>,
}

impl HistoryList {
    pub fn pending() -> Self {
        Self {
            records: Vec::new(),
            loaded: false,
            kind_filter: None,
        }
    }

    pub fn visible(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.records
            .iter()
            .filter(move |r| self.kind_filter.map_or(true, |k| r.kind == k))
    }
}

#[derive(Debug, Clone)]
pub enum ViewState {
    List(Arc<HistoryList>),
    SingleDetail {
        analysis: Arc<SingleAnalysis>,
        origin: Origin,
    },
    BulkList {
        analysis: Arc<BulkAnalysis>,
        origin: Origin,
    },
    BulkEntryDetail {
        analysis: Arc<BulkAnalysis>,
        entry_index: usize,
        origin: Origin,
    },
    NotFound {
        record_id: Uuid,
    },
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::List(_) => "list",
            ViewState::SingleDetail { .. } => "single_detail",
            ViewState::BulkList { .. } => "bulk_list",
            ViewState::BulkEntryDetail { .. } => "bulk_entry_detail",
            ViewState::NotFound { .. } => "not_found",
        }
    }
}

/// Result of fetching a history record's detail, handed to [`Navigator::select`].
#[derive(Debug, Clone)]
pub enum DetailLoad {
    Loaded(Analysis),
    NotFound(Uuid),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    #[error("No ranked bulk list is open")]
    NotInBulkList,

    #[error("Entry {index} is outside the loaded batch of {len}")]
    EntryOutOfRange { index: usize, len: usize },
}

#[derive(Debug)]
pub struct Navigator {
    state: ViewState,
    list: Arc<HistoryList>,
    back_stack: VecDeque<ViewState>,
    notices: Vec<String>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// Initial state: an empty list pending load.
    pub fn new() -> Self {
        let list = Arc::new(HistoryList::pending());
        Self {
            state: ViewState::List(Arc::clone(&list)),
            list,
            back_stack: VecDeque::new(),
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn history(&self) -> &Arc<HistoryList> {
        &self.list
    }

    /// Replaces the retained history and shows it. The list is the root, so
    /// the back stack is cleared.
    pub fn load_list(&mut self, records: Vec<AnalysisRecord>, kind_filter: Option<AnalysisKind>) {
        self.list = Arc::new(HistoryList {
            records,
            loaded: true,
            kind_filter,
        });
        self.back_stack.clear();
        self.state = ViewState::List(Arc::clone(&self.list));
    }

    /// Opens a history record. Dispatches on the loaded analysis kind; a
    /// failed load keeps the current state and records a transient notice.
    pub fn select(&mut self, load: DetailLoad) -> &ViewState {
        let next = match load {
            DetailLoad::Loaded(Analysis::Single(single)) => ViewState::SingleDetail {
                analysis: Arc::new(single),
                origin: Origin::History,
            },
            DetailLoad::Loaded(Analysis::Bulk(bulk)) => ViewState::BulkList {
                analysis: Arc::new(bulk),
                origin: Origin::History,
            },
            DetailLoad::NotFound(record_id) => ViewState::NotFound { record_id },
            DetailLoad::Failed(message) => {
                self.notices.push(message);
                return &self.state;
            }
        };
        self.push(next);
        &self.state
    }

    /// Opens one ranked entry of the bulk list currently shown. Entries with
    /// an error still open; the view shows the error instead of scores.
    pub fn select_entry(&mut self, index: usize) -> Result<&ViewState, NavError> {
        let ViewState::BulkList { analysis, origin } = &self.state else {
            return Err(NavError::NotInBulkList);
        };
        let len = analysis.entries.len();
        if index >= len {
            return Err(NavError::EntryOutOfRange { index, len });
        }
        let next = ViewState::BulkEntryDetail {
            analysis: Arc::clone(analysis),
            entry_index: index,
            origin: *origin,
        };
        self.push(next);
        Ok(&self.state)
    }

    pub fn back(&mut self) -> &ViewState {
        self.state = match &self.state {
            ViewState::List(_) => ViewState::List(Arc::clone(&self.list)),
            ViewState::BulkEntryDetail {
                analysis, origin, ..
            } => {
                // Discard the stacked BulkList; rebuild from the same batch.
                self.back_stack.pop_back();
                ViewState::BulkList {
                    analysis: Arc::clone(analysis),
                    origin: *origin,
                }
            }
            _ => match self.back_stack.pop_back() {
                Some(ViewState::List(_)) | None => ViewState::List(Arc::clone(&self.list)),
                Some(previous) => previous,
            },
        };
        &self.state
    }

    /// Shows a freshly computed analysis without going through the list.
    pub fn submit_new(&mut self, analysis: Analysis) -> &ViewState {
        let next = match analysis {
            Analysis::Single(single) => ViewState::SingleDetail {
                analysis: Arc::new(single),
                origin: Origin::Live,
            },
            Analysis::Bulk(bulk) => ViewState::BulkList {
                analysis: Arc::new(bulk),
                origin: Origin::Live,
            },
        };
        self.push(next);
        &self.state
    }

    /// Adds a just-persisted record to the front of the retained history.
    pub fn record_saved(&mut self, record: AnalysisRecord) {
        let mut list = HistoryList::clone(&self.list);
        list.records.insert(0, record);
        self.list = Arc::new(list);
        if let ViewState::List(_) = self.state {
            self.state = ViewState::List(Arc::clone(&self.list));
        }
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    pub fn drain_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn push(&mut self, next: ViewState) {
        let previous = std::mem::replace(&mut self.state, next);
        if self.back_stack.len() == MAX_BACK_DEPTH {
            self.back_stack.pop_front();
        }
        self.back_stack.push_back(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::builder::{build_record_summary, normalize_bulk, normalize_single};
    use chrono::Utc;
    use serde_json::json;

    fn single() -> Analysis {
        Analysis::Single(normalize_single(&json!({"match_score": 82})).unwrap())
    }

    fn bulk() -> Analysis {
        let raw = json!({"results": [
            {"filename": "a.pdf", "match_score": 60},
            {"filename": "b.pdf", "error": "parse failed"}
        ]});
        Analysis::Bulk(normalize_bulk(&raw).unwrap().value)
    }

    fn record(analysis: &Analysis) -> AnalysisRecord {
        AnalysisRecord::new(
            Uuid::new_v4(),
            "Role".to_string(),
            Utc::now(),
            build_record_summary(analysis),
        )
    }

    fn loaded_navigator() -> Navigator {
        let mut nav = Navigator::new();
        nav.load_list(vec![record(&single()), record(&bulk())], None);
        nav
    }

    #[test]
    fn test_initial_state_is_pending_list() {
        let nav = Navigator::new();
        let ViewState::List(list) = nav.state() else {
            panic!("expected list");
        };
        assert!(!list.loaded);
        assert!(list.records.is_empty());
    }

    #[test]
    fn test_select_single_lands_in_single_detail() {
        let mut nav = loaded_navigator();
        let state = nav.select(DetailLoad::Loaded(single()));
        assert!(matches!(
            state,
            ViewState::SingleDetail {
                origin: Origin::History,
                ..
            }
        ));
    }

    #[test]
    fn test_select_bulk_lands_in_bulk_list() {
        let mut nav = loaded_navigator();
        assert_eq!(nav.select(DetailLoad::Loaded(bulk())).name(), "bulk_list");
    }

    #[test]
    fn test_back_from_single_detail_reuses_same_list() {
        let mut nav = loaded_navigator();
        let before = Arc::clone(nav.history());
        nav.select(DetailLoad::Loaded(single()));
        let ViewState::List(after) = nav.back() else {
            panic!("expected list");
        };
        assert!(Arc::ptr_eq(&before, after));
    }

    #[test]
    fn test_entry_detail_back_returns_same_batch() {
        let mut nav = loaded_navigator();
        nav.select(DetailLoad::Loaded(bulk()));
        let ViewState::BulkList { analysis: batch, .. } = nav.state().clone() else {
            panic!("expected bulk list");
        };

        nav.select_entry(0).unwrap();
        let ViewState::BulkList { analysis, origin } = nav.back() else {
            panic!("expected bulk list");
        };
        assert!(Arc::ptr_eq(&batch, analysis));
        assert_eq!(*origin, Origin::History);

        // One more back reaches the list.
        assert_eq!(nav.back().name(), "list");
    }

    #[test]
    fn test_error_entry_still_opens() {
        let mut nav = loaded_navigator();
        nav.select(DetailLoad::Loaded(bulk()));
        let state = nav.select_entry(1).unwrap();
        let ViewState::BulkEntryDetail {
            analysis,
            entry_index,
            ..
        } = state
        else {
            panic!("expected entry detail");
        };
        assert_eq!(analysis.entries[*entry_index].error(), Some("parse failed"));
    }

    #[test]
    fn test_entry_out_of_range_is_rejected() {
        let mut nav = loaded_navigator();
        nav.select(DetailLoad::Loaded(bulk()));
        assert_eq!(
            nav.select_entry(2).unwrap_err(),
            NavError::EntryOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(nav.state().name(), "bulk_list");
    }

    #[test]
    fn test_entry_select_outside_bulk_list_is_rejected() {
        let mut nav = loaded_navigator();
        assert_eq!(nav.select_entry(0).unwrap_err(), NavError::NotInBulkList);
    }

    #[test]
    fn test_failed_load_stays_in_list_with_notice() {
        let mut nav = loaded_navigator();
        let state = nav.select(DetailLoad::Failed("Could not load analysis".to_string()));
        assert_eq!(state.name(), "list");
        assert_eq!(nav.drain_notices(), vec!["Could not load analysis".to_string()]);
        assert!(nav.drain_notices().is_empty());
    }

    #[test]
    fn test_not_found_is_distinct_state() {
        let mut nav = loaded_navigator();
        let id = Uuid::new_v4();
        let state = nav.select(DetailLoad::NotFound(id));
        assert!(matches!(state, ViewState::NotFound { record_id } if *record_id == id));
        assert_eq!(nav.back().name(), "list");
    }

    #[test]
    fn test_submit_new_from_entry_detail_skips_list() {
        let mut nav = loaded_navigator();
        nav.select(DetailLoad::Loaded(bulk()));
        nav.select_entry(0).unwrap();
        let state = nav.submit_new(single());
        assert!(matches!(
            state,
            ViewState::SingleDetail {
                origin: Origin::Live,
                ..
            }
        ));
        assert_eq!(nav.back().name(), "bulk_entry_detail");
    }

    #[test]
    fn test_submit_new_bulk_lands_in_bulk_list() {
        let mut nav = Navigator::new();
        assert!(matches!(
            nav.submit_new(bulk()),
            ViewState::BulkList {
                origin: Origin::Live,
                ..
            }
        ));
    }

    #[test]
    fn test_record_saved_prepends_to_history() {
        let mut nav = loaded_navigator();
        nav.submit_new(single());
        let saved = record(&single());
        nav.record_saved(saved.clone());

        let ViewState::List(list) = nav.back() else {
            panic!("expected list");
        };
        assert_eq!(list.records.len(), 3);
        assert_eq!(list.records[0], saved);
    }

    #[test]
    fn test_kind_filter_limits_visible_records() {
        let mut nav = Navigator::new();
        nav.load_list(
            vec![record(&single()), record(&bulk()), record(&single())],
            Some(AnalysisKind::Bulk),
        );
        assert_eq!(nav.history().visible().count(), 1);
    }

    #[test]
    fn test_back_at_list_is_noop() {
        let mut nav = loaded_navigator();
        assert_eq!(nav.back().name(), "list");
    }

    #[test]
    fn test_back_stack_is_bounded() {
        let mut nav = loaded_navigator();
        for _ in 0..(MAX_BACK_DEPTH + 4) {
            nav.submit_new(single());
        }
        for _ in 0..MAX_BACK_DEPTH {
            nav.back();
        }
        assert_eq!(nav.back().name(), "list");
    }
}
