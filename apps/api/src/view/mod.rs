//! Renders navigator state into the JSON the browser draws.
//!
//! Every score leaves here with its band attached, and `color_band` is the
//! only classifier used.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::analysis::band::{color_band, ScoreBand};
use crate::analysis::model::{
    AnalysisKind, AnalysisRecord, BulkAnalysis, RecordSummary, SingleAnalysis,
};
use crate::navigator::session::AnalysisSession;
use crate::navigator::{HistoryList, Origin, ViewState};

const ABSENT: &str = "N/A";

#[derive(Debug, Clone, Serialize)]
pub struct ViewResponse {
    pub view: View,
    pub notices: Vec<String>,
    /// Forms whose submit should be disabled.
    pub busy: Vec<AnalysisKind>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum View {
    List {
        loaded: bool,
        kind_filter: Option<AnalysisKind>,
        records: Vec<RecordView>,
    },
    SingleDetail {
        origin: Origin,
        analysis: SingleView,
    },
    BulkList {
        origin: Origin,
        total_count: usize,
        top_entry_name: String,
        entries: Vec<EntryRow>,
    },
    BulkEntryDetail {
        origin: Origin,
        rank: usize,
        file_name: String,
        error: Option<String>,
        analysis: Option<SingleView>,
    },
    NotFound {
        record_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreView {
    pub value: f64,
    pub band: ScoreBand,
    pub color: &'static str,
}

impl ScoreView {
    pub fn of(value: f64) -> Self {
        let band = color_band(value);
        Self {
            value,
            band,
            color: band.hex(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub id: Uuid,
    pub kind: AnalysisKind,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<ScoreView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_entry_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartBar {
    pub category: String,
    pub score: f64,
    pub band: ScoreBand,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub score: ScoreView,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackView {
    pub category: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleView {
    pub match_score: ScoreView,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub chart: Vec<ChartBar>,
    pub categories: Vec<CategoryView>,
    pub feedback: Vec<FeedbackView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryRow {
    pub rank: usize,
    pub file_name: String,
    pub match_score: Option<ScoreView>,
    pub error: Option<String>,
}

/// Renders the session's current state and drains its pending notices.
pub fn render_session(session: &mut AnalysisSession) -> ViewResponse {
    let view = render(session.navigator().state());
    ViewResponse {
        view,
        notices: session.drain_notices(),
        busy: session.busy_forms(),
    }
}

pub fn render(state: &ViewState) -> View {
    match state {
        ViewState::List(list) => render_list(list),
        ViewState::SingleDetail { analysis, origin } => View::SingleDetail {
            origin: *origin,
            analysis: render_single(analysis),
        },
        ViewState::BulkList { analysis, origin } => render_bulk(analysis, *origin),
        ViewState::BulkEntryDetail {
            analysis,
            entry_index,
            origin,
        } => {
            let entry = &analysis.entries[*entry_index];
            View::BulkEntryDetail {
                origin: *origin,
                rank: entry_index + 1,
                file_name: entry.file_name.clone(),
                error: entry.error().map(str::to_string),
                analysis: entry.detail().map(render_single),
            }
        }
        ViewState::NotFound { record_id } => View::NotFound {
            record_id: *record_id,
        },
    }
}

fn render_list(list: &HistoryList) -> View {
    View::List {
        loaded: list.loaded,
        kind_filter: list.kind_filter,
        records: list.visible().map(render_record).collect(),
    }
}

fn render_record(record: &AnalysisRecord) -> RecordView {
    let (match_score, total_count, top_entry_name) = match &record.summary {
        RecordSummary::Single { match_score } => (Some(ScoreView::of(*match_score)), None, None),
        RecordSummary::Bulk {
            total_count,
            top_entry_name,
        } => (None, Some(*total_count), Some(top_entry_name.clone())),
    };
    RecordView {
        id: record.id,
        kind: record.kind,
        title: record.title.clone(),
        created_at: record.created_at,
        match_score,
        total_count,
        top_entry_name,
    }
}

fn render_single(analysis: &SingleAnalysis) -> SingleView {
    let categories: Vec<CategoryView> = analysis
        .categories
        .values()
        .map(|c| CategoryView {
            name: c.category_name.clone(),
            score: ScoreView::of(c.score),
            matched_keywords: c.matched_keywords.clone(),
            missing_keywords: c.missing_keywords.clone(),
        })
        .collect();

    let chart = categories
        .iter()
        .map(|c| ChartBar {
            category: c.name.clone(),
            score: c.score.value,
            band: c.score.band,
            color: c.score.color,
        })
        .collect();

    SingleView {
        match_score: ScoreView::of(analysis.match_score),
        name: or_absent(&analysis.contact_name),
        email: or_absent(&analysis.contact_email),
        phone: or_absent(&analysis.contact_phone),
        chart,
        categories,
        feedback: analysis
            .feedback
            .iter()
            .map(|(category, text)| FeedbackView {
                category: category.clone(),
                text: text.clone(),
            })
            .collect(),
    }
}

fn render_bulk(analysis: &BulkAnalysis, origin: Origin) -> View {
    View::BulkList {
        origin,
        total_count: analysis.total_count,
        top_entry_name: analysis.top_entry_name.clone(),
        entries: analysis
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| EntryRow {
                rank: idx + 1,
                file_name: entry.file_name.clone(),
                match_score: entry.match_score().map(ScoreView::of),
                error: entry.error().map(str::to_string),
            })
            .collect(),
    }
}

fn or_absent(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| ABSENT.to_string())
}
