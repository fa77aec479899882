//! Per-browser-session state: the navigator plus submission bookkeeping.
//!
//! Two guards sit around every submission:
//! - an exclusion latch per form kind, so a second submit of the same form is
//!   refused while the first is in flight;
//! - a request token, so a result is only shown if its request is still the
//!   current one. Any navigation invalidates the token.
//!
//! Tokens are random and never reused, so a ticket minted for a session that
//! was later torn down cannot match anything in its replacement.
//!
//! All navigator mutation goes through this type so the token stays honest.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::analysis::model::{Analysis, AnalysisKind, AnalysisRecord};
use crate::navigator::{DetailLoad, NavError, Navigator, ViewState};

/// Sessions untouched for this long are dropped, unless a submission is in flight.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("A {} analysis is already in progress", .0.as_str())]
    SubmissionInFlight(AnalysisKind),
}

/// Proof that a submission was started. Consumed when it finishes.
#[derive(Debug, PartialEq, Eq)]
pub struct SubmissionTicket {
    kind: AnalysisKind,
    token: Uuid,
}

impl SubmissionTicket {
    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }
}

/// What a finished submission produced.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub analysis: Analysis,
    pub saved: Option<AnalysisRecord>,
    pub notices: Vec<String>,
}

#[derive(Debug, Default)]
pub struct AnalysisSession {
    navigator: Navigator,
    /// Latch per form, holding the token of the submission that owns it.
    in_flight: HashMap<AnalysisKind, Uuid>,
    current: Option<Uuid>,
}

impl AnalysisSession {
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn is_in_flight(&self, kind: AnalysisKind) -> bool {
        self.in_flight.contains_key(&kind)
    }

    /// Forms with a submission in flight, in a stable order.
    pub fn busy_forms(&self) -> Vec<AnalysisKind> {
        [AnalysisKind::Single, AnalysisKind::Bulk]
            .into_iter()
            .filter(|k| self.is_in_flight(*k))
            .collect()
    }

    pub fn begin_submission(
        &mut self,
        kind: AnalysisKind,
    ) -> Result<SubmissionTicket, SessionError> {
        if self.in_flight.contains_key(&kind) {
            return Err(SessionError::SubmissionInFlight(kind));
        }
        let token = Uuid::new_v4();
        self.in_flight.insert(kind, token);
        self.current = Some(token);
        Ok(SubmissionTicket { kind, token })
    }

    /// Releases the latch and applies the result if the request is still
    /// current. Returns whether the view changed.
    ///
    /// A ticket this session did not issue changes nothing, not even the
    /// retained history.
    pub fn finish_submission(
        &mut self,
        ticket: SubmissionTicket,
        outcome: SubmissionOutcome,
    ) -> bool {
        if !self.release(&ticket) {
            return false;
        }
        if let Some(record) = outcome.saved {
            self.navigator.record_saved(record);
        }
        if self.current != Some(ticket.token) {
            return false;
        }
        self.current = None;
        self.navigator.submit_new(outcome.analysis);
        for notice in outcome.notices {
            self.navigator.notify(notice);
        }
        true
    }

    /// Releases the latch after a failed submission. The view is untouched.
    pub fn abandon_submission(&mut self, ticket: SubmissionTicket) {
        if self.release(&ticket) && self.current == Some(ticket.token) {
            self.current = None;
        }
    }

    /// Frees the latch only if this ticket holds it.
    fn release(&mut self, ticket: &SubmissionTicket) -> bool {
        if self.in_flight.get(&ticket.kind) != Some(&ticket.token) {
            return false;
        }
        self.in_flight.remove(&ticket.kind);
        true
    }

    pub fn load_list(&mut self, records: Vec<AnalysisRecord>, kind_filter: Option<AnalysisKind>) {
        self.current = None;
        self.navigator.load_list(records, kind_filter);
    }

    pub fn select(&mut self, load: DetailLoad) -> &ViewState {
        self.current = None;
        self.navigator.select(load)
    }

    pub fn select_entry(&mut self, index: usize) -> Result<&ViewState, NavError> {
        self.current = None;
        self.navigator.select_entry(index)
    }

    pub fn back(&mut self) -> &ViewState {
        self.current = None;
        self.navigator.back()
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.navigator.notify(message);
    }

    pub fn drain_notices(&mut self) -> Vec<String> {
        self.navigator.drain_notices()
    }
}

#[derive(Debug)]
struct Slot {
    session: AnalysisSession,
    last_seen: Instant,
}

/// All live sessions, keyed by the browser's session id.
///
/// The lock is only held for synchronous state changes, never across the
/// outbound analysis call. Idle sessions are swept whenever a new one is
/// created, so the map is bounded by the sessions active within the TTL.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Slot>>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_ttl,
        }
    }

    /// Runs `f` against the session, creating it if needed.
    pub async fn with<R>(&self, session_id: Uuid, f: impl FnOnce(&mut AnalysisSession) -> R) -> R {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        if !sessions.contains_key(&session_id) {
            self.sweep(&mut sessions, now);
        }
        let slot = sessions.entry(session_id).or_insert_with(|| Slot {
            session: AnalysisSession::default(),
            last_seen: now,
        });
        slot.last_seen = now;
        f(&mut slot.session)
    }

    /// Runs `f` against the session if it exists, otherwise against a
    /// throwaway initial session. Never creates an entry.
    pub async fn peek<R>(&self, session_id: Uuid, f: impl FnOnce(&mut AnalysisSession) -> R) -> R {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&session_id) {
            Some(slot) => {
                slot.last_seen = Instant::now();
                f(&mut slot.session)
            }
            None => f(&mut AnalysisSession::default()),
        }
    }

    /// Drops a session. Returns whether it existed.
    pub async fn teardown(&self, session_id: Uuid) -> bool {
        self.sessions.lock().await.remove(&session_id).is_some()
    }

    fn sweep(&self, sessions: &mut HashMap<Uuid, Slot>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, slot| {
            !slot.session.in_flight.is_empty()
                || now.duration_since(slot.last_seen) < self.idle_ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {evicted} idle sessions");
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::builder::{build_record_summary, normalize_single};
    use chrono::Utc;
    use serde_json::json;

    fn outcome(score: u32) -> SubmissionOutcome {
        SubmissionOutcome {
            analysis: Analysis::Single(normalize_single(&json!({ "match_score": score })).unwrap()),
            saved: None,
            notices: vec![],
        }
    }

    #[test]
    fn test_second_submit_of_same_form_is_refused() {
        let mut session = AnalysisSession::default();
        let _first = session.begin_submission(AnalysisKind::Single).unwrap();
        assert_eq!(
            session.begin_submission(AnalysisKind::Single),
            Err(SessionError::SubmissionInFlight(AnalysisKind::Single))
        );
        // The other form has its own latch.
        assert!(session.begin_submission(AnalysisKind::Bulk).is_ok());
    }

    #[test]
    fn test_finish_releases_latch_and_applies_result() {
        let mut session = AnalysisSession::default();
        let ticket = session.begin_submission(AnalysisKind::Single).unwrap();
        assert!(session.finish_submission(ticket, outcome(70)));
        assert!(!session.is_in_flight(AnalysisKind::Single));
        assert_eq!(session.navigator().state().name(), "single_detail");
    }

    #[test]
    fn test_abandon_releases_latch_without_changing_view() {
        let mut session = AnalysisSession::default();
        let ticket = session.begin_submission(AnalysisKind::Bulk).unwrap();
        session.abandon_submission(ticket);
        assert!(!session.is_in_flight(AnalysisKind::Bulk));
        assert_eq!(session.navigator().state().name(), "list");
        assert!(session.begin_submission(AnalysisKind::Bulk).is_ok());
    }

    #[test]
    fn test_navigation_discards_stale_result() {
        let mut session = AnalysisSession::default();
        let ticket = session.begin_submission(AnalysisKind::Single).unwrap();
        session.load_list(vec![], None);

        let saved = AnalysisRecord::new(
            Uuid::new_v4(),
            "Late".to_string(),
            Utc::now(),
            build_record_summary(&outcome(50).analysis),
        );
        let mut late = outcome(50);
        late.saved = Some(saved.clone());

        assert!(!session.finish_submission(ticket, late));
        assert_eq!(session.navigator().state().name(), "list");
        assert!(!session.is_in_flight(AnalysisKind::Single));
        // The record still joins the history even though the view ignored it.
        assert_eq!(session.navigator().history().records, vec![saved]);
    }

    #[test]
    fn test_newer_submission_supersedes_older() {
        let mut session = AnalysisSession::default();
        let single = session.begin_submission(AnalysisKind::Single).unwrap();
        let bulk = session.begin_submission(AnalysisKind::Bulk).unwrap();

        assert!(!session.finish_submission(single, outcome(10)));
        let applied = session.finish_submission(
            bulk,
            SubmissionOutcome {
                analysis: Analysis::Bulk(crate::analysis::model::BulkAnalysis::empty()),
                saved: None,
                notices: vec!["Unexpected bulk response shape".to_string()],
            },
        );
        assert!(applied);
        assert_eq!(session.navigator().state().name(), "bulk_list");
        assert_eq!(session.drain_notices().len(), 1);
    }

    #[tokio::test]
    async fn test_registry_keeps_sessions_apart() {
        let registry = SessionRegistry::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        registry
            .with(a, |s| s.begin_submission(AnalysisKind::Single).map(|_| ()))
            .await
            .unwrap();
        let b_free = registry
            .with(b, |s| !s.is_in_flight(AnalysisKind::Single))
            .await;
        assert!(b_free);

        assert!(registry.teardown(a).await);
        assert!(!registry.teardown(a).await);
        let fresh = registry
            .with(a, |s| !s.is_in_flight(AnalysisKind::Single))
            .await;
        assert!(fresh);
    }

    #[tokio::test]
    async fn test_ticket_from_torn_down_session_is_ignored() {
        let registry = SessionRegistry::default();
        let sid = Uuid::new_v4();

        let old = registry
            .with(sid, |s| s.begin_submission(AnalysisKind::Single))
            .await
            .unwrap();
        assert!(registry.teardown(sid).await);
        let _live = registry
            .with(sid, |s| s.begin_submission(AnalysisKind::Single))
            .await
            .unwrap();

        let (applied, still_latched, state) = registry
            .with(sid, |s| {
                let applied = s.finish_submission(old, outcome(90));
                (
                    applied,
                    s.is_in_flight(AnalysisKind::Single),
                    s.navigator().state().name(),
                )
            })
            .await;
        assert!(!applied);
        assert!(still_latched);
        assert_eq!(state, "list");
    }

    #[test]
    fn test_foreign_ticket_does_not_touch_history() {
        let mut issuer = AnalysisSession::default();
        let ticket = issuer.begin_submission(AnalysisKind::Bulk).unwrap();

        let mut other = AnalysisSession::default();
        let mut late = outcome(60);
        late.saved = Some(AnalysisRecord::new(
            Uuid::new_v4(),
            "Elsewhere".to_string(),
            Utc::now(),
            build_record_summary(&late.analysis),
        ));
        assert!(!other.finish_submission(ticket, late));
        assert!(other.navigator().history().records.is_empty());
    }

    #[test]
    fn test_abandon_with_foreign_ticket_keeps_latch() {
        let mut first = AnalysisSession::default();
        let stale = first.begin_submission(AnalysisKind::Single).unwrap();

        let mut second = AnalysisSession::default();
        let _live = second.begin_submission(AnalysisKind::Single).unwrap();
        second.abandon_submission(stale);
        assert!(second.is_in_flight(AnalysisKind::Single));
    }

    #[tokio::test]
    async fn test_peek_does_not_create_sessions() {
        let registry = SessionRegistry::default();
        for _ in 0..100 {
            let busy = registry.peek(Uuid::new_v4(), |s| s.busy_forms()).await;
            assert!(busy.is_empty());
        }
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted_on_next_insert() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let idle = Uuid::new_v4();
        let busy = Uuid::new_v4();
        registry.with(idle, |_| ()).await;
        registry
            .with(busy, |s| s.begin_submission(AnalysisKind::Bulk).map(|_| ()))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        registry.with(Uuid::new_v4(), |_| ()).await;

        // The idle session is gone; the one with a submission in flight stays.
        assert_eq!(registry.len().await, 2);
        let kept = registry
            .peek(busy, |s| s.is_in_flight(AnalysisKind::Bulk))
            .await;
        assert!(kept);
        let fresh = registry.peek(idle, |s| s.navigator().history().loaded).await;
        assert!(!fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touched_sessions_survive_sweep() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let sid = Uuid::new_v4();
        registry.with(sid, |s| s.load_list(vec![], None)).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        registry.peek(sid, |_| ()).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        registry.with(Uuid::new_v4(), |_| ()).await;

        let loaded = registry.peek(sid, |s| s.navigator().history().loaded).await;
        assert!(loaded);
    }
}
