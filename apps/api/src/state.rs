use std::sync::Arc;

use crate::analysis_client::AnalysisClient;
use crate::config::Config;
use crate::navigator::session::SessionRegistry;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Scoring API boundary. Default: HttpAnalysisClient.
    pub analysis: Arc<dyn AnalysisClient>,
    /// History persistence. Postgres or in-memory, chosen by RECORD_STORE.
    pub store: Arc<dyn RecordStore>,
    /// Navigator state per browser session.
    pub sessions: SessionRegistry,
}
