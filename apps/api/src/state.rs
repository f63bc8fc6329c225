use std::sync::Arc;

use crate::config::Config;
use crate::extraction::loader::DocumentLoader;
use crate::llm_client::TextGenerator;
use crate::matching::indexer::ResumeIndexer;
use crate::matching::scoring::CandidateScorer;
use crate::store::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResumeStore>,
    pub loader: DocumentLoader,
    /// Text generation for structured extraction. Scoring holds its own handle.
    pub generator: Arc<dyn TextGenerator>,
    pub indexer: ResumeIndexer,
    pub scorer: CandidateScorer,
    pub config: Config,
}
