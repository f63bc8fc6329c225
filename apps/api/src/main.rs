mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;
mod store;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::loader::DocumentLoader;
use crate::llm_client::LlmClient;
use crate::matching::embedder::OpenAiEmbedder;
use crate::matching::index::PgVectorIndex;
use crate::matching::indexer::ResumeIndexer;
use crate::matching::scoring::CandidateScorer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgResumeStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (migrations run inside create_pool)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgResumeStore::new(db.clone()));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        config.llm_timeout,
    )
    .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());
    let generator = Arc::new(llm);

    // Initialize embeddings + vector index
    let embedder = OpenAiEmbedder::new(
        &config.embedding_api_key,
        &config.embedding_base_url,
        config.embedding_model.clone(),
        config.embedding_timeout,
    )
    .context("Failed to build embedding client")?;
    info!("Embedding client initialized (model: {})", embedder.model());
    let indexer = ResumeIndexer::new(Arc::new(embedder), Arc::new(PgVectorIndex::new(db)));

    // Build app state
    let state = AppState {
        store,
        loader: DocumentLoader::standard(config.scratch_dir.clone(), config.document_timeout),
        generator: generator.clone(),
        indexer,
        scorer: CandidateScorer::new(generator, config.scoring_concurrency),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
