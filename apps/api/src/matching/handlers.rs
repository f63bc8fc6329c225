//! Axum route handlers for the Matching API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::matcher::{rank_candidates, MatchOutcome, MatchRequest};
use crate::matching::scoring::SelfScoreResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelfScoreRequest {
    pub job_description: String,
    /// When present, must match the resume's owner.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingCountResponse {
    pub stored_embeddings: usize,
}

/// POST /api/v1/match/best-resumes
///
/// Shortlists by embedding similarity, scores the shortlist with the LLM and
/// returns the resumes at or above `threshold`, best first.
pub async fn handle_best_resumes(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchOutcome>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation("job_description cannot be empty".to_string()));
    }
    if request.threshold > 100 {
        return Err(AppError::Validation("threshold must be between 0 and 100".to_string()));
    }
    let top_k = request.top_k.unwrap_or(state.config.shortlist_size);

    let outcome = rank_candidates(
        &request.job_description,
        request.threshold,
        top_k,
        &state.indexer,
        state.store.as_ref(),
        &state.scorer,
    )
    .await?;

    Ok(Json(outcome))
}

/// POST /api/v1/resumes/:id/score
///
/// Candidate feedback: matching keywords, missing skills, score and suggestions.
pub async fn handle_self_score(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
    Json(request): Json<SelfScoreRequest>,
) -> Result<Json<SelfScoreResult>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation("job_description cannot be empty".to_string()));
    }

    let record = state
        .store
        .get(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    if request.user_id.is_some_and(|owner| owner != record.user_id) {
        return Err(AppError::Forbidden);
    }

    let result = state
        .scorer
        .score_self(&request.job_description, &record)
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/embeddings/count
pub async fn handle_embedding_count(
    State(state): State<AppState>,
) -> Result<Json<EmbeddingCountResponse>, AppError> {
    let stored_embeddings = state.indexer.count().await?;
    Ok(Json(EmbeddingCountResponse { stored_embeddings }))
}
