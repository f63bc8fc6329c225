pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::extraction::handlers as resumes;
use crate::matching::handlers as matching;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume API
        .route(
            "/api/v1/resumes",
            post(resumes::handle_upload).get(resumes::handle_list_resumes),
        )
        .route(
            "/api/v1/resumes/:id",
            delete(resumes::handle_delete_resume),
        )
        .route("/api/v1/resumes/:id/score", post(matching::handle_self_score))
        // Matching API
        .route(
            "/api/v1/match/best-resumes",
            post(matching::handle_best_resumes),
        )
        .route(
            "/api/v1/embeddings/count",
            get(matching::handle_embedding_count),
        )
        .with_state(state)
}
