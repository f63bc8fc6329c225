//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::ingest::{delete_resume, ingest_upload, Upload};
use crate::models::resume::ResumeRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeleteResumeResponse {
    pub resume_id: i64,
    pub message: String,
}

/// POST /api/v1/resumes
///
/// Multipart upload with a `user_id` text field and a `file` part (PDF or DOCX).
/// Responds 201 with the stored record once its embedding is indexed.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeRecord>), AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable user_id: {e}")))?;
                let parsed = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                user_id = Some(parsed);
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("file part has no file name".to_string()))?;
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable file: {e}")))?;
                file = Some((file_name, content));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    let (file_name, content) =
        file.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    if content.is_empty() {
        return Err(AppError::Validation("file is empty".to_string()));
    }

    let record = ingest_upload(
        Upload {
            user_id,
            file_name,
            content,
        },
        &state.loader,
        state.generator.as_ref(),
        state.store.as_ref(),
        &state.indexer,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/resumes?user_id=
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    let resumes = state.store.list_for_user(query.user_id).await?;
    if resumes.is_empty() {
        return Err(AppError::NotFound("No resumes found for this user".to_string()));
    }
    Ok(Json(resumes))
}

/// DELETE /api/v1/resumes/:id?user_id=
///
/// Only the owner may delete; the embedding goes with the record.
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<DeleteResumeResponse>, AppError> {
    delete_resume(
        resume_id,
        query.user_id,
        state.store.as_ref(),
        &state.indexer,
    )
    .await?;

    Ok(Json(DeleteResumeResponse {
        resume_id,
        message: "Resume deleted successfully".to_string(),
    }))
}
