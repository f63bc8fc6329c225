//! Upload pipeline: load → contact scan → extract → persist → merge → index.
//!
//! A record is only kept once its embedding is stored. When the merged document
//! is empty or indexing fails, the freshly inserted record is deleted again.

use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::contact::extract_contact_info;
use crate::extraction::loader::{DocumentFormat, DocumentLoader};
use crate::extraction::structured::extract_resume;
use crate::extraction::ExtractionError;
use crate::llm_client::TextGenerator;
use crate::matching::document::merge_record;
use crate::matching::indexer::ResumeIndexer;
use crate::models::resume::{NewResume, ResumeRecord};
use crate::store::ResumeStore;

/// A file received from a user, not yet parsed.
#[derive(Debug, Clone)]
pub struct Upload {
    pub user_id: Uuid,
    pub file_name: String,
    pub content: Bytes,
}

pub async fn ingest_upload(
    upload: Upload,
    loader: &DocumentLoader,
    generator: &dyn TextGenerator,
    store: &dyn ResumeStore,
    indexer: &ResumeIndexer,
) -> Result<ResumeRecord, AppError> {
    let format = DocumentFormat::from_file_name(&upload.file_name)?;
    let text = loader.load(&upload.content, format.extension()).await?;
    if text.trim().is_empty() {
        return Err(ExtractionError::DocumentLoadFailure(
            "document contains no extractable text".to_string(),
        )
        .into());
    }

    let contacts = extract_contact_info(&text);
    info!(
        file_name = %upload.file_name,
        emails = ?contacts.emails,
        phones = ?contacts.phones,
        "Contact info found in upload"
    );

    let extracted = extract_resume(&text, generator).await?;

    let record = store
        .insert(NewResume {
            user_id: upload.user_id,
            file_name: upload.file_name,
            extracted,
        })
        .await?;
    info!("Stored resume {} for user {}", record.id, record.user_id);

    let indexed = match merge_record(&record) {
        Some(document) => indexer.upsert(&document).await.map_err(AppError::from),
        None => Err(ExtractionError::EmptyResumeContent.into()),
    };

    if let Err(e) = indexed {
        warn!("Indexing resume {} failed ({e}); removing the record", record.id);
        if let Err(cleanup) = store.delete(record.id).await {
            error!("Failed to remove unindexed resume {}: {cleanup:?}", record.id);
        }
        return Err(e);
    }

    Ok(record)
}

/// Deletes a resume owned by `requester`: the record first, then its embedding.
pub async fn delete_resume(
    resume_id: i64,
    requester: Uuid,
    store: &dyn ResumeStore,
    indexer: &ResumeIndexer,
) -> Result<(), AppError> {
    let record = store
        .get(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    if record.user_id != requester {
        return Err(AppError::Forbidden);
    }

    store.delete(resume_id).await?;
    indexer.delete(resume_id).await?;
    info!("Deleted resume {resume_id}");
    Ok(())
}
