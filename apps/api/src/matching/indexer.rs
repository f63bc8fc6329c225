//! Embedding Indexer and Candidate Filter.
//!
//! Every resume has at most one embedding, stored under the fixed key
//! `resume_<id>`, so re-indexing a resume replaces its previous vector.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::matching::document::MergedDocument;
use crate::matching::embedder::{Embedder, EmbeddingError};
use crate::matching::index::{VectorIndex, VectorIndexError, VectorMetadata};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Empty or invalid resume content")]
    EmptyContent,

    #[error("Resume ID is missing")]
    MissingIdentifier,

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector index error: {0}")]
    Index(#[from] VectorIndexError),
}

/// Key under which a resume's embedding is stored.
pub fn embedding_key(resume_id: i64) -> String {
    format!("resume_{resume_id}")
}

#[derive(Clone)]
pub struct ResumeIndexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl ResumeIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embeds the document and stores it under `resume_<id>`, replacing any
    /// earlier vector for that resume. Durable once this returns.
    pub async fn upsert(&self, document: &MergedDocument) -> Result<(), IndexError> {
        if document.text.trim().is_empty() {
            return Err(IndexError::EmptyContent);
        }
        let resume_id = document.resume_id.ok_or(IndexError::MissingIdentifier)?;

        let vector = self
            .embedder
            .embed(&[document.text.as_str()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                got: 0,
            })?;

        let key = embedding_key(resume_id);
        self.index
            .upsert(
                &key,
                vector,
                VectorMetadata {
                    user_id: document.user_id,
                    resume_id,
                },
            )
            .await?;
        info!("Stored embedding {key}");
        Ok(())
    }

    /// Removes the resume's embedding. A missing embedding is not an error.
    pub async fn delete(&self, resume_id: i64) -> Result<(), IndexError> {
        let key = embedding_key(resume_id);
        if self.index.delete(&key).await? {
            info!("Deleted embedding {key}");
        } else {
            debug!("No embedding stored under {key}; nothing to delete");
        }
        Ok(())
    }

    /// Up to `k` resume ids closest to the job description, closest first.
    /// An empty index yields an empty shortlist without calling the embedder.
    pub async fn shortlist(&self, job_description: &str, k: usize) -> Result<Vec<i64>, IndexError> {
        if k == 0 || self.index.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query = self
            .embedder
            .embed(&[job_description])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                got: 0,
            })?;

        let hits = self.index.search(&query, k).await?;
        debug!("Shortlisted {} of up to {k} resumes", hits.len());
        Ok(hits.into_iter().map(|hit| hit.metadata.resume_id).collect())
    }

    pub async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.index.count().await?)
    }
}
