//! Vector index: nearest-neighbour search over resume embeddings.
//!
//! `PgVectorIndex` stores one row per embedding in the `resume_embeddings` table
//! (pgvector `vector` column) and ranks by cosine distance (`<=>`). Searches only
//! consider rows whose dimension matches the query, so switching embedding models
//! leaves older rows unreachable until they are re-indexed instead of failing.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Tags stored with each vector and handed back on search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorMetadata {
    pub user_id: Uuid,
    pub resume_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub metadata: VectorMetadata,
    /// Cosine distance, `0.0` for identical direction.
    pub distance: f32,
}

#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("vector index database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid vector: {0}")]
    InvalidVector(String),
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces the vector stored under `id`.
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<(), VectorIndexError>;
    /// Returns whether anything was removed. Unknown ids are not an error.
    async fn delete(&self, id: &str) -> Result<bool, VectorIndexError>;
    /// Up to `k` hits of the query's dimension, closest first, ties by id.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorIndexError>;
    async fn count(&self) -> Result<usize, VectorIndexError>;
}

#[derive(Debug, FromRow)]
struct HitRow {
    id: String,
    resume_id: i64,
    user_id: Uuid,
    distance: f64,
}

impl From<HitRow> for SearchHit {
    fn from(row: HitRow) -> Self {
        SearchHit {
            id: row.id,
            metadata: VectorMetadata {
                user_id: row.user_id,
                resume_id: row.resume_id,
            },
            distance: row.distance as f32,
        }
    }
}

/// pgvector-backed index over the `resume_embeddings` table.
#[derive(Clone)]
pub struct PgVectorIndex {
    pool: PgPool,
}

impl PgVectorIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorIndex for PgVectorIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<(), VectorIndexError> {
        let vector = normalized(vector)?;
        sqlx::query(
            r#"
            INSERT INTO resume_embeddings (id, resume_id, user_id, embedding)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                resume_id = EXCLUDED.resume_id,
                user_id = EXCLUDED.user_id,
                embedding = EXCLUDED.embedding,
                updated_at = now()
            "#,
        )
        .bind(id)
        .bind(metadata.resume_id)
        .bind(metadata.user_id)
        .bind(Vector::from(vector))
        .execute(&self.pool)
        .await?;
        debug!("Upserted embedding {id}");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, VectorIndexError> {
        let result = sqlx::query("DELETE FROM resume_embeddings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorIndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query = normalized(query.to_vec())?;
        let dimensions = query.len() as i32;

        let rows: Vec<HitRow> = sqlx::query_as(
            r#"
            SELECT id, resume_id, user_id, embedding <=> $1 AS distance
            FROM resume_embeddings
            WHERE vector_dims(embedding) = $2
            ORDER BY embedding <=> $1, id
            LIMIT $3
            "#,
        )
        .bind(Vector::from(query))
        .bind(dimensions)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self) -> Result<usize, VectorIndexError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM resume_embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn normalized(mut vector: Vec<f32>) -> Result<Vec<f32>, VectorIndexError> {
    if vector.is_empty() {
        return Err(VectorIndexError::InvalidVector("empty vector".to_string()));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(VectorIndexError::InvalidVector(
            "vector contains NaN or infinity".to_string(),
        ));
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return Err(VectorIndexError::InvalidVector("zero-length vector".to_string()));
    }
    vector.iter_mut().for_each(|v| *v /= norm);
    Ok(vector)
}
