//! Resume record store. The relational schema lives in `migrations/`; everything
//! else in the crate sees records only through the `ResumeStore` trait.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::resume::{EducationItem, ExperienceItem, NewResume, ProjectItem, ResumeRecord};

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn insert(&self, resume: NewResume) -> Result<ResumeRecord>;
    async fn get(&self, id: i64) -> Result<Option<ResumeRecord>>;
    /// Records for `ids`, in no particular order. Unknown ids are skipped.
    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<ResumeRecord>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRecord>>;
    /// Returns `false` when no record had that id.
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[derive(Debug, FromRow)]
struct ResumeRow {
    id: i64,
    user_id: Uuid,
    file_name: String,
    candidate_name: String,
    skills: Json<Vec<String>>,
    experience: Json<Vec<ExperienceItem>>,
    projects: Json<Vec<ProjectItem>>,
    education: Json<Vec<EducationItem>>,
    created_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeRecord {
    fn from(row: ResumeRow) -> Self {
        ResumeRecord {
            id: row.id,
            user_id: row.user_id,
            file_name: row.file_name,
            candidate_name: row.candidate_name,
            skills: row.skills.0,
            experience: row.experience.0,
            projects: row.projects.0,
            education: row.education.0,
            created_at: row.created_at,
        }
    }
}

/// Postgres-backed store over the `resumes` table.
#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn insert(&self, resume: NewResume) -> Result<ResumeRecord> {
        let NewResume {
            user_id,
            file_name,
            extracted,
        } = resume;

        let row: ResumeRow = sqlx::query_as(
            r#"
            INSERT INTO resumes
                (user_id, file_name, candidate_name, skills, experience, projects, education)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(file_name)
        .bind(extracted.name)
        .bind(Json(extracted.skills))
        .bind(Json(extracted.experience))
        .bind(Json(extracted.projects))
        .bind(Json(extracted.education))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get(&self, id: i64) -> Result<Option<ResumeRecord>> {
        let row: Option<ResumeRow> = sqlx::query_as("SELECT * FROM resumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<ResumeRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ResumeRow> = sqlx::query_as("SELECT * FROM resumes WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRecord>> {
        let rows: Vec<ResumeRow> =
            sqlx::query_as("SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at, id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-memory store for tests.
#[cfg(test)]
pub mod memory {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryResumeStore {
        next_id: AtomicI64,
        records: Mutex<BTreeMap<i64, ResumeRecord>>,
    }

    impl MemoryResumeStore {
        pub async fn put(&self, record: ResumeRecord) {
            self.records.lock().await.insert(record.id, record);
        }

        pub async fn len(&self) -> usize {
            self.records.lock().await.len()
        }
    }

    #[async_trait]
    impl ResumeStore for MemoryResumeStore {
        async fn insert(&self, resume: NewResume) -> Result<ResumeRecord> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let record = ResumeRecord {
                id,
                user_id: resume.user_id,
                file_name: resume.file_name,
                candidate_name: resume.extracted.name,
                skills: resume.extracted.skills,
                experience: resume.extracted.experience,
                projects: resume.extracted.projects,
                education: resume.extracted.education,
                created_at: Utc::now(),
            };
            self.put(record.clone()).await;
            Ok(record)
        }

        async fn get(&self, id: i64) -> Result<Option<ResumeRecord>> {
            Ok(self.records.lock().await.get(&id).cloned())
        }

        async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<ResumeRecord>> {
            let records = self.records.lock().await;
            // Reversed: callers must not rely on store ordering.
            Ok(ids
                .iter()
                .rev()
                .filter_map(|id| records.get(id).cloned())
                .collect())
        }

        async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRecord>> {
            Ok(self
                .records
                .lock()
                .await
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn delete(&self, id: i64) -> Result<bool> {
            Ok(self.records.lock().await.remove(&id).is_some())
        }
    }
}
