//! Recruiter ranking flow: shortlist by embedding, score the shortlist, rank.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::matching::indexer::ResumeIndexer;
use crate::matching::scoring::{rank, CandidateScorer, ScoringFailure};
use crate::models::resume::ResumeRecord;
use crate::store::ResumeStore;

pub const DEFAULT_THRESHOLD: u8 = 70;

const NO_SHORTLIST: &str = "No relevant resumes found using vector similarity.";
const NO_RECORDS: &str = "No resumes found in the database.";
const NOTHING_QUALIFIED: &str = "No resumes matched the job description well enough.";

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub job_description: String,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    /// Shortlist size; falls back to the configured `SHORTLIST_SIZE`.
    pub top_k: Option<usize>,
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Serialize)]
pub struct RankedResume {
    pub resume_data: ResumeRecord,
    pub match_score: u8,
    pub summary: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MatchOutcome {
    Matched {
        top_resumes: Vec<RankedResume>,
        best_match_score: u8,
        failures: Vec<ScoringFailure>,
    },
    NoMatch {
        error: &'static str,
        failures: Vec<ScoringFailure>,
    },
}

impl MatchOutcome {
    fn no_match(error: &'static str, failures: Vec<ScoringFailure>) -> Self {
        MatchOutcome::NoMatch { error, failures }
    }
}

pub async fn rank_candidates(
    job_description: &str,
    threshold: u8,
    top_k: usize,
    indexer: &ResumeIndexer,
    store: &dyn ResumeStore,
    scorer: &CandidateScorer,
) -> Result<MatchOutcome, AppError> {
    let shortlist = indexer.shortlist(job_description, top_k).await?;
    if shortlist.is_empty() {
        return Ok(MatchOutcome::no_match(NO_SHORTLIST, Vec::new()));
    }

    let records = in_shortlist_order(&shortlist, store.list_by_ids(&shortlist).await?);
    if records.is_empty() {
        return Ok(MatchOutcome::no_match(NO_RECORDS, Vec::new()));
    }

    let entries = scorer.score_batch(job_description, &records).await;
    let ranking = rank(entries, threshold);
    info!(
        "Scored {} shortlisted resumes: {} retained, {} failed",
        records.len(),
        ranking.ranked.len(),
        ranking.failures.len()
    );

    let Some(best_match_score) = ranking.best_match_score() else {
        return Ok(MatchOutcome::no_match(NOTHING_QUALIFIED, ranking.failures));
    };

    let mut by_id: HashMap<i64, ResumeRecord> = records.into_iter().map(|r| (r.id, r)).collect();
    let top_resumes = ranking
        .ranked
        .into_iter()
        .filter_map(|result| {
            by_id.remove(&result.resume_id).map(|resume_data| RankedResume {
                resume_data,
                match_score: result.match_score,
                summary: result.summary,
            })
        })
        .collect();

    Ok(MatchOutcome::Matched {
        top_resumes,
        best_match_score,
        failures: ranking.failures,
    })
}

/// Reorders `records` to follow `shortlist`; ids the store no longer has are dropped.
fn in_shortlist_order(shortlist: &[i64], records: Vec<ResumeRecord>) -> Vec<ResumeRecord> {
    let mut by_id: HashMap<i64, ResumeRecord> = records.into_iter().map(|r| (r.id, r)).collect();
    shortlist
        .iter()
        .filter_map(|id| {
            let record = by_id.remove(id);
            if record.is_none() {
                warn!("Shortlisted resume {id} has no record; skipping");
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::llm_client::{LlmError, TextGenerator};
    use crate::matching::document::merge_record;
    use crate::matching::embedder::fake::HashingEmbedder;
    use crate::matching::index::memory::MemoryVectorIndex;
    use crate::store::memory::MemoryResumeStore;

    /// Scores a resume by the first `score:<n>` skill found in the prompt.
    struct SkillScoreGenerator;

    #[async_trait]
    impl TextGenerator for SkillScoreGenerator {
        async fn generate(&self, prompt: &str, _: &str, _: f32) -> Result<String, LlmError> {
            let score = prompt
                .split(|c: char| c.is_whitespace() || c == ',')
                .find_map(|token| token.strip_prefix("score:"))
                .ok_or(LlmError::EmptyContent)?;
            Ok(format!(r#"{{"match_score": {score}, "summary": "scored {score}"}}"#))
        }
    }

    struct Fixture {
        indexer: ResumeIndexer,
        store: MemoryResumeStore,
        scorer: CandidateScorer,
    }

    fn fixture() -> Fixture {
        Fixture {
            indexer: ResumeIndexer::new(
                Arc::new(HashingEmbedder::default()),
                Arc::new(MemoryVectorIndex::default()),
            ),
            store: MemoryResumeStore::default(),
            scorer: CandidateScorer::new(Arc::new(SkillScoreGenerator), 3),
        }
    }

    fn record(id: i64, skills: &[&str]) -> ResumeRecord {
        ResumeRecord {
            id,
            user_id: Uuid::new_v4(),
            file_name: format!("{id}.pdf"),
            candidate_name: format!("Candidate {id}"),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience: vec![],
            projects: vec![],
            education: vec![],
            created_at: Utc::now(),
        }
    }

    impl Fixture {
        async fn add(&self, record: ResumeRecord, store_record: bool) {
            self.indexer
                .upsert(&merge_record(&record).unwrap())
                .await
                .unwrap();
            if store_record {
                self.store.put(record).await;
            }
        }

        async fn rank(&self, threshold: u8) -> MatchOutcome {
            rank_candidates(
                "Rust backend engineer",
                threshold,
                100,
                &self.indexer,
                &self.store,
                &self.scorer,
            )
            .await
            .unwrap()
        }
    }

    #[tokio::test]
    async fn test_empty_index_is_no_match() {
        let f = fixture();
        match f.rank(70).await {
            MatchOutcome::NoMatch { error, failures } => {
                assert_eq!(error, NO_SHORTLIST);
                assert!(failures.is_empty());
            }
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ranks_retained_resumes_best_first() {
        let f = fixture();
        f.add(record(1, &["Rust", "score:60"]), true).await;
        f.add(record(2, &["Rust", "score:90"]), true).await;
        f.add(record(3, &["Rust", "score:75"]), true).await;

        match f.rank(70).await {
            MatchOutcome::Matched {
                top_resumes,
                best_match_score,
                failures,
            } => {
                let ids: Vec<i64> = top_resumes.iter().map(|r| r.resume_data.id).collect();
                assert_eq!(ids, vec![2, 3]);
                assert_eq!(best_match_score, 90);
                assert_eq!(top_resumes[0].summary, "scored 90");
                assert!(failures.is_empty());
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nothing_above_threshold_reports_failures() {
        let f = fixture();
        f.add(record(1, &["Rust", "score:40"]), true).await;
        f.add(record(2, &["Rust", "unscored"]), true).await;

        match f.rank(70).await {
            MatchOutcome::NoMatch { error, failures } => {
                assert_eq!(error, NOTHING_QUALIFIED);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].resume_id, 2);
            }
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_indexed_resume_without_record_is_skipped() {
        let f = fixture();
        f.add(record(1, &["Rust", "score:80"]), false).await;
        f.add(record(2, &["Rust", "score:85"]), true).await;

        match f.rank(70).await {
            MatchOutcome::Matched { top_resumes, .. } => {
                assert_eq!(top_resumes.len(), 1);
                assert_eq!(top_resumes[0].resume_data.id, 2);
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_only_orphaned_embeddings_is_no_records() {
        let f = fixture();
        f.add(record(1, &["Rust", "score:80"]), false).await;

        match f.rank(70).await {
            MatchOutcome::NoMatch { error, .. } => assert_eq!(error, NO_RECORDS),
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[test]
    fn test_records_follow_shortlist_order() {
        let records = vec![record(3, &["a"]), record(1, &["b"]), record(2, &["c"])];
        let ordered = in_shortlist_order(&[2, 9, 3, 1], records);
        let ids: Vec<i64> = ordered.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_request_defaults_threshold() {
        let request: MatchRequest =
            serde_json::from_str(r#"{"job_description": "Rust engineer"}"#).unwrap();
        assert_eq!(request.threshold, DEFAULT_THRESHOLD);
        assert_eq!(request.top_k, None);
    }
}
