//! LLM Scorer/Ranker.
//!
//! Each shortlisted resume is scored independently against the job description.
//! Calls run with bounded concurrency, a failing item becomes a `ScoringFailure`
//! without affecting its siblings, and ranking is a pure function over the
//! collected entries.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::prompts::{render, PIPELINE_TEMPERATURE};
use crate::llm_client::{generate_json, LlmError, TextGenerator};
use crate::matching::document::merge_record;
use crate::matching::prompts::{
    RECRUITER_SCORE_PROMPT, RECRUITER_SCORE_SYSTEM, SELF_SCORE_PROMPT, SELF_SCORE_SYSTEM,
};
use crate::models::resume::ResumeRecord;

/// Summary text the recruiter prompt asks for when a resume does not fit.
pub const NO_MATCH_SENTINEL: &str = "no resume found";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Empty or invalid resume content")]
    EmptyResumeContent,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// One resume's recruiter verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub resume_id: i64,
    pub match_score: u8,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_match: Option<bool>,
}

impl ScoreResult {
    /// Whether the model itself judged the resume a non-match.
    pub fn flagged_no_match(&self) -> bool {
        self.is_match == Some(false)
            || self.summary.to_lowercase().contains(NO_MATCH_SENTINEL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringFailure {
    pub resume_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreEntry {
    Scored(ScoreResult),
    Failed(ScoringFailure),
}

/// Retained results, best first, plus every per-item failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub ranked: Vec<ScoreResult>,
    pub failures: Vec<ScoringFailure>,
}

impl Ranking {
    pub fn best_match_score(&self) -> Option<u8> {
        self.ranked.first().map(|r| r.match_score)
    }
}

/// Keeps results scoring at least `threshold` that the model did not flag as a
/// non-match, then sorts by score descending. The sort is stable, so ties keep
/// their shortlist order.
pub fn rank(entries: Vec<ScoreEntry>, threshold: u8) -> Ranking {
    let mut ranking = Ranking::default();
    for entry in entries {
        match entry {
            ScoreEntry::Scored(result) => {
                if result.match_score < threshold {
                    debug!(
                        "Resume {} below threshold ({} < {threshold})",
                        result.resume_id, result.match_score
                    );
                } else if result.flagged_no_match() {
                    debug!("Resume {} flagged as no match by the model", result.resume_id);
                } else {
                    ranking.ranked.push(result);
                }
            }
            ScoreEntry::Failed(failure) => ranking.failures.push(failure),
        }
    }
    ranking
        .ranked
        .sort_by(|a, b| b.match_score.cmp(&a.match_score));
    ranking
}

/// Candidate feedback for a resume's owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelfScoreResult {
    pub resume_id: i64,
    pub match_keywords: Vec<String>,
    pub missing_skills: Vec<String>,
    pub match_score: u8,
    pub suggestions: String,
}

#[derive(Debug, Deserialize)]
struct RecruiterVerdict {
    #[serde(deserialize_with = "score_0_to_100")]
    match_score: u8,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    is_match: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SelfVerdict {
    #[serde(default)]
    match_keywords: Vec<String>,
    #[serde(default)]
    missing_skills: Vec<String>,
    #[serde(deserialize_with = "score_0_to_100")]
    match_score: u8,
    #[serde(default, deserialize_with = "text_or_lines")]
    suggestions: String,
}

/// Accepts integers, floats (rounded) and numeric strings such as `"85"` or
/// `"85%"`, clamped to 0..=100.
fn score_0_to_100<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let score = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .ok_or_else(|| de::Error::custom(format!("match_score is not a number: {value}")))?;
    Ok(score.round().clamp(0.0, 100.0) as u8)
}

/// Suggestions come back either as one string or as a list of lines.
fn text_or_lines<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Array(items) => Ok(items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")),
        other => Err(de::Error::custom(format!(
            "suggestions must be text, got {other}"
        ))),
    }
}

/// Scores resumes against a job description through the `TextGenerator` seam.
#[derive(Clone)]
pub struct CandidateScorer {
    generator: Arc<dyn TextGenerator>,
    concurrency: usize,
}

impl CandidateScorer {
    pub fn new(generator: Arc<dyn TextGenerator>, concurrency: usize) -> Self {
        Self {
            generator,
            concurrency: concurrency.max(1),
        }
    }

    /// Recruiter-view score for one persisted resume.
    pub async fn score_candidate(
        &self,
        job_description: &str,
        record: &ResumeRecord,
    ) -> Result<ScoreResult, ScoringError> {
        let document = merge_record(record).ok_or(ScoringError::EmptyResumeContent)?;
        let prompt = render(
            RECRUITER_SCORE_PROMPT,
            &[
                ("job_description", job_description),
                ("resume_text", &document.text),
            ],
        );

        let verdict: RecruiterVerdict = generate_json(
            self.generator.as_ref(),
            &prompt,
            RECRUITER_SCORE_SYSTEM,
            PIPELINE_TEMPERATURE,
        )
        .await?;

        Ok(ScoreResult {
            resume_id: record.id,
            match_score: verdict.match_score,
            summary: verdict.summary,
            is_match: verdict.is_match,
        })
    }

    /// Scores every record with at most `concurrency` calls in flight.
    /// Entries come back in the order of `records`, whatever order the calls finish in.
    pub async fn score_batch(&self, job_description: &str, records: &[ResumeRecord]) -> Vec<ScoreEntry> {
        // Collected first: mapping over borrowed records inside the stream breaks
        // the Send bound on the handler future.
        let calls: Vec<_> = records
            .iter()
            .map(|record| async move {
                match self.score_candidate(job_description, record).await {
                    Ok(result) => ScoreEntry::Scored(result),
                    Err(e) => {
                        warn!("Error scoring resume {}: {e}", record.id);
                        ScoreEntry::Failed(ScoringFailure {
                            resume_id: record.id,
                            error: e.to_string(),
                        })
                    }
                }
            })
            .collect();

        stream::iter(calls)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Candidate-view feedback on the owner's own resume.
    pub async fn score_self(
        &self,
        job_description: &str,
        record: &ResumeRecord,
    ) -> Result<SelfScoreResult, ScoringError> {
        let document = merge_record(record).ok_or(ScoringError::EmptyResumeContent)?;
        let prompt = render(
            SELF_SCORE_PROMPT,
            &[
                ("job_description", job_description),
                ("resume_text", &document.text),
            ],
        );

        let verdict: SelfVerdict = generate_json(
            self.generator.as_ref(),
            &prompt,
            SELF_SCORE_SYSTEM,
            PIPELINE_TEMPERATURE,
        )
        .await?;

        Ok(SelfScoreResult {
            resume_id: record.id,
            match_keywords: verdict.match_keywords,
            missing_skills: verdict.missing_skills,
            match_score: verdict.match_score,
            suggestions: verdict.suggestions,
        })
    }
}
