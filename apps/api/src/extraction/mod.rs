// Resume intake: document loading, contact scan, LLM structured extraction and
// the upload pipeline that ties them to the record store and embedding index.
// All LLM calls go through llm_client::TextGenerator.

use std::time::Duration;

use thiserror::Error;

use crate::llm_client::LlmError;

pub mod contact;
pub mod handlers;
pub mod ingest;
pub mod loader;
pub mod prompts;
pub mod structured;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type '{0}'. Please upload a PDF or DOCX file.")]
    UnsupportedFormat(String),

    #[error("Failed to load document: {0}")]
    DocumentLoadFailure(String),

    #[error("No JSON found in model response")]
    NoJsonFound { raw: String },

    #[error("Malformed JSON in model response: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("Model response is missing required fields: {}", .missing.join(", "))]
    IncompleteExtraction { missing: Vec<&'static str>, raw: String },

    #[error("Empty or invalid resume content")]
    EmptyResumeContent,

    #[error("{stage} timed out after {}ms", .after.as_millis())]
    UpstreamTimeout {
        stage: &'static str,
        after: Duration,
    },

    #[error("{stage} was rate limited upstream")]
    UpstreamRateLimited { stage: &'static str },

    #[error("LLM error: {0}")]
    Llm(LlmError),
}

impl ExtractionError {
    /// Raw model output behind a post-processing failure, for diagnosis.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ExtractionError::NoJsonFound { raw }
            | ExtractionError::MalformedJson { raw, .. }
            | ExtractionError::IncompleteExtraction { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub(crate) fn from_llm(stage: &'static str, error: LlmError) -> Self {
        match error {
            LlmError::Timeout { after } => ExtractionError::UpstreamTimeout { stage, after },
            LlmError::RateLimited { .. } => ExtractionError::UpstreamRateLimited { stage },
            other => ExtractionError::Llm(other),
        }
    }
}
