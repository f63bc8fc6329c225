//! Structured-Data Extractor: resume text in, validated `ExtractedResume` out.

use serde_json::Value;
use tracing::{debug, error};

use crate::extraction::prompts::{RESUME_EXTRACT_PROMPT, RESUME_EXTRACT_SYSTEM};
use crate::extraction::ExtractionError;
use crate::llm_client::json::{recover_object, JsonRecoveryError};
use crate::llm_client::prompts::{render, PIPELINE_TEMPERATURE};
use crate::llm_client::TextGenerator;
use crate::models::resume::ExtractedResume;

/// Top-level keys every extraction must carry, even when empty.
pub const REQUIRED_KEYS: [&str; 5] = ["name", "skills", "experience", "projects", "education"];

/// Sends the resume text to the model and validates what comes back.
/// No retry happens here; transport retries live in the LLM client.
pub async fn extract_resume(
    resume_text: &str,
    generator: &dyn TextGenerator,
) -> Result<ExtractedResume, ExtractionError> {
    let prompt = render(RESUME_EXTRACT_PROMPT, &[("resume_text", resume_text)]);
    let raw = generator
        .generate(&prompt, RESUME_EXTRACT_SYSTEM, PIPELINE_TEMPERATURE)
        .await
        .map_err(|e| ExtractionError::from_llm("structured extraction", e))?;

    debug!("Raw extraction response: {} chars", raw.len());

    parse_extraction(&raw).inspect_err(|e| {
        error!("Error processing LLM response: {e}");
        if let Some(raw) = e.raw_response() {
            error!("Response content: {raw}");
        }
    })
}

/// Recovers the JSON object from `raw`, checks the required keys, then decodes it.
pub fn parse_extraction(raw: &str) -> Result<ExtractedResume, ExtractionError> {
    let object = recover_object(raw).map_err(|e| match e {
        JsonRecoveryError::NoJsonFound => ExtractionError::NoJsonFound {
            raw: raw.to_string(),
        },
        JsonRecoveryError::MalformedJson(source) => ExtractionError::MalformedJson {
            source,
            raw: raw.to_string(),
        },
    })?;

    let missing: Vec<&'static str> = REQUIRED_KEYS
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::IncompleteExtraction {
            missing,
            raw: raw.to_string(),
        });
    }

    serde_json::from_value(Value::Object(object)).map_err(|source| ExtractionError::MalformedJson {
        source,
        raw: raw.to_string(),
    })
}
