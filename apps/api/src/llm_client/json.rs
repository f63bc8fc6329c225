//! Recovery of a JSON object from free-form model output.
//!
//! Models wrap JSON in prose or code fences, or stop mid-answer. Recovery runs as a
//! two-state parser: `Scanning` locates the outermost `{ ... }` span, `Parsing`
//! decodes exactly that span. Each state has its own failure, so callers can tell
//! "the model returned no JSON" apart from "the model returned broken JSON".

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonRecoveryError {
    #[error("no JSON object found in model output")]
    NoJsonFound,

    #[error("malformed JSON in model output: {0}")]
    MalformedJson(#[source] serde_json::Error),
}

#[derive(Debug)]
enum RecoveryState<'a> {
    Scanning(&'a str),
    Parsing(&'a str),
}

impl<'a> RecoveryState<'a> {
    fn step(self) -> Result<Step<'a>, JsonRecoveryError> {
        match self {
            RecoveryState::Scanning(text) => {
                let span = match (text.find('{'), text.rfind('}')) {
                    (Some(start), Some(end)) if start < end => &text[start..=end],
                    _ => return Err(JsonRecoveryError::NoJsonFound),
                };
                Ok(Step::Next(RecoveryState::Parsing(span)))
            }
            RecoveryState::Parsing(span) => serde_json::from_str::<Map<String, Value>>(span)
                .map(Step::Done)
                .map_err(JsonRecoveryError::MalformedJson),
        }
    }
}

enum Step<'a> {
    Next(RecoveryState<'a>),
    Done(Map<String, Value>),
}

/// Recovers the JSON object embedded in `raw` (first `{` through last `}`).
pub fn recover_object(raw: &str) -> Result<Map<String, Value>, JsonRecoveryError> {
    let mut state = RecoveryState::Scanning(raw);
    loop {
        match state.step()? {
            Step::Next(next) => state = next,
            Step::Done(object) => return Ok(object),
        }
    }
}
