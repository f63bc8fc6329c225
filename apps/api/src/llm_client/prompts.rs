// Shared prompt constants.
// Each module that needs LLM calls defines its own prompts.rs alongside it.

/// Low randomness for extraction and scoring so repeated runs agree.
pub const PIPELINE_TEMPERATURE: f32 = 0.3;

/// Fills `{name}` placeholders in one left-to-right pass. Substituted values are
/// never scanned again, so user text containing `{resume_text}` stays literal.
/// Braces that do not form a known placeholder are copied through unchanged.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let hit = vars.iter().find_map(|(name, value)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*name))
                .and_then(|t| t.strip_prefix('}'))
                .map(|after| (*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
