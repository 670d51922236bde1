// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Closing instruction appended to every prompt that expects a JSON object back.
pub const JSON_ONLY_INSTRUCTION: &str =
    "Return ONLY valid JSON. No markdown, no explanations, no text outside the JSON object.";

/// Fills `{name}` placeholders in a single pass over the template.
///
/// Values are inserted verbatim and never rescanned, so a résumé that happens to
/// contain `{job_description}` is left alone. Braces that are not a known
/// placeholder (the JSON schemas in templates) are copied through.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let matched = values.iter().find_map(|(name, value)| {
            let inner = tail.strip_prefix('{')?.strip_prefix(*name)?;
            inner.starts_with('}').then_some((name.len() + 2, *value))
        });

        match matched {
            Some((consumed, value)) => {
                out.push_str(value);
                rest = &tail[consumed..];
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
