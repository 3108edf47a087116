//! Recovery of a JSON object from model output
//!
//! Models wrap JSON in prose and code fences more often than not. The
//! strategies run in order and the first one yielding an object wins:
//! strict parse, first fenced block, then the span from the first `{` to the
//! last `}`.

use serde_json::{Map, Value};

/// Which strategy recovered the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSource {
    Strict,
    FencedBlock,
    BraceSpan,
}

/// Parses the first JSON object recoverable from `text`
pub fn parse_json_object(text: &str) -> Option<(Map<String, Value>, JsonSource)> {
    let trimmed = text.trim();

    if let Some(object) = parse_object(trimmed) {
        return Some((object, JsonSource::Strict));
    }

    if let Some(object) = fenced_block(trimmed).and_then(parse_object) {
        return Some((object, JsonSource::FencedBlock));
    }

    brace_span(trimmed)
        .and_then(parse_object)
        .map(|object| (object, JsonSource::BraceSpan))
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Contents of the first ``` fenced block, skipping a language tag
pub fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = start + 3;
    let content_start = text[after_fence..]
        .find('\n')
        .map(|i| after_fence + i + 1)
        .unwrap_or(after_fence);
    let end = text[content_start..].find("```")?;
    Some(text[content_start..content_start + end].trim())
}

/// Substring from the first `{` to the last `}`
pub fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
