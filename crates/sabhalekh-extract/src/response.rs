//! Model-response sanitation and defensive JSON parsing.
//!
//! Responses arrive with code fences, reasoning preambles, or prose wrapped
//! around the payload. Parsing tries the sanitized text directly, then falls
//! back to the outermost brace/bracket-delimited substring. A response that
//! survives parsing but has the wrong container shape is rejected the same
//! way as unparseable text: the chunk yields nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Expected JSON container of a model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// List extraction: members, resolutions.
    Array,
    /// Single-record extraction: index summary, debate fields.
    Object,
}

static OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static ARRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Strip reasoning preamble (everything before a closing `</think>`) and
/// markdown code fences.
pub fn sanitize(raw: &str) -> String {
    let mut content = raw.trim();
    if let Some(idx) = content.find("</think>") {
        content = content[idx + "</think>".len()..].trim_start();
    }
    content.replace("```json", "").replace("```", "").trim().to_string()
}

fn shape_matches(value: &Value, shape: Shape) -> bool {
    match shape {
        Shape::Array => value.is_array(),
        Shape::Object => value.is_object(),
    }
}

/// Parse a model response into the expected container. `None` when nothing
/// usable can be recovered; the caller treats that as an empty chunk.
pub fn parse_payload(raw: &str, shape: Shape) -> Option<Value> {
    let content = sanitize(raw);
    if content.is_empty() {
        tracing::debug!("model response empty after sanitation");
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(&content) {
        if shape_matches(&value, shape) {
            return Some(value);
        }
        tracing::warn!(?shape, "model response parsed but has wrong container shape");
        return None;
    }

    // Fallback: outermost delimited substring.
    let re = match shape {
        Shape::Object => &OBJECT_RE,
        Shape::Array => &ARRAY_RE,
    };
    let candidate = re.find(&content)?.as_str();
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if shape_matches(&value, shape) => Some(value),
        Ok(_) => {
            tracing::warn!(?shape, "extracted JSON has wrong container shape");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, snippet = truncate(&content), "could not parse model response");
            None
        }
    }
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(200) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_empty_array_parses_to_empty() {
        let value = parse_payload("```json\n[]\n```", Shape::Array).unwrap();
        assert_eq!(value, serde_json::json!([]));
    }

    #[test]
    fn reasoning_preamble_is_cut() {
        let raw = "<think>देखते हैं</think>\n[{\"name\": \"श्री. पवार\"}]";
        let value = parse_payload(raw, Shape::Array).unwrap();
        assert_eq!(value[0]["name"], "श्री. पवार");
    }

    #[test]
    fn json_embedded_in_prose_is_recovered() {
        let raw = "Here is the extraction you asked for: {\"date\": \"१३ मार्च २०००\"} hope it helps";
        let value = parse_payload(raw, Shape::Object).unwrap();
        assert_eq!(value["date"], "१३ मार्च २०००");
    }

    #[test]
    fn wrong_container_is_rejected() {
        assert!(parse_payload("{\"a\": 1}", Shape::Array).is_none());
        assert!(parse_payload("[1, 2]", Shape::Object).is_none());
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_payload("no json here at all", Shape::Array).is_none());
        assert!(parse_payload("", Shape::Object).is_none());
    }

    #[test]
    fn nested_object_survives_fallback_extraction() {
        let raw = "prefix {\"members\": [{\"name\": \"अ\"}], \"khand\": \"२\"} suffix";
        let value = parse_payload(raw, Shape::Object).unwrap();
        assert_eq!(value["members"][0]["name"], "अ");
    }
}
