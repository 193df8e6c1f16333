//! Post-processing: turn a raw LLM reply into a JSON value.
//!
//! Even when asked for JSON-only output, models occasionally wrap the object
//! in a ```json fence, prefix it with a sentence ("Here is your quiz:"), or
//! leak a byte-order mark. These cheap, deterministic rules strip that
//! packaging. They never *repair* JSON: if the object itself is malformed the
//! reply is rejected with the parser's message.
//!
//! ## Rule Order
//!
//! 1. Remove invisible Unicode (BOM, zero-width spaces)
//! 2. Strip an outer Markdown code fence
//! 3. Parse the whole remainder as JSON
//! 4. Otherwise parse the span from the first `{` to the last `}`

use crate::error::PraxisError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Extract the JSON object carried by an LLM reply.
///
/// A top-level array or scalar is accepted only if the whole reply parses;
/// the brace-span fallback exists for objects wrapped in prose.
pub fn extract_json(raw: &str) -> Result<Value, PraxisError> {
    let cleaned = remove_invisible_chars(raw);
    let body = strip_code_fences(cleaned.trim());
    let body = body.trim();

    if body.is_empty() {
        return Err(PraxisError::InvalidAiResponse {
            detail: "The AI response was empty.".to_string(),
        });
    }

    let whole_err = match serde_json::from_str::<Value>(body) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    match object_span(body) {
        Some(span) if span.len() < body.len() => {
            serde_json::from_str::<Value>(span).map_err(|e| PraxisError::InvalidAiResponse {
                detail: e.to_string(),
            })
        }
        Some(_) => Err(PraxisError::InvalidAiResponse {
            detail: whole_err.to_string(),
        }),
        None => Err(PraxisError::InvalidAiResponse {
            detail: format!("No JSON object found in the AI response ({whole_err})"),
        }),
    }
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => input,
    }
}

// ── Rule 4: First `{` to last `}` ────────────────────────────────────────────

fn object_span(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&input[start..=end])
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let v = extract_json(r#"{"quiz": []}"#).unwrap();
        assert_eq!(v, json!({ "quiz": [] }));
    }

    #[test]
    fn test_strip_json_fence() {
        let v = extract_json("```json\n{\"slide_topics\": [\"A\"]}\n```").unwrap();
        assert_eq!(v["slide_topics"][0], "A");
    }

    #[test]
    fn test_strip_bare_fence() {
        let v = extract_json("```\n{\"a\": 1}\n```\n").unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let raw = "Sure! Here is the quiz you asked for:\n{\"quiz\": [{\"question\": \"Q\"}]}\nGood luck!";
        let v = extract_json(raw).unwrap();
        assert_eq!(v["quiz"][0]["question"], "Q");
    }

    #[test]
    fn test_bom_is_ignored() {
        let v = extract_json("\u{FEFF}{\"emoji\": \"🎉\"}").unwrap();
        assert_eq!(v["emoji"], "🎉");
    }

    #[test]
    fn test_not_json_is_rejected_with_parser_message() {
        let err = extract_json("I cannot help with that.").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Failed to process AI response"), "got: {msg}");
        assert!(msg.contains("No JSON object found"), "got: {msg}");
        assert!(msg.contains("expected"), "got: {msg}");
    }

    #[test]
    fn test_malformed_object_is_not_repaired() {
        let err = extract_json(r#"{"quiz": [ {"question": "Q",  }"#).unwrap_err();
        assert!(matches!(err, PraxisError::InvalidAiResponse { .. }));
    }

    #[test]
    fn test_empty_reply() {
        let err = extract_json("   \n").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_reversed_braces_have_no_span() {
        assert_eq!(object_span("} nothing {"), None);
        assert_eq!(object_span("x {\"a\":1} y"), Some("{\"a\":1}"));
    }
}
