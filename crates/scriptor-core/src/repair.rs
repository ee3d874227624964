//! Two-stage parsing of backend output into a [`QueryResponse`].
//!
//! Stage one parses the trimmed text as-is. Stage two strips Markdown code
//! fences, keeps the span from the first `{` to the last `}` inclusive and
//! parses once more. The repair cannot recover output containing several JSON
//! objects, braces inside surrounding commentary, or truncated JSON; those
//! still fail and are reported by the caller.

use crate::types::QueryResponse;

/// Parse raw backend text, repairing it once if the direct parse fails.
///
/// # Errors
///
/// Returns the parse error of the repaired text when both stages fail,
/// including valid JSON whose shape does not match [`QueryResponse`].
pub fn parse_response(raw: &str) -> Result<QueryResponse, serde_json::Error> {
    let text = raw.trim();
    match serde_json::from_str(text) {
        Ok(response) => Ok(response),
        Err(direct) => {
            let repaired = strip_to_json(text);
            if repaired == text {
                return Err(direct);
            }
            tracing::debug!("direct JSON parse failed ({direct}), retrying on repaired text");
            serde_json::from_str(repaired)
        }
    }
}

/// Strip code fences and surrounding commentary, keeping the outermost braces.
///
/// Returns the (trimmed) input unchanged when it holds no `{ ... }` span.
#[must_use]
pub fn strip_to_json(text: &str) -> &str {
    let mut s = text.trim();
    if s.contains("```") {
        s = strip_fences(s);
    }
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if end > start => &s[start..=end],
        _ => s,
    }
}

fn strip_fences(s: &str) -> &str {
    let mut s = s;
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim_end();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_parses_directly() {
        let r = parse_response(r#"{"answer": "x", "references": ["a, chunk 1"]}"#).unwrap();
        assert_eq!(r.answer, "x");
        assert_eq!(r.references, ["a, chunk 1"]);
    }

    #[test]
    fn fenced_json_is_repaired() {
        let raw = "```json\n{\"answer\": \"x\", \"references\": []}\n```";
        let r = parse_response(raw).unwrap();
        assert_eq!(r, QueryResponse::new("x", vec![]));
    }

    #[test]
    fn fence_without_language_tag() {
        let raw = "```\n{\"answer\": \"y\", \"references\": []}\n```";
        assert_eq!(parse_response(raw).unwrap().answer, "y");
    }

    #[test]
    fn leading_and_trailing_commentary() {
        let raw = "Sure! Here is the JSON:\n{\"answer\": \"z\", \"references\": [\"p, chunk 2\"]}\nHope that helps.";
        let r = parse_response(raw).unwrap();
        assert_eq!(r.answer, "z");
        assert_eq!(r.references, ["p, chunk 2"]);
    }

    #[test]
    fn refusal_text_fails() {
        assert!(parse_response("I cannot comply.").is_err());
    }

    #[test]
    fn missing_field_fails() {
        let err = parse_response(r#"{"answer": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("references"));
    }

    #[test]
    fn mistyped_field_fails() {
        assert!(parse_response(r#"{"answer": 3, "references": []}"#).is_err());
        assert!(parse_response(r#"{"answer": "x", "references": "a"}"#).is_err());
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let r = parse_response(r#"{"answer": "x", "references": [], "confidence": 0.9}"#).unwrap();
        assert_eq!(r.answer, "x");
    }

    #[test]
    fn truncated_json_fails() {
        assert!(parse_response("```json\n{\"answer\": \"x\", \"refer").is_err());
    }

    #[test]
    fn strip_to_json_without_braces_is_identity() {
        assert_eq!(strip_to_json("  no json here "), "no json here");
    }

    #[test]
    fn strip_to_json_reversed_braces_is_identity() {
        assert_eq!(strip_to_json("} {"), "} {");
    }

    mod proptest_repair {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn commentary_around_json_is_recovered(
                prefix in "[^{}]{0,40}",
                suffix in "[^{}]{0,40}",
                answer in "\\PC{0,60}",
                references in proptest::collection::vec("\\PC{0,20}", 0..4),
            ) {
                let expected = QueryResponse::new(answer, references);
                let json = serde_json::to_string(&expected).unwrap();
                let raw = format!("{prefix}{json}{suffix}");
                prop_assert_eq!(parse_response(&raw).unwrap(), expected);
            }
        }
    }
}
