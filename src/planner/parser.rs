//! Defensive JSON extraction from free-form model output
//!
//! Tried in order, first success wins:
//! 1. the whole text as JSON
//! 2. the contents of the first fenced code block
//! 3. the greedy span from the first `{` to the last `}`

use serde_json::Value;
use tracing::debug;

/// Extract a JSON object from model text. Never fails loudly; `None` means
/// every strategy was exhausted.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Some(value) = parse_object(block) {
            debug!("Parsed JSON from fenced code block");
            return Some(value);
        }
    }

    if let Some(span) = brace_span(trimmed) {
        if let Some(value) = parse_object(span) {
            debug!("Parsed JSON from brace span");
            return Some(value);
        }
    }

    None
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Body of the first ``` fence, skipping an optional language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];

    // Language tag runs to the end of the opening line.
    let body_start = match after_fence.find('\n') {
        Some(newline) if !after_fence[..newline].contains('{') => newline + 1,
        _ => 0,
    };
    let body = &after_fence[body_start..];

    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        let value = extract_json_object(r#"  {"reasoning": "r", "actions": []} "#).unwrap();
        assert_eq!(value["reasoning"], "r");
    }

    #[test]
    fn test_fenced_block_with_surrounding_prose() {
        let text = "Here is the plan you asked for:\n\n```json\n{\"reasoning\": \"count games\", \"actions\": [{\"type\": \"fetch\", \"id\": \"f1\"}]}\n```\n\nLet me know if you need more.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["actions"][0]["id"], "f1");
    }

    #[test]
    fn test_fence_without_language_tag() {
        let text = "```\n{\"satisfactory\": true}\n```";
        assert_eq!(
            extract_json_object(text).unwrap(),
            json!({ "satisfactory": true })
        );
    }

    #[test]
    fn test_brace_span_fallback() {
        let text = "Sure! {\"satisfactory\": false, \"reasoning\": \"no data\"} Hope that helps.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["satisfactory"], false);
    }

    #[test]
    fn test_broken_fence_falls_through_to_brace_span() {
        let text = "```json\n{\"a\": 1,,}\n``` but really {\"a\": 2}";
        // The greedy span covers both objects and is invalid too.
        assert!(extract_json_object(text).is_none());

        let text = "```json\nnot json\n``` {\"a\": 2}";
        assert_eq!(extract_json_object(text).unwrap(), json!({ "a": 2 }));
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("\"just a string\"").is_none());
    }

    #[test]
    fn test_no_json_at_all() {
        assert!(extract_json_object("I cannot help with that.").is_none());
        assert!(extract_json_object("").is_none());
    }
}
