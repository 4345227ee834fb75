//! Best-effort detection of tool calls in free-form assistant text.
//!
//! A reply is a tool call only when, after unwrapping the first fenced
//! block, it is a single JSON object with a string `tool` key. Anything
//! else, including malformed JSON, is plain text.

use serde_json::{Map, Value};

/// A tool call lifted out of the assistant's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    pub args: Map<String, Value>,
}

/// How the assistant's reply should be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Text,
    Tool(ToolInvocation),
}

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Classify a raw assistant reply.
pub fn classify(raw: &str) -> Classified {
    let candidate = unwrap_fence(raw.trim());
    if !(candidate.starts_with('{') && candidate.ends_with('}')) {
        return Classified::Text;
    }

    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(candidate) else {
        return Classified::Text;
    };
    let Some(Value::String(tool)) = object.remove("tool") else {
        return Classified::Text;
    };
    let args = match object.remove("args") {
        None => Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return Classified::Text,
    };

    Classified::Tool(ToolInvocation { tool, args })
}

/// Contents of the first ```json block, else of the first fenced block,
/// else the text itself.
fn unwrap_fence(text: &str) -> &str {
    let after = if let Some((_, rest)) = text.split_once(JSON_FENCE) {
        rest
    } else if let Some((_, rest)) = text.split_once(FENCE) {
        rest
    } else {
        return text;
    };
    after.split(FENCE).next().unwrap_or(after).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str, args: Value) -> Classified {
        let Value::Object(args) = args else {
            panic!("args must be an object");
        };
        Classified::Tool(ToolInvocation {
            tool: name.to_string(),
            args,
        })
    }

    #[test]
    fn bare_json_is_a_tool_call() {
        assert_eq!(
            classify(r#"{"tool": "list_people", "args": {}}"#),
            tool("list_people", json!({}))
        );
    }

    #[test]
    fn json_fence_matches_unwrapped_form() {
        let fenced = "```json\n{\"tool\":\"x\",\"args\":{}}\n```";
        assert_eq!(classify(fenced), classify(r#"{"tool":"x","args":{}}"#));
        assert_eq!(classify(fenced), tool("x", json!({})));
    }

    #[test]
    fn plain_fence_and_surrounding_prose() {
        let reply = "Sure, deleting it now.\n```\n{\"tool\": \"delete_photo\", \"args\": {\"photo_id\": 4}}\n```\nDone.";
        assert_eq!(classify(reply), tool("delete_photo", json!({"photo_id": 4})));
    }

    #[test]
    fn language_tagged_fence_is_not_unwrapped() {
        let reply = "```python\n{\"tool\": \"list_vault\"}\n```";
        assert_eq!(classify(reply), Classified::Text);
    }

    #[test]
    fn missing_args_default_to_empty() {
        assert_eq!(classify(r#"  {"tool": "list_vault"}  "#), tool("list_vault", json!({})));
    }

    #[test]
    fn prose_is_text() {
        assert_eq!(classify("Hello! How can I help?"), Classified::Text);
        assert_eq!(classify("I found {3} photos"), Classified::Text);
        assert_eq!(classify(""), Classified::Text);
    }

    #[test]
    fn malformed_or_unusable_objects_are_text() {
        for reply in [
            r#"{"tool": "list_photos", "args": {}"#,
            r#"{tool: list_photos}"#,
            r#"{"name": "list_photos"}"#,
            r#"{"tool": 5}"#,
            r#"{"tool": "list_photos", "args": [1, 2]}"#,
            r#"{"tool": "list_photos", "args": null}"#,
        ] {
            assert_eq!(classify(reply), Classified::Text, "{reply}");
        }
    }
}
