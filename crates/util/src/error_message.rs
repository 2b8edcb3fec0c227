use serde_json::Value;

const NESTED_ERROR_DEPTH: usize = 2;

/// Render a collaborator error payload for display.
///
/// Prefers a plain string, then `message`, then the same lookup on a nested
/// `error` object; anything else is rendered as compact JSON.
pub fn error_message_or_stringify(error: &Value) -> String {
    extract_message(error, NESTED_ERROR_DEPTH).unwrap_or_else(|| error.to_string())
}

fn extract_message(error: &Value, depth: usize) -> Option<String> {
    match error {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(map) => {
            if let Some(Value::String(message)) = map.get("message").or_else(|| map.get("Message"))
                && !message.is_empty()
            {
                return Some(message.clone());
            }
            if depth == 0 {
                return None;
            }
            map.get("error").and_then(|nested| extract_message(nested, depth - 1))
        }
        _ => None,
    }
}
