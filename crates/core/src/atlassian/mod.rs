//! Atlassian-related transformations (Jira, Confluence)
//!
//! Pure functions that shape API responses into output models and build
//! request payloads. Nothing here performs I/O.

pub mod confluence;
pub mod jira;

use serde_json::Value;

/// Flatten an Atlassian error body into readable lines.
///
/// Jira reports failures as `{"errorMessages": [...], "errors": {field: msg}}`.
/// Returns `None` when the body has neither.
pub fn flatten_error_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let mut messages = Vec::new();

    if let Some(list) = value.get("errorMessages").and_then(|m| m.as_array()) {
        messages.extend(list.iter().filter_map(|m| m.as_str()).map(str::to_string));
    }

    if let Some(errors) = value.get("errors").and_then(|e| e.as_object()) {
        for (field, error) in errors {
            if let Some(text) = error.as_str() {
                messages.push(format!("{field}: {text}"));
            }
        }
    }

    // Confluence uses a single `message`
    if messages.is_empty() {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            messages.push(message.to_string());
        }
    }

    (!messages.is_empty()).then(|| messages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_error_body() {
        let body = r#"{"errorMessages":["Issue type is invalid"],"errors":{"priority":"unknown priority"}}"#;
        assert_eq!(
            flatten_error_body(body).as_deref(),
            Some("Issue type is invalid\npriority: unknown priority")
        );
        assert_eq!(
            flatten_error_body(r#"{"message":"No space with key"}"#).as_deref(),
            Some("No space with key")
        );
        assert_eq!(flatten_error_body("<html>502</html>"), None);
        assert_eq!(flatten_error_body(r#"{"errorMessages":[]}"#), None);
    }
}
