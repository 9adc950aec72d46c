use serde::Serialize;
use serde_json::Value;

use crate::error::{TransportError, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<TextContent>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error,
        }
    }

    pub fn success(payload: &Value, confirmation: Option<&str>) -> Self {
        let body = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        let text = match confirmation {
            Some(line) => format!("{line}\n\n{body}"),
            None => body,
        };
        Self::text(text, false)
    }

    pub fn invalid_input(err: &ValidationError) -> Self {
        Self::text(format!("Invalid input: {err}"), true)
    }

    pub fn upstream_failure(err: &TransportError) -> Self {
        Self::text(format!("Error: {err}"), true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FieldIssue;

    impl ToolResult {
        pub(crate) fn text_body(&self) -> &str {
            self.content.first().map(|c| c.text.as_str()).unwrap_or_default()
        }
    }

    #[test]
    fn success_omits_error_flag_and_pretty_prints() {
        let result = ToolResult::success(&json!({ "id": "a", "status": "active" }), None);
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(
            wire,
            json!({
                "content": [{ "type": "text", "text": "{\n  \"id\": \"a\",\n  \"status\": \"active\"\n}" }]
            })
        );
    }

    #[test]
    fn confirmation_precedes_payload() {
        let result = ToolResult::success(
            &json!({ "id": "o-1" }),
            Some("Order created successfully!"),
        );
        assert_eq!(
            result.text_body(),
            "Order created successfully!\n\n{\n  \"id\": \"o-1\"\n}"
        );
        assert!(!result.is_error);
    }

    #[test]
    fn validation_failure_lists_every_issue() {
        let err = ValidationError {
            issues: vec![
                FieldIssue::new("account_id", "Invalid account ID format"),
                FieldIssue::new("qty", "Required"),
            ],
        };
        let result = ToolResult::invalid_input(&err);
        assert!(result.is_error);
        assert_eq!(
            result.text_body(),
            "Invalid input: account_id: Invalid account ID format, qty: Required"
        );
        assert_eq!(serde_json::to_value(&result).unwrap()["isError"], true);
    }

    #[test]
    fn transport_failure_is_prefixed() {
        let err = TransportError::Api {
            code: "40410000".to_string(),
            message: "order not found".to_string(),
        };
        let result = ToolResult::upstream_failure(&err);
        assert_eq!(
            result.text_body(),
            "Error: Bluum API Error 40410000: order not found"
        );
        assert!(result.is_error);
    }

    #[test]
    fn null_payload_renders_as_null() {
        let result = ToolResult::success(&Value::Null, None);
        assert_eq!(result.text_body(), "null");
    }
}
